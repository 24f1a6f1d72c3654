use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub database_url: String,
    pub market: MarketConfig,
    pub simulator: SimulatorConfig,
}

/// One half-open `[start_hour, end_hour)` slot of the daily provider price
/// program. Slots are expected to partition `[0, 24)`; the oracle does not
/// validate that, and when slots overlap the last matching one wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleBand {
    pub start_hour: u32,
    pub end_hour: u32,
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Virtual utility providers seeded as provider-role accounts
    pub provider_names: Vec<String>,
    /// Base provider price in EUR per kWh, before the schedule multiplier
    pub provider_base_price: Decimal,
    pub price_schedule: Vec<ScheduleBand>,
    pub surge_enabled: bool,
    pub surge_multiplier: Decimal,
    /// Inclusive hour range the surge hour may land in
    pub surge_allowed_hours: (u32, u32),
    /// Platform fee rate. Loaded and carried but not applied at settlement;
    /// money conservation between buyer and seller is currently exact.
    pub platform_fee_rate: Decimal,
    /// Trailing window, in hours, over which sellable surplus accumulates
    pub surplus_window_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            provider_names: vec!["DEI".to_string(), "HERON".to_string()],
            provider_base_price: Decimal::new(22, 2), // 0.22 EUR/kWh
            price_schedule: vec![
                band(0, 6, "0.90"),
                band(6, 17, "1.00"),
                band(17, 22, "1.20"),
                band(22, 24, "1.00"),
            ],
            surge_enabled: true,
            surge_multiplier: Decimal::new(135, 2), // 1.35
            surge_allowed_hours: (17, 21),
            platform_fee_rate: Decimal::new(2, 2), // 0.02
            surplus_window_hours: 12,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

fn band(start_hour: u32, end_hour: u32, multiplier: &str) -> ScheduleBand {
    ScheduleBand {
        start_hour,
        end_hour,
        multiplier: Decimal::from_str(multiplier).expect("literal multiplier"),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let market_defaults = MarketConfig::default();
        let simulator_defaults = SimulatorConfig::default();

        Ok(Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            market: MarketConfig {
                provider_names: env::var("PROVIDER_NAMES")
                    .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or(market_defaults.provider_names),
                provider_base_price: decimal_var(
                    "PROVIDER_BASE_PRICE",
                    market_defaults.provider_base_price,
                )?,
                price_schedule: match env::var("PROVIDER_PRICE_SCHEDULE") {
                    Ok(raw) => parse_schedule(&raw)?,
                    Err(_) => market_defaults.price_schedule,
                },
                surge_enabled: bool_var("PROVIDER_SURGE_ENABLED", market_defaults.surge_enabled),
                surge_multiplier: decimal_var(
                    "PROVIDER_SURGE_MULTIPLIER",
                    market_defaults.surge_multiplier,
                )?,
                surge_allowed_hours: match env::var("PROVIDER_SURGE_ALLOWED_HOURS") {
                    Ok(raw) => parse_hour_range(&raw)?,
                    Err(_) => market_defaults.surge_allowed_hours,
                },
                platform_fee_rate: decimal_var(
                    "PLATFORM_FEE_RATE",
                    market_defaults.platform_fee_rate,
                )?,
                surplus_window_hours: env::var("SURPLUS_WINDOW_HOURS")
                    .unwrap_or_else(|_| market_defaults.surplus_window_hours.to_string())
                    .parse()
                    .context("SURPLUS_WINDOW_HOURS must be an integer")?,
            },
            simulator: SimulatorConfig {
                enabled: bool_var("SIMULATION_ENABLED", simulator_defaults.enabled),
                interval_secs: env::var("SIMULATION_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| simulator_defaults.interval_secs.to_string())
                    .parse()
                    .context("SIMULATION_INTERVAL_SECONDS must be an integer")?,
            },
        })
    }
}

fn decimal_var(name: &str, default: Decimal) -> Result<Decimal> {
    match env::var(name) {
        Ok(raw) => {
            Decimal::from_str(&raw).with_context(|| format!("{} must be a decimal number", name))
        }
        Err(_) => Ok(default),
    }
}

fn bool_var(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parse a schedule of the form `0-6:0.9,6-17:1.0,17-22:1.2,22-24:1.0`.
fn parse_schedule(raw: &str) -> Result<Vec<ScheduleBand>> {
    raw.split(',')
        .map(|entry| {
            let (hours, mult) = entry
                .split_once(':')
                .with_context(|| format!("schedule entry '{}' is missing a multiplier", entry))?;
            let (start, end) = hours
                .split_once('-')
                .with_context(|| format!("schedule entry '{}' is missing an hour range", entry))?;
            Ok(ScheduleBand {
                start_hour: start.trim().parse()?,
                end_hour: end.trim().parse()?,
                multiplier: Decimal::from_str(mult.trim())?,
            })
        })
        .collect()
}

/// Parse an inclusive hour range of the form `17-21`.
fn parse_hour_range(raw: &str) -> Result<(u32, u32)> {
    let (start, end) = raw
        .split_once('-')
        .with_context(|| format!("hour range '{}' must look like 17-21", raw))?;
    Ok((start.trim().parse()?, end.trim().parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_partitions_the_day() {
        let market = MarketConfig::default();
        let mut covered = [false; 24];
        for band in &market.price_schedule {
            for h in band.start_hour..band.end_hour {
                covered[h as usize] = true;
            }
        }
        assert!(covered.iter().all(|c| *c));
    }

    #[test]
    fn schedule_string_round_trips() {
        let bands = parse_schedule("0-6:0.9, 6-17:1.0, 17-22:1.2, 22-24:1.0").unwrap();
        assert_eq!(bands.len(), 4);
        assert_eq!(bands[2].start_hour, 17);
        assert_eq!(bands[2].end_hour, 22);
        assert_eq!(bands[2].multiplier, Decimal::from_str("1.2").unwrap());
    }

    #[test]
    fn malformed_schedule_is_rejected() {
        assert!(parse_schedule("0-6").is_err());
        assert!(parse_schedule("abc:1.0").is_err());
    }

    #[test]
    fn hour_range_parses() {
        assert_eq!(parse_hour_range("17-21").unwrap(), (17, 21));
        assert!(parse_hour_range("17").is_err());
    }
}
