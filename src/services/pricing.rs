//! Virtual provider pricing: a time-of-day multiplier schedule over a base
//! price, with an optional one-hour surge.
//!
//! The oracle holds no persisted price history. Every quoted price, past or
//! present, is recomputed from `(schedule, surge hour, base price)`, so
//! hourly series are fully reproducible within one process lifetime.

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::info;

use crate::config::{MarketConfig, ScheduleBand};
use crate::services::round4;

/// The single surge hour and its multiplier.
///
/// Drawn once at oracle construction and kept for the life of the process.
/// This is intentionally not a once-per-day scheduler: the hour is never
/// re-rolled, matching the behavior callers observe. Worth revisiting if a
/// true daily surge is ever wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurgeWindow {
    pub hour: u32,
    multiplier: Decimal,
}

#[derive(Debug, Clone)]
pub struct PricingOracle {
    base_price: Decimal,
    schedule: Vec<ScheduleBand>,
    surge: Option<SurgeWindow>,
}

impl PricingOracle {
    /// Build the oracle, drawing the surge hour uniformly from the allowed
    /// inclusive range when surge is enabled.
    pub fn from_config(market: &MarketConfig) -> Self {
        let surge = if market.surge_enabled {
            let (start, end) = market.surge_allowed_hours;
            if start > end {
                None
            } else {
                let hour = rand::thread_rng().gen_range(start..=end);
                info!(surge_hour = hour, "provider surge hour drawn for this process");
                Some(SurgeWindow {
                    hour,
                    multiplier: market.surge_multiplier,
                })
            }
        } else {
            None
        };

        Self {
            base_price: market.provider_base_price,
            schedule: market.price_schedule.clone(),
            surge,
        }
    }

    /// Construct with a fixed surge window instead of a random draw.
    pub fn with_surge(
        base_price: Decimal,
        schedule: Vec<ScheduleBand>,
        surge: Option<(u32, Decimal)>,
    ) -> Self {
        Self {
            base_price,
            schedule,
            surge: surge.map(|(hour, multiplier)| SurgeWindow { hour, multiplier }),
        }
    }

    pub fn surge_hour(&self) -> Option<u32> {
        self.surge.map(|s| s.hour)
    }

    /// Multiplier in effect at `ts`, resolved against the local-clock hour.
    ///
    /// The schedule is scanned in declaration order without validating that
    /// it partitions the day; when bands overlap, the last match wins.
    pub fn multiplier_at(&self, ts: DateTime<Utc>) -> Decimal {
        let hour = ts.with_timezone(&Local).hour();

        let mut multiplier = Decimal::ONE;
        for band in &self.schedule {
            if band.start_hour <= hour && hour < band.end_hour {
                multiplier = band.multiplier;
            }
        }

        if let Some(surge) = self.surge {
            if surge.hour == hour {
                multiplier = surge.multiplier;
            }
        }

        multiplier
    }

    /// `base_price * multiplier_at(ts)`, rounded to 4 decimals. Pure
    /// function of `ts` and process-lifetime surge state.
    pub fn price_at(&self, ts: DateTime<Utc>) -> Decimal {
        round4(self.base_price * self.multiplier_at(ts))
    }

    pub fn price_now(&self) -> Decimal {
        self.price_at(Utc::now())
    }

    pub fn multiplier_now(&self) -> Decimal {
        self.multiplier_at(Utc::now())
    }

    /// `(hour start, price)` for each of the last `hours_back` hour
    /// boundaries up to and including the current hour.
    pub fn hourly_series(&self, hours_back: u32) -> Vec<(DateTime<Utc>, Decimal)> {
        self.hourly_series_from(hours_back, Utc::now())
    }

    fn hourly_series_from(
        &self,
        hours_back: u32,
        now: DateTime<Utc>,
    ) -> Vec<(DateTime<Utc>, Decimal)> {
        let hour_start = now.timestamp() - now.timestamp().rem_euclid(3600);
        (0..hours_back)
            .rev()
            .map(|i| {
                // Hour-aligned epochs are always representable; fall back to
                // `now` rather than panic if that ever stops holding.
                let ts = Utc
                    .timestamp_opt(hour_start - i64::from(i) * 3600, 0)
                    .single()
                    .unwrap_or(now);
                (ts, self.price_at(ts))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn default_schedule() -> Vec<ScheduleBand> {
        MarketConfig::default().price_schedule
    }

    /// Build a UTC instant whose *local* hour is `hour`.
    fn local_hour(hour: u32) -> DateTime<Utc> {
        let naive = NaiveDate::from_ymd_opt(2024, 3, 12)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap();
        Local
            .from_local_datetime(&naive)
            .earliest()
            .expect("no DST gap at the chosen date")
            .with_timezone(&Utc)
    }

    #[test]
    fn evening_band_prices_at_1_2x() {
        // schedule [(0,6,0.9),(6,17,1.0),(17,22,1.2),(22,24,1.0)], base 0.22,
        // no surge, hour 18 -> 0.2640
        let oracle = PricingOracle::with_surge(d("0.22"), default_schedule(), None);
        let ts = local_hour(18);
        assert_eq!(oracle.multiplier_at(ts), d("1.2"));
        assert_eq!(oracle.price_at(ts), d("0.2640"));
    }

    #[test]
    fn off_peak_band_prices_at_0_9x() {
        let oracle = PricingOracle::with_surge(d("0.22"), default_schedule(), None);
        assert_eq!(oracle.price_at(local_hour(3)), d("0.1980"));
    }

    #[test]
    fn surge_hour_overrides_the_schedule() {
        let oracle =
            PricingOracle::with_surge(d("0.22"), default_schedule(), Some((19, d("1.35"))));
        assert_eq!(oracle.multiplier_at(local_hour(19)), d("1.35"));
        // neighboring hours keep the schedule multiplier
        assert_eq!(oracle.multiplier_at(local_hour(18)), d("1.2"));
        assert_eq!(oracle.multiplier_at(local_hour(20)), d("1.2"));
    }

    #[test]
    fn last_matching_band_wins_on_overlap() {
        let schedule = vec![
            ScheduleBand {
                start_hour: 0,
                end_hour: 24,
                multiplier: d("1.0"),
            },
            ScheduleBand {
                start_hour: 10,
                end_hour: 12,
                multiplier: d("2.0"),
            },
        ];
        let oracle = PricingOracle::with_surge(d("0.22"), schedule, None);
        assert_eq!(oracle.multiplier_at(local_hour(11)), d("2.0"));
        assert_eq!(oracle.multiplier_at(local_hour(13)), d("1.0"));
    }

    #[test]
    fn price_reads_are_idempotent_within_a_process() {
        let oracle =
            PricingOracle::with_surge(d("0.22"), default_schedule(), Some((18, d("1.35"))));
        let ts = local_hour(18);
        assert_eq!(oracle.price_at(ts), oracle.price_at(ts));
    }

    #[test]
    fn hourly_series_is_hour_aligned_and_reproducible() {
        let oracle = PricingOracle::with_surge(d("0.22"), default_schedule(), None);
        let now = Utc::now();
        let series = oracle.hourly_series_from(6, now);
        assert_eq!(series.len(), 6);
        for (ts, price) in &series {
            assert_eq!(ts.timestamp() % 3600, 0);
            assert_eq!(*price, oracle.price_at(*ts));
        }
        // ascending, one hour apart, ending at the current hour
        for pair in series.windows(2) {
            assert_eq!(pair[1].0.timestamp() - pair[0].0.timestamp(), 3600);
        }
        assert_eq!(
            series.last().unwrap().0.timestamp(),
            now.timestamp() - now.timestamp().rem_euclid(3600)
        );
    }

    #[test]
    fn hourly_series_around_the_epoch_origin_stays_aligned() {
        // hours_back reaching across timestamp zero produces negative,
        // still hour-aligned instants without panicking
        let oracle = PricingOracle::with_surge(d("0.22"), default_schedule(), None);
        let origin = Utc.timestamp_opt(1800, 0).single().unwrap();
        let series = oracle.hourly_series_from(3, origin);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].0.timestamp(), -7200);
        for (ts, price) in &series {
            assert_eq!(ts.timestamp() % 3600, 0);
            assert_eq!(*price, oracle.price_at(*ts));
        }
    }

    #[test]
    fn drawn_surge_hour_stays_in_allowed_range() {
        let mut market = MarketConfig::default();
        market.surge_allowed_hours = (17, 21);
        for _ in 0..50 {
            let oracle = PricingOracle::from_config(&market);
            let hour = oracle.surge_hour().expect("surge enabled by default");
            assert!((17..=21).contains(&hour));
        }
    }

    #[test]
    fn surge_disabled_means_no_window() {
        let mut market = MarketConfig::default();
        market.surge_enabled = false;
        assert_eq!(PricingOracle::from_config(&market).surge_hour(), None);
    }
}
