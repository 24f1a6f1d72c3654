use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use energy_market::app_state::AppState;
use energy_market::config::Config;
use energy_market::services::MeterSimulator;
use energy_market::{database, router};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "energy_market=debug,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("loaded configuration for environment: {}", config.environment);

    let db_pool = database::setup_database(&config.database_url).await?;
    database::run_migrations(&db_pool).await?;

    let state = AppState::new(db_pool.clone(), config.clone());

    // Provider accounts must exist before the market view can list them
    state
        .accounts
        .seed_providers(&config.market.provider_names)
        .await?;

    let simulator = if config.simulator.enabled {
        let sim = Arc::new(MeterSimulator::new(
            db_pool,
            state.ledger.clone(),
            config.simulator.interval_secs,
        ));
        sim.start();
        Some(sim)
    } else {
        info!("meter simulator disabled");
        None
    };

    let app = router::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(sim) = simulator {
        sim.stop();
    }
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
