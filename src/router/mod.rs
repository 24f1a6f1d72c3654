//! Router configuration: thin HTTP surface over the settlement core.

use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::app_state::AppState;
use crate::handlers::{accounts, health, market, offers, readings, trades};

pub fn build_router(app_state: AppState) -> Router {
    let api = Router::new()
        // Accounts
        .route("/users", post(accounts::register).get(accounts::list))
        .route("/users/{id}/fund", post(accounts::fund))
        .route("/users/{id}/status", get(accounts::status))
        .route("/users/{id}/status/extended", get(accounts::status_extended))
        // Meter readings
        .route("/meters/readings", post(readings::record))
        .route("/users/{id}/meters/series", get(readings::series))
        // Offers and settlement
        .route("/offers", post(offers::create))
        .route("/offers/{id}/accept", post(offers::accept))
        .route("/users/{id}/trades", get(trades::list_for_buyer))
        // Market
        .route("/market", get(market::list_market))
        .route("/providers/prices", get(market::provider_price_series));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(Duration::from_secs(30))),
        )
        .with_state(app_state)
}
