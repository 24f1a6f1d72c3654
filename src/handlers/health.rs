use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::app_state::AppState;
use crate::error::Result;

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "up",
        Err(_) => "down",
    };

    Ok(Json(json!({
        "status": if database == "up" { "healthy" } else { "degraded" },
        "database": database,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
