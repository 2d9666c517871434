//! Health check endpoint

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::AppState;

/// GET /health - API version and how many chains can serve quotes
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let aggregator = state.aggregator();
    let quotable = state
        .registry()
        .chains()
        .iter()
        .filter(|chain| aggregator.has_reader(chain.chain_id))
        .count();
    Json(HealthResponse::new(quotable))
}
