//! Chain registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::dto::{ApiError, ChainDetailResponse, ChainSummary};
use crate::AppState;

/// Create chain routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_chains))
        .route("/:id", get(get_chain))
}

/// GET /chains - Routable chains, sorted by id
pub async fn list_chains(State(state): State<AppState>) -> Json<Vec<ChainSummary>> {
    let aggregator = state.aggregator();
    let chains = state
        .registry()
        .chains()
        .into_iter()
        .map(|chain| ChainSummary::new(chain, aggregator.has_reader(chain.chain_id)))
        .collect();
    Json(chains)
}

/// GET /chains/:id - Full configuration and endpoint status of one chain
pub async fn get_chain(
    State(state): State<AppState>,
    Path(chain_id): Path<u64>,
) -> Result<Json<ChainDetailResponse>, (StatusCode, Json<ApiError>)> {
    let chain = state.registry().get(chain_id).map_err(|e| {
        (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(e.to_string())),
        )
    })?;

    Ok(Json(ChainDetailResponse {
        chain: chain.clone(),
        rpc_configured: state.aggregator().has_reader(chain_id),
        endpoint: state.endpoint_status(chain_id).await,
    }))
}
