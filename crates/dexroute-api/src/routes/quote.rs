//! Quote and calldata endpoints

use alloy_primitives::U256;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use dexroute_core::TradeDirection;
use evm_client::{build_swap_calldata, SwapCalldata};
use router::QuoteOutcome;

use crate::dto::{ApiError, CalldataRequest, QuoteRequest, QuoteResponse};
use crate::AppState;

/// Create quote routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/exact-input", post(exact_input))
        .route("/exact-output", post(exact_output))
        .route("/calldata", post(calldata))
}

/// POST /quote/exact-input - Best route selling a fixed amount
pub async fn exact_input(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, (StatusCode, Json<ApiError>)> {
    run_quote(&state, TradeDirection::ExactInput, request).await
}

/// POST /quote/exact-output - Best route buying a fixed amount
pub async fn exact_output(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, (StatusCode, Json<ApiError>)> {
    run_quote(&state, TradeDirection::ExactOutput, request).await
}

async fn run_quote(
    state: &AppState,
    direction: TradeDirection,
    request: QuoteRequest,
) -> Result<Json<QuoteResponse>, (StatusCode, Json<ApiError>)> {
    let outcome = state
        .quote(
            direction,
            request.token_in,
            request.token_out,
            request.chain_id,
            request.amount.clone(),
            request.session.as_deref(),
        )
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError::bad_request(e.to_string())),
            )
        })?
        .map_err(|e| {
            (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                Json(ApiError::from(&e)),
            )
        })?;

    match outcome {
        QuoteOutcome::Ready(Some(route)) => Ok(Json(QuoteResponse::new(route, &request))),
        QuoteOutcome::Ready(None) => Err((StatusCode::NOT_FOUND, Json(ApiError::no_route()))),
        QuoteOutcome::Superseded => Err((StatusCode::CONFLICT, Json(ApiError::superseded()))),
    }
}

/// POST /quote/calldata - Encode a route into a router call
pub async fn calldata(
    Json(request): Json<CalldataRequest>,
) -> Result<Json<SwapCalldata>, (StatusCode, Json<ApiError>)> {
    let call = build_swap_calldata(&request.route, request.recipient, U256::from(request.deadline))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("invalid_route", e.to_string())),
            )
        })?;
    Ok(Json(call))
}
