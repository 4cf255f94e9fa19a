use axum::{extract::State, Json};
use std::sync::Arc;

use crate::dto::{TradingPairListResponse, TradingPairView};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/trading-pairs (public)
pub async fn list_trading_pairs(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TradingPairListResponse>> {
    let pairs = state
        .db
        .trading_pair_repo()
        .list_active()
        .await
        .map_err(|e| ApiError::from(e).context("Error fetching trading pairs"))?;

    Ok(Json(TradingPairListResponse {
        trading_pairs: pairs.into_iter().map(TradingPairView::from).collect(),
    }))
}
