//! Trade history

use axum::{extract::State, Json};
use cryptex_auth::RequireAuth;
use std::sync::Arc;

use crate::dto::{PaginationParams, TradeListResponse, TradeQuery, TradeView};
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidatedQuery;
use crate::state::AppState;

/// GET /api/trades: fills where the caller was maker or taker
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    ValidatedQuery(page): ValidatedQuery<PaginationParams>,
    ValidatedQuery(query): ValidatedQuery<TradeQuery>,
) -> ApiResult<Json<TradeListResponse>> {
    let repo = state.db.trade_repo();

    let fetch = async {
        let rows = repo
            .find_by_user(user.user_id, query.trading_pair_id, page.limit, page.offset())
            .await?;
        let total = repo.count_by_user(user.user_id, query.trading_pair_id).await?;
        Ok::<_, ApiError>((rows, total))
    };
    let (rows, total) = fetch.await.map_err(|e| e.context("Error fetching trades"))?;

    Ok(Json(TradeListResponse {
        trades: rows.into_iter().map(TradeView::from).collect(),
        page: page.meta(total),
    }))
}
