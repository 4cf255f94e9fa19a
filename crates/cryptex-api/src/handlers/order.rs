//! Order Handlers
//!
//! Placement and cancellation go through the settlement guard; listing
//! reads straight from the order repository.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cryptex_auth::RequireAuth;
use cryptex_db::{DbOrder, OrderFilter};
use cryptex_settlement::Order;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::{
    CreateOrderRequest, OrderListResponse, OrderQuery, OrderResponse, PaginationParams,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::state::AppState;

/// POST /api/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    ValidatedJson(req): ValidatedJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let request = req.into_place_order()?;

    let order = state
        .guard
        .place(user.user_id, request)
        .await
        .map_err(|e| ApiError::from(e).context("Error creating order"))?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            message: "Order created successfully".to_string(),
            order,
        }),
    ))
}

/// DELETE /api/orders/:id
pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<OrderResponse>> {
    let order_id = Uuid::parse_str(&id).map_err(|_| ApiError::OrderNotFound)?;

    let order = state
        .guard
        .cancel(user.user_id, order_id)
        .await
        .map_err(|e| ApiError::from(e).context("Error cancelling order"))?;

    Ok(Json(OrderResponse {
        message: "Order cancelled successfully".to_string(),
        order,
    }))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    ValidatedQuery(page): ValidatedQuery<PaginationParams>,
    ValidatedQuery(query): ValidatedQuery<OrderQuery>,
) -> ApiResult<Json<OrderListResponse>> {
    let filter = OrderFilter {
        status: query.status,
        trading_pair_id: query.trading_pair_id,
    };
    let repo = state.db.order_repo();

    let fetch = async {
        let rows = repo
            .find_by_user(user.user_id, &filter, page.limit, page.offset())
            .await?;
        let total = repo.count_by_user(user.user_id, &filter).await?;
        let orders = rows
            .into_iter()
            .map(to_order)
            .collect::<ApiResult<Vec<_>>>()?;
        Ok::<_, ApiError>((orders, total))
    };
    let (orders, total) = fetch.await.map_err(|e| e.context("Error fetching orders"))?;

    Ok(Json(OrderListResponse {
        orders,
        page: page.meta(total),
    }))
}

fn to_order(row: DbOrder) -> ApiResult<Order> {
    Order::try_from(row).map_err(ApiError::internal)
}
