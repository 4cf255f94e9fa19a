//! Wallet Handlers
//!
//! Wallets are only ever visible to their owner; another user's wallet id
//! is indistinguishable from an unknown one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use cryptex_auth::RequireAuth;
use cryptex_db::DbWallet;
use cryptex_types::{normalize_currency, WalletType};
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::{
    CreateWalletRequest, PaginationParams, TransactionListResponse, WalletListResponse,
    WalletResponse, WalletTransactionView, WalletView,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ValidatedJson, ValidatedQuery};
use crate::state::AppState;

/// GET /api/wallets
pub async fn list_wallets(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
) -> ApiResult<Json<WalletListResponse>> {
    let wallets = state
        .db
        .wallet_repo()
        .list_by_user(user.user_id)
        .await
        .map_err(|e| ApiError::from(e).context("Error fetching wallets"))?;

    Ok(Json(WalletListResponse {
        wallets: wallets.into_iter().map(WalletView::from).collect(),
    }))
}

/// GET /api/wallets/:id
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<WalletResponse>> {
    let wallet = owned_wallet(&state, user.user_id, &id).await?;

    Ok(Json(WalletResponse {
        message: None,
        wallet: wallet.into(),
    }))
}

/// POST /api/wallets
pub async fn create_wallet(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    ValidatedJson(req): ValidatedJson<CreateWalletRequest>,
) -> ApiResult<(StatusCode, Json<WalletResponse>)> {
    let currency = normalize_currency(&req.currency)?;

    let wallet = state
        .db
        .wallet_repo()
        .create(user.user_id, &currency, WalletType::Spot, req.label.as_deref())
        .await
        .map_err(|e| ApiError::from(e).context("Error creating wallet"))?;

    tracing::info!(wallet_id = %wallet.id, user_id = %user.user_id, %currency, "Wallet created");

    Ok((
        StatusCode::CREATED,
        Json(WalletResponse {
            message: Some("Wallet created successfully".to_string()),
            wallet: wallet.into(),
        }),
    ))
}

/// GET /api/wallets/:walletId/transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    RequireAuth(user): RequireAuth,
    Path(wallet_id): Path<String>,
    ValidatedQuery(page): ValidatedQuery<PaginationParams>,
) -> ApiResult<Json<TransactionListResponse>> {
    let wallet = owned_wallet(&state, user.user_id, &wallet_id).await?;
    let repo = state.db.wallet_repo();

    let fetch = async {
        let rows = repo.transactions(wallet.id, page.limit, page.offset()).await?;
        let total = repo.count_transactions(wallet.id).await?;
        Ok::<_, ApiError>((rows, total))
    };
    let (rows, total) = fetch
        .await
        .map_err(|e| e.context("Error fetching transactions"))?;

    Ok(Json(TransactionListResponse {
        transactions: rows.into_iter().map(WalletTransactionView::from).collect(),
        page: page.meta(total),
    }))
}

async fn owned_wallet(state: &AppState, user_id: Uuid, id: &str) -> ApiResult<DbWallet> {
    let wallet_id = Uuid::parse_str(id).map_err(|_| ApiError::WalletNotFound)?;
    state
        .db
        .wallet_repo()
        .find_for_user(user_id, wallet_id)
        .await?
        .ok_or(ApiError::WalletNotFound)
}
