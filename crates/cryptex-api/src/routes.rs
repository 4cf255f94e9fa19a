//! API Routes
//!
//! Everything below `/api`. Authentication is enforced per handler through
//! the `RequireAuth` extractor; the auth layer only resolves the caller.

use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;
use crate::websocket;

/// Create `/api` routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Public reference data
        .route("/trading-pairs", get(handlers::trading_pair::list_trading_pairs))
        // Orders
        .route(
            "/orders",
            get(handlers::order::list_orders).post(handlers::order::create_order),
        )
        .route("/orders/:id", delete(handlers::order::cancel_order))
        // Trades
        .route("/trades", get(handlers::trade::list_trades))
        // Wallets
        .nest("/wallets", wallet_routes())
        // Event stream
        .route("/ws", get(websocket::ws_events_handler))
}

/// Wallet routes
fn wallet_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(handlers::wallet::list_wallets).post(handlers::wallet::create_wallet),
        )
        .route("/:id", get(handlers::wallet::get_wallet))
        .route("/:id/transactions", get(handlers::wallet::list_transactions))
}
