//! Application state shared across handlers

use std::sync::Arc;

use cryptex_auth::JwtService;
use cryptex_db::Database;
use cryptex_settlement::{BroadcastNotifier, SettlementGuard};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Database pool (read paths)
    pub db: Database,
    /// The only path that reserves or releases order funds
    pub guard: SettlementGuard,
    /// Source of the `/api/ws` event stream
    pub notifier: BroadcastNotifier,
    /// Bearer-token verification
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        db: Database,
        guard: SettlementGuard,
        notifier: BroadcastNotifier,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            db,
            guard,
            notifier,
            jwt,
        }
    }
}
