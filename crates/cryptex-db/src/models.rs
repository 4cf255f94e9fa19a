//! Database models
//!
//! Row types mapped with `sqlx::FromRow`. Amount columns are integer atoms;
//! convert with [`cryptex_types::from_atoms`] at the edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Wallet Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub currency: String,
    pub wallet_type: String,
    pub address: String,
    pub label: Option<String>,
    pub is_default: bool,
    pub status: String,
    pub balance: i64,
    pub available_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbWallet {
    /// Funds currently locked by open orders
    pub fn in_orders(&self) -> i64 {
        self.balance - self.available_balance
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWalletTransaction {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub kind: String,
    /// Signed change of the available balance
    pub amount: i64,
    pub balance_after: i64,
    pub available_after: i64,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Market Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTradingPair {
    pub id: i64,
    pub symbol: String,
    pub base_currency: String,
    pub quote_currency: String,
    pub maker_fee: i64,
    pub taker_fee: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Order / Trade Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trading_pair_id: i64,
    pub wallet_id: Uuid,
    pub side: String,
    pub order_type: String,
    pub price: i64,
    pub amount: i64,
    pub remaining_amount: i64,
    pub total: i64,
    pub reserved_amount: i64,
    pub status: String,
    pub maker_fee_rate: i64,
    pub taker_fee_rate: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbTrade {
    pub id: Uuid,
    pub trading_pair_id: i64,
    pub maker_order_id: Uuid,
    pub taker_order_id: Uuid,
    pub maker_user_id: Uuid,
    pub taker_user_id: Uuid,
    pub price: i64,
    pub amount: i64,
    pub total: i64,
    pub maker_fee: i64,
    pub taker_fee: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Outbox Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbOutboxEvent {
    pub id: i64,
    pub topic: String,
    /// JSON document
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Set when delivery was given up after too many failures
    pub abandoned_at: Option<DateTime<Utc>>,
}
