//! Wallet DTOs

use chrono::{DateTime, Utc};
use cryptex_db::{DbWallet, DbWalletTransaction};
use cryptex_types::from_atoms;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::common::PageMeta;

/// Create wallet request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWalletRequest {
    #[validate(length(min = 2, max = 10, message = "currency must be 2 to 10 characters"))]
    pub currency: String,
    #[validate(length(max = 64, message = "label must be at most 64 characters"))]
    pub label: Option<String>,
}

/// Wallet with its balance split into available and locked funds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletView {
    pub id: Uuid,
    pub currency: String,
    pub wallet_type: String,
    pub address: String,
    pub label: Option<String>,
    pub is_default: bool,
    pub status: String,
    pub total: Decimal,
    pub available: Decimal,
    pub in_orders: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbWallet> for WalletView {
    fn from(w: DbWallet) -> Self {
        Self {
            total: from_atoms(w.balance),
            available: from_atoms(w.available_balance),
            in_orders: from_atoms(w.in_orders()),
            id: w.id,
            currency: w.currency,
            wallet_type: w.wallet_type,
            address: w.address,
            label: w.label,
            is_default: w.is_default,
            status: w.status,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletListResponse {
    pub wallets: Vec<WalletView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub wallet: WalletView,
}

/// One ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransactionView {
    pub id: Uuid,
    pub wallet_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    /// Signed change of the available balance
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub available_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<DbWalletTransaction> for WalletTransactionView {
    fn from(t: DbWalletTransaction) -> Self {
        Self {
            id: t.id,
            wallet_id: t.wallet_id,
            kind: t.kind,
            amount: from_atoms(t.amount),
            balance_after: from_atoms(t.balance_after),
            available_after: from_atoms(t.available_after),
            reference_id: t.reference_id,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<WalletTransactionView>,
    #[serde(flatten)]
    pub page: PageMeta,
}
