//! Wallet vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Wallet type. Only spot wallets back order reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Spot,
}

impl WalletType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::Spot => "spot",
        }
    }
}

impl fmt::Display for WalletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "spot" => Ok(WalletType::Spot),
            _ => Err(TypesError::UnknownVariant { kind: "wallet type", value: s.to_string() }),
        }
    }
}

/// Wallet lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Inactive,
    Suspended,
}

impl WalletStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletStatus::Active => "active",
            WalletStatus::Inactive => "inactive",
            WalletStatus::Suspended => "suspended",
        }
    }

    /// Only active wallets can lock funds for new orders
    pub fn can_reserve(&self) -> bool {
        matches!(self, WalletStatus::Active)
    }
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(WalletStatus::Active),
            "inactive" => Ok(WalletStatus::Inactive),
            "suspended" => Ok(WalletStatus::Suspended),
            _ => Err(TypesError::UnknownVariant { kind: "wallet status", value: s.to_string() }),
        }
    }
}

/// Kind of an available-balance movement recorded in the wallet ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// External funding, raises both balance and available balance
    Deposit,
    /// Funds locked against a new order
    OrderLock,
    /// Unfilled funds returned by a cancelled order
    OrderRelease,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::OrderLock => "order_lock",
            TransactionKind::OrderRelease => "order_release",
        }
    }
}

/// Normalize a currency code: trimmed, upper-case, 2 to 10 alphanumerics
pub fn normalize_currency(code: &str) -> Result<String, TypesError> {
    let code = code.trim();
    let valid = (2..=10).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(TypesError::InvalidCurrency(code.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}
