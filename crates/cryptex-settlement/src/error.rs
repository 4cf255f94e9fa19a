//! Settlement errors

use cryptex_db::DbError;
use cryptex_types::TypesError;
use thiserror::Error;

/// Reasons a placement or cancellation is refused.
///
/// Every variant leaves wallets and orders exactly as they were.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("{0}")]
    Validation(String),

    #[error("Trading pair not found")]
    TradingPairNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("No {currency} wallet found")]
    WalletNotFound { currency: String },

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Transaction failed: {0}")]
    Transaction(#[source] DbError),
}

impl SettlementError {
    /// Short label used for the rejection metric
    pub fn reason(&self) -> &'static str {
        match self {
            SettlementError::Validation(_) => "validation",
            SettlementError::TradingPairNotFound => "trading_pair_not_found",
            SettlementError::OrderNotFound => "order_not_found",
            SettlementError::WalletNotFound { .. } => "wallet_not_found",
            SettlementError::InsufficientBalance => "insufficient_balance",
            SettlementError::Transaction(_) => "transaction",
        }
    }
}

impl From<DbError> for SettlementError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::InsufficientBalance(_) => SettlementError::InsufficientBalance,
            DbError::InvalidInput(msg) => SettlementError::Validation(msg),
            other => SettlementError::Transaction(other),
        }
    }
}

impl From<TypesError> for SettlementError {
    fn from(e: TypesError) -> Self {
        SettlementError::Validation(e.to_string())
    }
}

pub type SettlementResult<T> = Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_domain() {
        let err: SettlementError = DbError::InsufficientBalance("wallet".into()).into();
        assert!(matches!(err, SettlementError::InsufficientBalance));

        let err: SettlementError = DbError::Constraint("release".into()).into();
        assert_eq!(err.reason(), "transaction");
    }

    #[test]
    fn test_wallet_not_found_message() {
        let err = SettlementError::WalletNotFound { currency: "USDT".into() };
        assert_eq!(err.to_string(), "No USDT wallet found");
    }
}
