//! Error types for domain value parsing

use thiserror::Error;

/// Result type for domain value operations
pub type Result<T> = std::result::Result<T, TypesError>;

/// Errors raised while building domain values from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    // ========================================================================
    // Amount Errors
    // ========================================================================

    /// Amount could not be parsed or is out of range
    #[error("Invalid {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// Amount does not fit the fixed-point storage range
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    // ========================================================================
    // Enum Parsing Errors
    // ========================================================================

    /// Unknown textual variant of a domain enum
    #[error("Invalid {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Currency code is malformed
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}
