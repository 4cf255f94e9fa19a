//! API error handling
//!
//! Every failure becomes a `{message}` body with a status code. The cause
//! travels with the response as an [`ErrorDetails`] extension and is only
//! written into the body when the router exposes error details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cryptex_auth::AuthError;
use cryptex_db::DbError;
use cryptex_settlement::SettlementError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("{0}")]
    Validation(String),

    #[error("Invalid request body")]
    InvalidRequestBody(String),

    #[error("{0}")]
    Conflict(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    #[error(transparent)]
    Auth(#[from] AuthError),

    // =========================================================================
    // Trading Errors
    // =========================================================================
    #[error("Trading pair not found")]
    TradingPairNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("No {currency} wallet found")]
    MissingWallet { currency: String },

    #[error("Insufficient balance")]
    InsufficientBalance,

    // =========================================================================
    // Wallet Errors
    // =========================================================================
    #[error("Wallet not found")]
    WalletNotFound,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// `context` is shown to the client, `details` only when exposed
    #[error("{context}")]
    Internal { context: &'static str, details: String },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidRequestBody(_)
            | Self::Conflict(_)
            | Self::MissingWallet { .. }
            | Self::InsufficientBalance => StatusCode::BAD_REQUEST,

            Self::Auth(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),

            Self::TradingPairNotFound | Self::OrderNotFound | Self::WalletNotFound => {
                StatusCode::NOT_FOUND
            }

            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to any client
    pub fn message(&self) -> String {
        match self {
            Self::Auth(e) => e.client_message(),
            other => other.to_string(),
        }
    }

    /// Cause of the error, for non-production clients
    pub fn details(&self) -> Option<String> {
        match self {
            Self::InvalidRequestBody(details) | Self::Internal { details, .. } => {
                Some(details.clone())
            }
            _ => None,
        }
    }

    /// Replace the client-facing message of an internal error
    pub fn context(self, context: &'static str) -> Self {
        match self {
            Self::Internal { details, .. } => Self::Internal { context, details },
            other => other,
        }
    }

    pub fn internal(details: impl ToString) -> Self {
        Self::Internal {
            context: "Internal server error",
            details: details.to_string(),
        }
    }
}

/// Error body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Response extension carrying the full error body
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub ErrorResponse);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();
        let details = self.details();

        let mut response = (
            status,
            Json(ErrorResponse {
                message: message.clone(),
                details: None,
            }),
        )
            .into_response();

        if details.is_some() {
            response
                .extensions_mut()
                .insert(ErrorDetails(ErrorResponse { message, details }));
        }

        response
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::Validation(msg) => Self::Validation(msg),
            SettlementError::TradingPairNotFound => Self::TradingPairNotFound,
            SettlementError::OrderNotFound => Self::OrderNotFound,
            SettlementError::WalletNotFound { currency } => Self::MissingWallet { currency },
            SettlementError::InsufficientBalance => Self::InsufficientBalance,
            SettlementError::Transaction(source) => Self::internal(source),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate(what) => Self::Conflict(format!("{} already exists", what)),
            DbError::InvalidInput(msg) => Self::Validation(msg),
            DbError::InsufficientBalance(_) => Self::InsufficientBalance,
            other => {
                tracing::error!(error = ?other, "Database error");
                Self::internal(other)
            }
        }
    }
}

impl From<cryptex_types::TypesError> for ApiError {
    fn from(err: cryptex_types::TypesError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(format_validation_errors(&err))
    }
}

/// Flatten validation errors into one readable line
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
