//! Common DTO types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use cryptex_types::{parse_positive, TypesError};

/// Highest page a client may request
pub const MAX_PAGE: i64 = 1_000_000;

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000, message = "page must be between 1 and 1000000"))]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    /// Get the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.clamp(1, MAX_PAGE) - 1).saturating_mul(self.limit.max(0))
    }

    /// Page metadata for a result set of `total` rows
    pub fn meta(&self, total: i64) -> PageMeta {
        let total_pages = if self.limit > 0 {
            (total + self.limit - 1) / self.limit
        } else {
            0
        };
        PageMeta {
            total,
            page: self.page,
            total_pages,
        }
    }
}

/// Pagination metadata flattened into list responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// A decimal accepted either as a JSON string or a JSON number
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DecimalInput {
    Text(String),
    Number(serde_json::Number),
}

impl DecimalInput {
    /// Parse as a strictly positive amount with at most 8 decimal places
    pub fn positive(&self, field: &str) -> Result<Decimal, TypesError> {
        match self {
            Self::Text(raw) => parse_positive(field, raw),
            Self::Number(n) => parse_positive(field, &n.to_string()),
        }
    }
}
