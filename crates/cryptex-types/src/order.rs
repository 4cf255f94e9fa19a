//! Order vocabulary and the order status state machine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::amount::round_up;
use crate::error::TypesError;

// ============================================================================
// Side / Type
// ============================================================================

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(TypesError::UnknownVariant { kind: "side", value: s.to_string() }),
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limit" => Ok(OrderType::Limit),
            "market" => Ok(OrderType::Market),
            _ => Err(TypesError::UnknownVariant { kind: "order type", value: s.to_string() }),
        }
    }
}

// ============================================================================
// Status
// ============================================================================

/// Order status
///
/// ```text
/// pending ──► partial ──► filled
///    │           │
///    └───────────┴──────► cancelled
/// ```
///
/// `filled` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, funds reserved, nothing filled yet
    Pending,
    /// Some quantity filled, remainder still open
    Partial,
    /// Completely filled
    Filled,
    /// Cancelled by its owner
    Cancelled,
}

impl OrderStatus {
    /// Statuses from which an order may still be cancelled
    pub const CANCELLABLE: [OrderStatus; 2] = [OrderStatus::Pending, OrderStatus::Partial];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Partial => "partial",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Partial)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Partial)
                | (Pending, Filled)
                | (Pending, Cancelled)
                | (Partial, Partial)
                | (Partial, Filled)
                | (Partial, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "partial" => Ok(OrderStatus::Partial),
            "filled" => Ok(OrderStatus::Filled),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(TypesError::UnknownVariant { kind: "status", value: s.to_string() }),
        }
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Funds an order locks in one of its owner's wallets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub currency: String,
    pub amount: Decimal,
}

impl Reservation {
    /// Funds locked when an order is placed.
    ///
    /// Buys lock `price × amount` of the quote currency, rounded up to the
    /// storage precision. Sells lock `amount` of the base currency.
    pub fn for_order(
        side: OrderSide,
        base_currency: &str,
        quote_currency: &str,
        price: Decimal,
        amount: Decimal,
    ) -> Self {
        match side {
            OrderSide::Buy => Self {
                currency: quote_currency.to_string(),
                amount: round_up(price * amount),
            },
            OrderSide::Sell => Self {
                currency: base_currency.to_string(),
                amount,
            },
        }
    }

    /// Funds released when an open order is cancelled with `remaining` unfilled.
    ///
    /// Uses the same rounding as [`Reservation::for_order`], so an unfilled
    /// order releases exactly what it locked.
    pub fn refund(side: OrderSide, price: Decimal, remaining: Decimal) -> Decimal {
        match side {
            OrderSide::Buy => round_up(remaining * price),
            OrderSide::Sell => remaining,
        }
    }
}
