//! Cryptex Types - Trading Domain Types
//!
//! This crate defines the vocabulary shared by every Cryptex crate:
//! - Order sides, types and the order status state machine
//! - Wallet kinds, statuses and ledger entry kinds
//! - Fixed-point amount handling (8 decimal places, stored as integer atoms)
//!
//! # Example
//!
//! ```
//! use cryptex_types::{OrderSide, Reservation};
//! use rust_decimal::Decimal;
//!
//! let reservation = Reservation::for_order(
//!     OrderSide::Buy,
//!     "BTC",
//!     "USDT",
//!     Decimal::from(100),
//!     Decimal::from(2),
//! );
//! assert_eq!(reservation.currency, "USDT");
//! assert_eq!(reservation.amount, Decimal::from(200));
//! ```

pub mod amount;
pub mod error;
pub mod order;
pub mod wallet;

pub use amount::{from_atoms, parse_positive, round_up, to_atoms, AMOUNT_SCALE};
pub use error::{Result, TypesError};
pub use order::{OrderSide, OrderStatus, OrderType, Reservation};
pub use wallet::{normalize_currency, TransactionKind, WalletStatus, WalletType};
