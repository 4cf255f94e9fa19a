//! API Handlers
//!
//! Request handlers for all API endpoints.
//! Each module handles a specific domain.

pub mod health;
pub mod order;
pub mod trade;
pub mod trading_pair;
pub mod wallet;

pub use health::*;
