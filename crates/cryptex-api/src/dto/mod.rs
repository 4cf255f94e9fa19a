//! Data Transfer Objects
//!
//! Request and response bodies for the API. Field names are camelCase and
//! amounts are decimals converted from storage atoms.

pub mod common;
pub mod market;
pub mod order;
pub mod wallet;

pub use common::*;
pub use market::*;
pub use order::*;
pub use wallet::*;
