//! Cryptex Settlement - Order Settlement Guard
//!
//! Guards every movement of funds between wallets and open orders:
//!
//! - [`SettlementGuard::place`] validates an order, reserves the funds it
//!   needs and persists it as `pending`, all in one transaction
//! - [`SettlementGuard::cancel`] closes an open order and returns its
//!   unfilled reservation to the wallet it came from
//! - [`OutboxDispatcher`] delivers the `newOrder` / `cancelOrder` events
//!   those transactions commit, through a [`Notifier`]
//! - [`Matcher`] is the hook a matching engine plugs into

pub mod error;
pub mod guard;
pub mod matcher;
pub mod notifier;
pub mod order;
pub mod outbox;

pub use error::{SettlementError, SettlementResult};
pub use guard::{PlaceOrder, SettlementGuard};
pub use matcher::{ChannelMatcher, Matcher, NoopMatcher};
pub use notifier::{topics, BroadcastNotifier, Notification, Notifier, NotifyError};
pub use order::Order;
pub use outbox::{OutboxConfig, OutboxDispatcher, OutboxWaker};
