//! Repository implementations

mod wallet;
mod trading_pair;
mod order;
mod trade;
mod outbox;

pub use wallet::WalletRepo;
pub use trading_pair::TradingPairRepo;
pub use order::{OrderFilter, OrderRepo};
pub use trade::TradeRepo;
pub use outbox::OutboxRepo;
