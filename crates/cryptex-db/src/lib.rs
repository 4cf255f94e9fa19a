//! Cryptex Database Layer
//!
//! SQLite persistence for wallets, trading pairs, orders, trades, the wallet
//! ledger and the notification outbox.
//!
//! # Repository Pattern
//!
//! Each domain has its own repository. Reads run against the pool; writes
//! that must commit together with other writes take a `&mut SqliteConnection`
//! borrowed from a transaction opened with [`Database::begin`].
//!
//! # Amounts
//!
//! Monetary columns hold integer atoms of 10^-8 units, see
//! [`cryptex_types::amount`]. Keeping them integral lets balance checks and
//! adjustments happen inside one conditional `UPDATE`.

pub mod config;
pub mod error;
pub mod models;
pub mod repos;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use tracing::info;

pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use models::*;
pub use repos::*;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    /// SQLite connection pool
    pub pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the SQLite database
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!(url = %config.url, "Connecting to SQLite");

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::Connection(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection(format!("SQLite: {}", e)))?;

        info!("Connected to SQLite");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    /// Health check
    pub async fn health_check(&self) -> HealthStatus {
        let sqlite = sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok();

        HealthStatus {
            sqlite,
            healthy: sqlite,
        }
    }

    /// Begin a transaction.
    ///
    /// SQLite transactions start deferred: the write lock is taken by the
    /// first write statement, so callers that need serialization on a row
    /// issue their conditional `UPDATE` first.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    pub fn wallet_repo(&self) -> WalletRepo {
        WalletRepo::new(self.pool.clone())
    }

    pub fn trading_pair_repo(&self) -> TradingPairRepo {
        TradingPairRepo::new(self.pool.clone())
    }

    pub fn order_repo(&self) -> OrderRepo {
        OrderRepo::new(self.pool.clone())
    }

    pub fn trade_repo(&self) -> TradeRepo {
        TradeRepo::new(self.pool.clone())
    }

    pub fn outbox_repo(&self) -> OutboxRepo {
        OutboxRepo::new(self.pool.clone())
    }
}

/// Health status of the database connection
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub sqlite: bool,
    pub healthy: bool,
}
