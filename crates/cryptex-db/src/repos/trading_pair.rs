//! Trading pair repository (static reference data)

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{DbResult, DbTradingPair};

pub struct TradingPairRepo {
    pool: SqlitePool,
}

impl TradingPairRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<DbTradingPair>> {
        let pair = sqlx::query_as::<_, DbTradingPair>("SELECT * FROM trading_pairs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pair)
    }

    /// Symbol of a pair, read on the caller's connection
    pub async fn symbol(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<String>> {
        let symbol = sqlx::query_scalar::<_, String>("SELECT symbol FROM trading_pairs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(symbol)
    }

    pub async fn find_by_symbol(&self, symbol: &str) -> DbResult<Option<DbTradingPair>> {
        let pair = sqlx::query_as::<_, DbTradingPair>("SELECT * FROM trading_pairs WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pair)
    }

    pub async fn list_active(&self) -> DbResult<Vec<DbTradingPair>> {
        let pairs = sqlx::query_as::<_, DbTradingPair>(
            "SELECT * FROM trading_pairs WHERE is_active = 1 ORDER BY symbol"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(pairs)
    }

    /// Insert a pair or refresh its currencies and fee schedule by symbol.
    ///
    /// Fee changes never touch existing orders, which carry their own snapshot.
    pub async fn upsert(
        &self,
        symbol: &str,
        base_currency: &str,
        quote_currency: &str,
        maker_fee: i64,
        taker_fee: i64,
    ) -> DbResult<DbTradingPair> {
        let now = Utc::now();
        let pair = sqlx::query_as::<_, DbTradingPair>(
            r#"
            INSERT INTO trading_pairs
                (symbol, base_currency, quote_currency, maker_fee, taker_fee, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT (symbol) DO UPDATE SET
                base_currency = excluded.base_currency,
                quote_currency = excluded.quote_currency,
                maker_fee = excluded.maker_fee,
                taker_fee = excluded.taker_fee,
                is_active = 1,
                updated_at = excluded.updated_at
            RETURNING *
            "#
        )
        .bind(symbol)
        .bind(base_currency)
        .bind(quote_currency)
        .bind(maker_fee)
        .bind(taker_fee)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(pair)
    }
}
