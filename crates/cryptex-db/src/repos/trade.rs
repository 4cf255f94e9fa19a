//! Trade repository (read model fed by the matching engine)

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{DbResult, DbTrade};

pub struct TradeRepo {
    pool: SqlitePool,
}

impl TradeRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, trade: &DbTrade) -> DbResult<DbTrade> {
        let t = sqlx::query_as::<_, DbTrade>(
            r#"
            INSERT INTO trades (id, trading_pair_id, maker_order_id, taker_order_id,
                maker_user_id, taker_user_id, price, amount, total, maker_fee, taker_fee, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#
        )
        .bind(trade.id)
        .bind(trade.trading_pair_id)
        .bind(trade.maker_order_id)
        .bind(trade.taker_order_id)
        .bind(trade.maker_user_id)
        .bind(trade.taker_user_id)
        .bind(trade.price)
        .bind(trade.amount)
        .bind(trade.total)
        .bind(trade.maker_fee)
        .bind(trade.taker_fee)
        .bind(trade.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(t)
    }

    /// Trades where the user was maker or taker, newest first
    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        trading_pair_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbTrade>> {
        let trades = if let Some(pair) = trading_pair_id {
            sqlx::query_as::<_, DbTrade>(
                r#"
                SELECT * FROM trades
                WHERE (maker_user_id = ? OR taker_user_id = ?) AND trading_pair_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ? OFFSET ?
                "#
            )
            .bind(user_id)
            .bind(user_id)
            .bind(pair)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, DbTrade>(
                r#"
                SELECT * FROM trades
                WHERE maker_user_id = ? OR taker_user_id = ?
                ORDER BY created_at DESC, rowid DESC
                LIMIT ? OFFSET ?
                "#
            )
            .bind(user_id)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(trades)
    }

    pub async fn count_by_user(&self, user_id: Uuid, trading_pair_id: Option<i64>) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM trades
            WHERE (maker_user_id = ? OR taker_user_id = ?)
              AND (? IS NULL OR trading_pair_id = ?)
            "#
        )
        .bind(user_id)
        .bind(user_id)
        .bind(trading_pair_id)
        .bind(trading_pair_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
