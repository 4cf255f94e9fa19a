//! Notification outbox
//!
//! Events are written in the same transaction as the state change they
//! announce and delivered afterwards, at least once, by a dispatcher.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{DbOutboxEvent, DbResult};

/// Longest error text kept on a failed event
const MAX_ERROR_LEN: usize = 512;

pub struct OutboxRepo {
    pool: SqlitePool,
}

impl OutboxRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Queue an event inside the caller's transaction, returning its id
    pub async fn enqueue(
        conn: &mut SqliteConnection,
        topic: &str,
        payload: &serde_json::Value,
    ) -> DbResult<i64> {
        let body = serde_json::to_string(payload)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO outbox_events (topic, payload, attempts, created_at) VALUES (?, ?, 0, ?) RETURNING id"
        )
        .bind(topic)
        .bind(body)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
        Ok(id)
    }

    /// Undelivered events in commit order
    pub async fn pending(&self, limit: i64) -> DbResult<Vec<DbOutboxEvent>> {
        let events = sqlx::query_as::<_, DbOutboxEvent>(
            "SELECT * FROM outbox_events WHERE delivered_at IS NULL AND abandoned_at IS NULL ORDER BY id LIMIT ?"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn mark_delivered(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE outbox_events SET delivered_at = ?, attempts = attempts + 1 WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> DbResult<()> {
        let error: String = error.chars().take(MAX_ERROR_LEN).collect();
        sqlx::query("UPDATE outbox_events SET attempts = attempts + 1, last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM outbox_events WHERE delivered_at IS NULL AND abandoned_at IS NULL",
            )
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Take an event out of the queue after its final failed attempt
    pub async fn mark_abandoned(&self, id: i64, error: &str) -> DbResult<()> {
        let error: String = error.chars().take(MAX_ERROR_LEN).collect();
        sqlx::query(
            "UPDATE outbox_events SET attempts = attempts + 1, last_error = ?, abandoned_at = ? WHERE id = ?"
        )
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_abandoned(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outbox_events WHERE abandoned_at IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
