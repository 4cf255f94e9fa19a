//! Order repository

use chrono::Utc;
use cryptex_types::OrderStatus;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{DbError, DbOrder, DbResult};

/// Optional filters for listing a user's orders
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub trading_pair_id: Option<i64>,
}

impl OrderFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>, user_id: Uuid) {
        qb.push(" WHERE user_id = ").push_bind(user_id);
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(pair) = self.trading_pair_id {
            qb.push(" AND trading_pair_id = ").push_bind(pair);
        }
    }
}

pub struct OrderRepo {
    pool: SqlitePool,
}

impl OrderRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(conn: &mut SqliteConnection, order: &DbOrder) -> DbResult<DbOrder> {
        let o = sqlx::query_as::<_, DbOrder>(
            r#"
            INSERT INTO orders (id, user_id, trading_pair_id, wallet_id, side, order_type,
                price, amount, remaining_amount, total, reserved_amount, status,
                maker_fee_rate, taker_fee_rate, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.trading_pair_id)
        .bind(order.wallet_id)
        .bind(&order.side)
        .bind(&order.order_type)
        .bind(order.price)
        .bind(order.amount)
        .bind(order.remaining_amount)
        .bind(order.total)
        .bind(order.reserved_amount)
        .bind(&order.status)
        .bind(order.maker_fee_rate)
        .bind(order.taker_fee_rate)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *conn)
        .await?;
        Ok(o)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbOrder>> {
        let order = sqlx::query_as::<_, DbOrder>("SELECT * FROM orders WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    /// The caller's order, if it is still pending or partially filled
    pub async fn find_cancellable(&self, user_id: Uuid, order_id: Uuid) -> DbResult<Option<DbOrder>> {
        let order = sqlx::query_as::<_, DbOrder>(
            "SELECT * FROM orders WHERE id = ? AND user_id = ? AND status IN ('pending', 'partial')"
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    /// Conditionally move an order to `to`.
    ///
    /// Only rows whose current status is one of `from` (and, when given, that
    /// belong to `owner`) are updated; `None` means no row qualified. Every
    /// `from -> to` pair must be a legal state-machine transition.
    pub async fn update_status(
        conn: &mut SqliteConnection,
        order_id: Uuid,
        owner: Option<Uuid>,
        to: OrderStatus,
        from: &[OrderStatus],
    ) -> DbResult<Option<DbOrder>> {
        if from.is_empty() || from.iter().any(|s| !s.can_transition_to(to)) {
            return Err(DbError::InvalidInput(format!(
                "Illegal order transition {:?} -> {}",
                from, to
            )));
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
        qb.push_bind(to.as_str())
            .push(", updated_at = ")
            .push_bind(Utc::now())
            .push(" WHERE id = ")
            .push_bind(order_id);
        if let Some(user_id) = owner {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        qb.push(" AND status IN (");
        let mut statuses = qb.separated(", ");
        for status in from {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");
        qb.push(" RETURNING *");

        let order = qb
            .build_query_as::<DbOrder>()
            .fetch_optional(&mut *conn)
            .await?;
        Ok(order)
    }

    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        filter: &OrderFilter,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbOrder>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM orders");
        filter.push_where(&mut qb, user_id);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let orders = qb.build_query_as::<DbOrder>().fetch_all(&self.pool).await?;
        Ok(orders)
    }

    pub async fn count_by_user(&self, user_id: Uuid, filter: &OrderFilter) -> DbResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
        filter.push_where(&mut qb, user_id);

        let (count,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(count)
    }
}
