//! Order Settlement Guard
//!
//! Placement and cancellation are the only paths that move funds between a
//! wallet's available balance and open orders. Each runs in one SQLite
//! transaction whose first write is a conditional `UPDATE`: that statement
//! takes the database write lock, so racing requests serialize on it and the
//! loser sees the winner's committed state.

use std::sync::Arc;

use chrono::Utc;
use cryptex_db::{Database, DbError, DbOrder, OrderRepo, OutboxRepo, TradingPairRepo, WalletRepo};
use cryptex_types::{
    round_up, to_atoms, OrderSide, OrderStatus, OrderType, Reservation, WalletStatus, WalletType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{SettlementError, SettlementResult};
use crate::matcher::Matcher;
use crate::notifier::topics;
use crate::order::Order;
use crate::outbox::OutboxWaker;

/// A validated request to place an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub trading_pair_id: i64,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Decimal,
    pub amount: Decimal,
}

#[derive(Clone)]
pub struct SettlementGuard {
    db: Database,
    matcher: Arc<dyn Matcher>,
    outbox: OutboxWaker,
}

impl SettlementGuard {
    pub fn new(db: Database, matcher: Arc<dyn Matcher>, outbox: OutboxWaker) -> Self {
        Self { db, matcher, outbox }
    }

    /// Reserve funds for and persist a new `pending` order
    #[instrument(skip(self, request), fields(pair = request.trading_pair_id, side = %request.side))]
    pub async fn place(&self, user_id: Uuid, request: PlaceOrder) -> SettlementResult<Order> {
        let result = self.place_inner(user_id, request).await;
        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total", "side" => order.side.as_str()).increment(1);
                info!(
                    order_id = %order.id,
                    %user_id,
                    reserved = %order.reserved_amount,
                    "Order placed"
                );
            }
            Err(e) => record_rejection("place", e),
        }
        result
    }

    async fn place_inner(&self, user_id: Uuid, request: PlaceOrder) -> SettlementResult<Order> {
        let price = positive_atoms("price", request.price)?;
        let amount = positive_atoms("amount", request.amount)?;

        let pair = self
            .db
            .trading_pair_repo()
            .find_by_id(request.trading_pair_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(SettlementError::TradingPairNotFound)?;

        let reservation = Reservation::for_order(
            request.side,
            &pair.base_currency,
            &pair.quote_currency,
            request.price,
            request.amount,
        );
        let reserved = to_atoms(reservation.amount)?;
        let total = to_atoms(round_up(request.price * request.amount))?;

        let wallet = self
            .db
            .wallet_repo()
            .find_by_user_and_currency(user_id, &reservation.currency, WalletType::Spot)
            .await?
            .filter(|w| w.status == WalletStatus::Active.as_str())
            .ok_or_else(|| SettlementError::WalletNotFound {
                currency: reservation.currency.clone(),
            })?;

        let now = Utc::now();
        let row = DbOrder {
            id: Uuid::new_v4(),
            user_id,
            trading_pair_id: pair.id,
            wallet_id: wallet.id,
            side: request.side.as_str().to_string(),
            order_type: request.order_type.as_str().to_string(),
            price,
            amount,
            remaining_amount: amount,
            total,
            reserved_amount: reserved,
            status: OrderStatus::Pending.as_str().to_string(),
            maker_fee_rate: pair.maker_fee,
            taker_fee_rate: pair.taker_fee,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        WalletRepo::reserve(&mut *tx, wallet.id, reserved, row.id)
            .await
            .map_err(|e| match e {
                // Suspended or removed since the lookup above
                DbError::WalletInactive { .. } | DbError::NotFound(_) => {
                    SettlementError::WalletNotFound {
                        currency: reservation.currency.clone(),
                    }
                }
                other => other.into(),
            })?;
        let order = to_order(OrderRepo::create(&mut *tx, &row).await?)?;

        let event = serde_json::json!({
            "tradingPair": pair.symbol,
            "order": order,
        });
        OutboxRepo::enqueue(&mut *tx, topics::NEW_ORDER, &event).await?;

        tx.commit()
            .await
            .map_err(|e| SettlementError::Transaction(DbError::Query(e)))?;

        self.outbox.wake();
        self.matcher.schedule_match(order.id);

        Ok(order)
    }

    /// Cancel an open order and return its unfilled reservation
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> SettlementResult<Order> {
        let result = self.cancel_inner(user_id, order_id).await;
        match &result {
            Ok(order) => {
                metrics::counter!("orders_cancelled_total").increment(1);
                info!(%order_id, %user_id, remaining = %order.remaining_amount, "Order cancelled");
            }
            Err(e) => record_rejection("cancel", e),
        }
        result
    }

    async fn cancel_inner(&self, user_id: Uuid, order_id: Uuid) -> SettlementResult<Order> {
        // Unknown or closed orders are refused without taking the write lock
        if self
            .db
            .order_repo()
            .find_cancellable(user_id, order_id)
            .await?
            .is_none()
        {
            return Err(SettlementError::OrderNotFound);
        }

        let mut tx = self.db.begin().await?;

        let row = OrderRepo::update_status(
            &mut *tx,
            order_id,
            Some(user_id),
            OrderStatus::Cancelled,
            &OrderStatus::CANCELLABLE,
        )
        .await?
        .ok_or(SettlementError::OrderNotFound)?;
        let order = to_order(row)?;

        let refund = Reservation::refund(order.side, order.price, order.remaining_amount);
        let refund = to_atoms(refund)?.min(to_atoms(order.reserved_amount)?);
        if refund > 0 {
            WalletRepo::release(&mut *tx, order.wallet_id, refund, order.id).await?;
        }

        let symbol = TradingPairRepo::symbol(&mut *tx, order.trading_pair_id).await?;
        let event = serde_json::json!({
            "tradingPair": symbol,
            "orderId": order.id,
        });
        OutboxRepo::enqueue(&mut *tx, topics::CANCEL_ORDER, &event).await?;

        tx.commit()
            .await
            .map_err(|e| SettlementError::Transaction(DbError::Query(e)))?;

        self.outbox.wake();

        Ok(order)
    }
}

fn positive_atoms(field: &str, value: Decimal) -> SettlementResult<i64> {
    if value <= Decimal::ZERO {
        return Err(SettlementError::Validation(format!("{} must be greater than zero", field)));
    }
    to_atoms(value).map_err(|e| SettlementError::Validation(format!("Invalid {}: {}", field, e)))
}

fn to_order(row: DbOrder) -> SettlementResult<Order> {
    Order::try_from(row)
        .map_err(|e| SettlementError::Transaction(DbError::Serialization(e.to_string())))
}

fn record_rejection(operation: &'static str, error: &SettlementError) {
    metrics::counter!(
        "order_rejections_total",
        "operation" => operation,
        "reason" => error.reason()
    )
    .increment(1);
    if let SettlementError::Transaction(source) = error {
        tracing::error!(operation, error = %source, "Settlement transaction failed");
    } else {
        info!(operation, reason = error.reason(), "Order request rejected");
    }
}
