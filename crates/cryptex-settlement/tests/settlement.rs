//! Settlement guard scenarios against a scratch SQLite database

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cryptex_db::{Database, DatabaseConfig, OrderFilter, OrderRepo};
use cryptex_settlement::{
    BroadcastNotifier, ChannelMatcher, Matcher, NoopMatcher, Notifier, NotifyError, OutboxConfig,
    OutboxDispatcher, OutboxWaker, PlaceOrder, SettlementError, SettlementGuard,
};
use cryptex_types::{
    from_atoms, to_atoms, OrderSide, OrderStatus, OrderType, WalletStatus, WalletType,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    _dir: TempDir,
    db: Database,
    guard: SettlementGuard,
    waker: OutboxWaker,
    pair_id: i64,
    user: Uuid,
}

impl Harness {
    async fn new() -> Self {
        Self::with_matcher(Arc::new(NoopMatcher)).await
    }

    async fn with_matcher(matcher: Arc<dyn Matcher>) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = DatabaseConfig::sqlite_file(&dir.path().join("settlement.db"));
        config.max_connections = 8;
        let db = Database::connect(&config).await.unwrap();
        db.migrate().await.unwrap();

        let pair = db
            .trading_pair_repo()
            .upsert("BTC/USDT", "BTC", "USDT", 100_000, 200_000)
            .await
            .unwrap();

        let waker = OutboxWaker::new();
        let guard = SettlementGuard::new(db.clone(), matcher, waker.clone());

        Self {
            _dir: dir,
            db,
            guard,
            waker,
            pair_id: pair.id,
            user: Uuid::new_v4(),
        }
    }

    async fn fund(&self, currency: &str, amount: Decimal) -> Uuid {
        let wallet = self
            .db
            .wallet_repo()
            .create(self.user, currency, WalletType::Spot, None)
            .await
            .unwrap();
        if amount > Decimal::ZERO {
            self.db
                .wallet_repo()
                .deposit(wallet.id, to_atoms(amount).unwrap(), None)
                .await
                .unwrap();
        }
        wallet.id
    }

    async fn available(&self, wallet_id: Uuid) -> Decimal {
        let wallet = self.db.wallet_repo().find_by_id(wallet_id).await.unwrap().unwrap();
        assert!(wallet.available_balance >= 0);
        assert!(wallet.available_balance <= wallet.balance);
        from_atoms(wallet.available_balance)
    }

    fn order(&self, side: OrderSide, price: Decimal, amount: Decimal) -> PlaceOrder {
        PlaceOrder {
            trading_pair_id: self.pair_id,
            side,
            order_type: OrderType::Limit,
            price,
            amount,
        }
    }

    /// Make every insert into `table` fail until [`Harness::allow_inserts`]
    async fn reject_inserts(&self, table: &str) {
        let sql = format!(
            "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table} \
             BEGIN SELECT RAISE(ABORT, '{table} unavailable'); END"
        );
        sqlx::query(&sql).execute(&self.db.pool).await.unwrap();
    }

    async fn allow_inserts(&self, table: &str) {
        let sql = format!("DROP TRIGGER reject_{table}");
        sqlx::query(&sql).execute(&self.db.pool).await.unwrap();
    }

    async fn ledger_len(&self, wallet_id: Uuid) -> i64 {
        self.db.wallet_repo().count_transactions(wallet_id).await.unwrap()
    }

    async fn order_count(&self) -> i64 {
        self.db
            .order_repo()
            .count_by_user(self.user, &OrderFilter::default())
            .await
            .unwrap()
    }

    fn dispatcher(&self, notifier: Arc<dyn Notifier>) -> OutboxDispatcher {
        OutboxDispatcher::new(
            self.db.clone(),
            notifier,
            self.waker.clone(),
            OutboxConfig {
                poll_interval_ms: 50,
                batch_size: 10,
                max_attempts: 3,
            },
        )
    }
}

// ============================================================================
// Placement
// ============================================================================

#[tokio::test]
async fn test_sell_reserves_base_and_refuses_overdraw() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.remaining_amount, dec!(6));
    assert_eq!(order.reserved_amount, dec!(6));
    assert_eq!(order.wallet_id, btc);
    assert_eq!(h.available(btc).await, dec!(4));

    let err = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(5)))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::InsufficientBalance));
    assert_eq!(h.available(btc).await, dec!(4));
}

#[tokio::test]
async fn test_buy_reserves_quote_and_snapshots_fees() {
    let h = Harness::new().await;
    let usdt = h.fund("USDT", dec!(250)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Buy, dec!(100), dec!(2)))
        .await
        .unwrap();
    assert_eq!(order.total, dec!(200));
    assert_eq!(order.reserved_amount, dec!(200));
    assert_eq!(order.maker_fee_rate, dec!(0.001));
    assert_eq!(order.taker_fee_rate, dec!(0.002));
    assert_eq!(h.available(usdt).await, dec!(50));

    let wallet = h.db.wallet_repo().find_by_id(usdt).await.unwrap().unwrap();
    assert_eq!(from_atoms(wallet.balance), dec!(250));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sells_exactly_one_succeeds() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let guard = h.guard.clone();
        let (user, request) = (h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)));
        handles.push(tokio::spawn(async move { guard.place(user, request).await }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(SettlementError::InsufficientBalance) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(h.available(btc).await, dec!(4));

    let count = h
        .db
        .order_repo()
        .count_by_user(h.user, &OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_placements_never_overdraw() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let guard = h.guard.clone();
        let (user, request) = (h.user, h.order(OrderSide::Sell, dec!(50), dec!(3)));
        handles.push(tokio::spawn(async move { guard.place(user, request).await }));
    }

    let mut reserved = Decimal::ZERO;
    for handle in handles {
        if let Ok(order) = handle.await.unwrap() {
            reserved += order.reserved_amount;
        }
    }
    assert_eq!(reserved, dec!(9));
    assert_eq!(h.available(btc).await, dec!(1));
}

#[tokio::test]
async fn test_unknown_pair_and_missing_wallet() {
    let h = Harness::new().await;
    h.fund("BTC", dec!(1)).await;

    let mut request = h.order(OrderSide::Sell, dec!(100), dec!(1));
    request.trading_pair_id = 9_999;
    let err = h.guard.place(h.user, request).await.unwrap_err();
    assert!(matches!(err, SettlementError::TradingPairNotFound));
    assert_eq!(err.to_string(), "Trading pair not found");

    let err = h
        .guard
        .place(h.user, h.order(OrderSide::Buy, dec!(100), dec!(1)))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No USDT wallet found");
}

#[tokio::test]
async fn test_invalid_amounts_change_nothing() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;

    for (price, amount) in [
        (dec!(0), dec!(1)),
        (dec!(100), dec!(-1)),
        (dec!(100), dec!(0.000000001)),
    ] {
        let err = h
            .guard
            .place(h.user, h.order(OrderSide::Sell, price, amount))
            .await
            .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)), "{price} x {amount}");
    }
    assert_eq!(h.available(btc).await, dec!(10));
}

#[tokio::test]
async fn test_failed_order_insert_releases_reservation() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    h.reject_inserts("orders").await;

    let err = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Transaction(_)));

    // The reserve and its ledger row ran before the insert failed
    assert_eq!(h.available(btc).await, dec!(10));
    assert_eq!(h.ledger_len(btc).await, 1);
    assert_eq!(h.order_count().await, 0);
    assert_eq!(h.db.outbox_repo().count_pending().await.unwrap(), 0);

    h.allow_inserts("orders").await;
    h.guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();
    assert_eq!(h.available(btc).await, dec!(4));
}

#[tokio::test]
async fn test_failed_event_enqueue_discards_placement() {
    let h = Harness::new().await;
    let usdt = h.fund("USDT", dec!(250)).await;
    h.reject_inserts("outbox_events").await;

    let err = h
        .guard
        .place(h.user, h.order(OrderSide::Buy, dec!(100), dec!(2)))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::Transaction(_)));

    assert_eq!(h.available(usdt).await, dec!(250));
    assert_eq!(h.ledger_len(usdt).await, 1);
    assert_eq!(h.order_count().await, 0);
}

#[tokio::test]
async fn test_suspended_wallet_cannot_back_new_orders() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    let open = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();

    h.db
        .wallet_repo()
        .set_status(btc, WalletStatus::Suspended)
        .await
        .unwrap();

    let err = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::WalletNotFound { .. }));
    assert_eq!(err.to_string(), "No BTC wallet found");
    assert_eq!(h.available(btc).await, dec!(4));

    // Locked funds still come back
    h.guard.cancel(h.user, open.id).await.unwrap();
    assert_eq!(h.available(btc).await, dec!(10));
}

#[tokio::test]
async fn test_placed_orders_are_scheduled_for_matching() {
    let (matcher, mut rx) = ChannelMatcher::new(8);
    let h = Harness::with_matcher(Arc::new(matcher)).await;
    h.fund("BTC", dec!(1)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(1)))
        .await
        .unwrap();
    assert_eq!(rx.recv().await, Some(order.id));
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_buy_refunds_remaining_value() {
    let h = Harness::new().await;
    let usdt = h.fund("USDT", dec!(250)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Buy, dec!(100), dec!(2)))
        .await
        .unwrap();
    let cancelled = h.guard.cancel(h.user, order.id).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.available(usdt).await, dec!(250));

    let ledger = h.db.wallet_repo().transactions(usdt, 10, 0).await.unwrap();
    assert_eq!(ledger[0].kind, "order_release");
    assert_eq!(from_atoms(ledger[0].amount), dec!(200));
    assert_eq!(ledger[0].reference_id, Some(order.id));
}

#[tokio::test]
async fn test_place_then_cancel_round_trips_with_rounding() {
    let h = Harness::new().await;
    let usdt = h.fund("USDT", dec!(1)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Buy, dec!(0.3), dec!(0.33333333)))
        .await
        .unwrap();
    assert_eq!(order.reserved_amount, dec!(0.1));
    assert_eq!(h.available(usdt).await, dec!(0.9));

    h.guard.cancel(h.user, order.id).await.unwrap();
    assert_eq!(h.available(usdt).await, dec!(1));
}

#[tokio::test]
async fn test_double_cancel_is_not_found() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();
    h.guard.cancel(h.user, order.id).await.unwrap();
    assert_eq!(h.available(btc).await, dec!(10));

    let err = h.guard.cancel(h.user, order.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotFound));
    assert_eq!(h.available(btc).await, dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancels_refund_once() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..3 {
        let guard = h.guard.clone();
        let (user, id) = (h.user, order.id);
        handles.push(tokio::spawn(async move { guard.cancel(user, id).await }));
    }

    let mut cancelled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => cancelled += 1,
            Err(SettlementError::OrderNotFound) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(cancelled, 1);
    assert_eq!(h.available(btc).await, dec!(10));
}

#[tokio::test]
async fn test_cancel_filled_order_is_not_found() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();

    let mut tx = h.db.begin().await.unwrap();
    OrderRepo::update_status(&mut *tx, order.id, None, OrderStatus::Filled, &[OrderStatus::Pending])
        .await
        .unwrap()
        .unwrap();
    tx.commit().await.unwrap();

    let err = h.guard.cancel(h.user, order.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotFound));
    assert_eq!(h.available(btc).await, dec!(4));
}

#[tokio::test]
async fn test_failed_cancel_keeps_order_open_and_funds_locked() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();
    h.reject_inserts("outbox_events").await;

    // Status change and refund both precede the failing enqueue
    let err = h.guard.cancel(h.user, order.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::Transaction(_)));

    let stored = h.db.order_repo().find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "pending");
    assert_eq!(h.available(btc).await, dec!(4));
    assert_eq!(h.ledger_len(btc).await, 2);

    h.allow_inserts("outbox_events").await;
    let cancelled = h.guard.cancel(h.user, order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.available(btc).await, dec!(10));
    assert_eq!(h.ledger_len(btc).await, 3);
}

#[tokio::test]
async fn test_cannot_cancel_another_users_order() {
    let h = Harness::new().await;
    let btc = h.fund("BTC", dec!(10)).await;
    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(6)))
        .await
        .unwrap();

    let err = h.guard.cancel(Uuid::new_v4(), order.id).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotFound));
    assert_eq!(h.available(btc).await, dec!(4));

    let stored = h.db.order_repo().find_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, "pending");
}

// ============================================================================
// Outbox delivery
// ============================================================================

/// Fails its first `failures` deliveries, then forwards to a broadcast notifier
struct FlakyNotifier {
    failures: usize,
    calls: AtomicUsize,
    inner: BroadcastNotifier,
}

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            return Err(NotifyError::Delivery("subscriber offline".to_string()));
        }
        self.inner.publish(topic, payload).await
    }
}

#[tokio::test]
async fn test_events_delivered_in_commit_order() {
    let h = Harness::new().await;
    h.fund("BTC", dec!(10)).await;
    let notifier = BroadcastNotifier::new(16);
    let mut rx = notifier.subscribe();

    let order = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(2)))
        .await
        .unwrap();
    h.guard.cancel(h.user, order.id).await.unwrap();

    let delivered = h.dispatcher(Arc::new(notifier)).drain().await.unwrap();
    assert_eq!(delivered, 2);

    let placed = rx.recv().await.unwrap();
    assert_eq!(placed.topic, "newOrder");
    assert_eq!(placed.payload["tradingPair"], "BTC/USDT");
    assert_eq!(placed.payload["order"]["id"], order.id.to_string());

    let cancelled = rx.recv().await.unwrap();
    assert_eq!(cancelled.topic, "cancelOrder");
    assert_eq!(cancelled.payload["orderId"], order.id.to_string());

    assert_eq!(h.db.outbox_repo().count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_delivery_is_retried() {
    let h = Harness::new().await;
    h.fund("BTC", dec!(10)).await;
    let inner = BroadcastNotifier::new(16);
    let mut rx = inner.subscribe();
    let dispatcher = h.dispatcher(Arc::new(FlakyNotifier {
        failures: 1,
        calls: AtomicUsize::new(0),
        inner,
    }));

    h.guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(1)))
        .await
        .unwrap();

    assert_eq!(dispatcher.drain().await.unwrap(), 0);
    let pending = h.db.outbox_repo().pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.is_some());

    assert_eq!(dispatcher.drain().await.unwrap(), 1);
    assert_eq!(rx.recv().await.unwrap().topic, "newOrder");
}

#[tokio::test]
async fn test_undeliverable_event_is_abandoned_after_max_attempts() {
    let h = Harness::new().await;
    h.fund("BTC", dec!(10)).await;
    let inner = BroadcastNotifier::new(16);
    let mut rx = inner.subscribe();
    let dispatcher = h.dispatcher(Arc::new(FlakyNotifier {
        failures: 3,
        calls: AtomicUsize::new(0),
        inner,
    }));

    h.guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(1)))
        .await
        .unwrap();
    let second = h
        .guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(2)))
        .await
        .unwrap();

    // The head event blocks the queue until its third failure
    assert_eq!(dispatcher.drain().await.unwrap(), 0);
    assert_eq!(dispatcher.drain().await.unwrap(), 0);
    assert_eq!(dispatcher.drain().await.unwrap(), 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.payload["order"]["id"], second.id.to_string());

    let outbox = h.db.outbox_repo();
    assert_eq!(outbox.count_pending().await.unwrap(), 0);
    assert_eq!(outbox.count_abandoned().await.unwrap(), 1);
}

#[tokio::test]
async fn test_running_dispatcher_is_woken_by_commits() {
    let h = Harness::new().await;
    h.fund("BTC", dec!(10)).await;
    let notifier = BroadcastNotifier::new(16);
    let mut rx = notifier.subscribe();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = h.dispatcher(Arc::new(notifier)).spawn(shutdown_rx);

    h.guard
        .place(h.user, h.order(OrderSide::Sell, dec!(100), dec!(1)))
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.topic, "newOrder");

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
