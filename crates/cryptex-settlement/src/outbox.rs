//! Outbox dispatcher
//!
//! Delivers events committed to the `outbox_events` table through a
//! [`Notifier`], at least once and in commit order. A failed delivery stays
//! at the head of the queue and is retried on the next pass, until it has
//! used up `max_attempts` and is abandoned.

use std::sync::Arc;
use std::time::Duration;

use cryptex_db::{DbOutboxEvent, Database, DbResult};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;

/// Dispatcher tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Fallback polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Events fetched per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Failed attempts after which an event is abandoned; 0 retries forever
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_batch_size() -> i64 {
    100
}

fn default_max_attempts() -> i64 {
    10
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Handle used to nudge the dispatcher after a commit
#[derive(Clone, Default)]
pub struct OutboxWaker {
    notify: Arc<Notify>,
}

impl OutboxWaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wake(&self) {
        self.notify.notify_one();
    }

    async fn woken(&self) {
        self.notify.notified().await;
    }
}

pub struct OutboxDispatcher {
    db: Database,
    notifier: Arc<dyn Notifier>,
    waker: OutboxWaker,
    config: OutboxConfig,
}

impl OutboxDispatcher {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>, waker: OutboxWaker, config: OutboxConfig) -> Self {
        Self {
            db,
            notifier,
            waker,
            config,
        }
    }

    /// Deliver pending events once, returning how many were delivered.
    ///
    /// Stops at the first failure so later events never overtake it.
    pub async fn drain(&self) -> DbResult<usize> {
        let repo = self.db.outbox_repo();
        let batch_size = self.config.batch_size.max(1);
        let mut delivered = 0;

        loop {
            let batch = repo.pending(batch_size).await?;
            if batch.is_empty() {
                return Ok(delivered);
            }
            let full_batch = batch.len() as i64 == batch_size;

            for event in batch {
                match self.deliver(&event).await {
                    Ok(()) => {
                        repo.mark_delivered(event.id).await?;
                        delivered += 1;
                    }
                    Err(reason) => {
                        let attempts = event.attempts + 1;
                        metrics::counter!("outbox_delivery_failures_total").increment(1);

                        if self.config.max_attempts > 0 && attempts >= self.config.max_attempts {
                            error!(
                                event_id = event.id,
                                topic = %event.topic,
                                attempts,
                                error = %reason,
                                "Outbox delivery abandoned"
                            );
                            metrics::counter!("outbox_events_abandoned_total").increment(1);
                            repo.mark_abandoned(event.id, &reason).await?;
                            continue;
                        }

                        warn!(
                            event_id = event.id,
                            topic = %event.topic,
                            attempts,
                            error = %reason,
                            "Outbox delivery failed, will retry"
                        );
                        repo.mark_failed(event.id, &reason).await?;
                        return Ok(delivered);
                    }
                }
            }

            if !full_batch {
                return Ok(delivered);
            }
        }
    }

    async fn deliver(&self, event: &DbOutboxEvent) -> Result<(), String> {
        let payload: serde_json::Value =
            serde_json::from_str(&event.payload).map_err(|e| format!("Corrupt payload: {}", e))?;
        self.notifier
            .publish(&event.topic, &payload)
            .await
            .map_err(|e| e.to_string())
    }

    /// Run until `shutdown` flips to `true`, then make a final pass
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        info!(poll_interval_ms = self.config.poll_interval_ms, "Outbox dispatcher started");

        loop {
            match self.drain().await {
                Ok(0) => {}
                Ok(n) => debug!(delivered = n, "Outbox drained"),
                Err(e) => error!(error = %e, "Outbox drain failed"),
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = self.waker.woken() => {}
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.drain().await {
            error!(error = %e, "Final outbox drain failed");
        }
        info!("Outbox dispatcher stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
