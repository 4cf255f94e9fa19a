//! Event fan-out to connected clients

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Topic names carried by outbox events
pub mod topics {
    pub const NEW_ORDER: &str = "newOrder";
    pub const CANCEL_ORDER: &str = "cancelOrder";
}

/// A published event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub topic: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier is closed")]
    Closed,

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Best-effort publisher for order events
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), NotifyError>;
}

/// In-process notifier backed by a `tokio::sync::broadcast` channel.
///
/// Publishing with nobody subscribed succeeds: there is no one to tell.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let notification = Notification {
            topic: topic.to_string(),
            payload: payload.clone(),
        };

        match self.tx.send(notification) {
            Ok(receivers) => debug!(topic, receivers, "Published notification"),
            Err(_) => debug!(topic, "No subscribers for notification"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier
            .publish(topics::NEW_ORDER, &serde_json::json!({"orderId": "abc"}))
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.topic, "newOrder");
        assert_eq!(received.payload["orderId"], "abc");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let notifier = BroadcastNotifier::new(8);
        assert!(notifier
            .publish(topics::CANCEL_ORDER, &serde_json::Value::Null)
            .await
            .is_ok());
    }
}
