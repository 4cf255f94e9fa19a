//! Hook into an external matching engine

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Receives newly placed orders for matching.
///
/// Scheduling is fire-and-forget and must never block or fail a placement.
pub trait Matcher: Send + Sync {
    fn schedule_match(&self, order_id: Uuid);
}

/// Matcher that does nothing; orders rest until cancelled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMatcher;

impl Matcher for NoopMatcher {
    fn schedule_match(&self, order_id: Uuid) {
        debug!(%order_id, "No matcher attached");
    }
}

/// Hands order ids to a matching engine over a bounded queue
#[derive(Clone)]
pub struct ChannelMatcher {
    tx: mpsc::Sender<Uuid>,
}

impl ChannelMatcher {
    /// Create the matcher and the receiving end for the engine
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Uuid>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl Matcher for ChannelMatcher {
    fn schedule_match(&self, order_id: Uuid) {
        match self.tx.try_send(order_id) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%order_id, "Matcher queue full, order not scheduled");
                metrics::counter!("matcher_queue_full_total").increment(1);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%order_id, "Matcher queue closed, order not scheduled");
            }
        }
    }
}
