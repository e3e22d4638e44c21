//! Outbound delivery for notifications.

use async_trait::async_trait;
use pinbot_core::{MessageSink, Notification};
use tokio::sync::broadcast;
use tracing::info;

/// Default number of notifications buffered per subscriber.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 1024;

/// Logs every notification and broadcasts it to connected operators.
///
/// Nobody listening is not a failure: the log record is the delivery.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sender side, for handing out subscriptions.
    pub fn sender(&self) -> broadcast::Sender<Notification> {
        self.tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl MessageSink for BroadcastSink {
    async fn deliver(&self, notification: &Notification) -> pinbot_core::Result<()> {
        info!(recipient = %notification.recipient, "{}", notification.text);
        let _ = self.tx.send(notification.clone());
        Ok(())
    }
}
