//! Notification queue.
//!
//! Every operator-visible line produced by the engine goes through a single bounded
//! channel and is delivered by one consumer task, in enqueue order. Producers never talk
//! to the outbound transport directly, and a delivery failure only costs the message
//! that failed.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 500;

/// Default pause after a failed delivery.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

/// A line of text addressed to an operator or channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub text: String,
}

/// Outbound transport for notifications.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    pub(crate) fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Queue a notification. Waits only while the queue is full.
    pub async fn enqueue(&self, recipient: impl Into<String>, text: impl Into<String>) -> Result<()> {
        self.tx
            .send(Notification {
                recipient: recipient.into(),
                text: text.into(),
            })
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// A handle that always writes to `recipient`.
    pub fn reporter(&self, recipient: impl Into<String>) -> Reporter {
        Reporter {
            notifier: self.clone(),
            recipient: recipient.into(),
        }
    }
}

/// A [`Notifier`] bound to one recipient.
///
/// Reporting is best effort: if the queue is gone the line is logged and dropped, so
/// callers never have to handle notification failures.
#[derive(Debug, Clone)]
pub struct Reporter {
    notifier: Notifier,
    recipient: String,
}

impl Reporter {
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub async fn say(&self, text: impl Into<String>) {
        let text = text.into();
        if self.notifier.enqueue(&self.recipient, text.clone()).await.is_err() {
            warn!(recipient = %self.recipient, %text, "notification queue closed, dropping message");
        }
    }

    /// Send several lines, keeping them together in the order given.
    pub async fn say_all(&self, lines: impl IntoIterator<Item = String>) {
        for line in lines {
            self.say(line).await;
        }
    }
}

/// Counters returned when the consumer stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub delivered: usize,
    pub dropped: usize,
}

/// The single consumer side of the queue.
pub struct NotificationQueue {
    rx: mpsc::Receiver<Notification>,
    sink: Arc<dyn MessageSink>,
    backoff: Duration,
}

impl NotificationQueue {
    /// Create a queue and its producer handle.
    pub fn new(capacity: usize, sink: Arc<dyn MessageSink>) -> (Notifier, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            rx,
            sink,
            backoff: DEFAULT_BACKOFF,
        };
        (Notifier::new(tx), queue)
    }

    /// Pause applied after a delivery failure.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Deliver queued notifications until every [`Notifier`] is dropped.
    pub async fn run(mut self) -> DeliveryStats {
        let mut stats = DeliveryStats::default();
        while let Some(notification) = self.rx.recv().await {
            match self.sink.deliver(&notification).await {
                Ok(()) => {
                    stats.delivered += 1;
                }
                Err(e) => {
                    stats.dropped += 1;
                    warn!(
                        recipient = %notification.recipient,
                        error = %e,
                        backoff = ?self.backoff,
                        "failed to deliver notification, backing off"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }
        debug!(?stats, "notification queue closed");
        stats
    }
}
