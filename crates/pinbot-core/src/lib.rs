//! Pinbot Core - replication fan-out and convergence tracking
//!
//! Replicates content across independent IPFS daemons and an IPFS Cluster, then watches
//! the cluster until the pin converges.
//!
//! # Architecture
//!
//! - **Resolver**: turns a user supplied path into a canonical content identifier
//! - **Selector**: picks the cluster coordinator for each authoritative operation
//! - **Fanout**: runs pin/unpin on every storage endpoint concurrently
//! - **Tracker**: polls the cluster until a replication quorum, an error, or a deadline
//! - **Notify**: the single ordered queue every operator-visible line goes through
//! - **Service**: the operations the request layer calls
//!
//! # Example
//!
//! ```no_run
//! use pinbot_core::{Context, MessageSink, NotificationQueue, PeerSelector, PinLog, Pinbot, Settings, Strategy};
//! use std::sync::Arc;
//!
//! async fn serve(sink: Arc<dyn MessageSink>) {
//!     let (notifier, queue) = NotificationQueue::new(500, sink);
//!     tokio::spawn(queue.run());
//!
//!     let ctx = Context::new(
//!         Vec::new(),
//!         PeerSelector::new(Strategy::Random, Vec::new()),
//!         PinLog::new("pins.log"),
//!         notifier,
//!         Settings::default(),
//!     );
//!     let bot = Pinbot::new(Arc::new(ctx));
//!     bot.status("#ipfs", "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").await;
//! }
//! ```

pub mod context;
pub mod error;
pub mod fanout;
pub mod notify;
pub mod pinlog;
pub mod report;
pub mod resolver;
pub mod selector;
pub mod service;
pub mod tracker;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod scenarios;

pub use context::{Context, Settings};
pub use error::{Error, Result};
pub use fanout::{EndpointFailure, FanoutReport, Operation};
pub use notify::{DeliveryStats, MessageSink, Notification, NotificationQueue, Notifier, Reporter};
pub use pinlog::PinLog;
pub use resolver::{normalize_path, resolve};
pub use selector::{ClusterPeer, Endpoint, PeerSelector, Strategy};
pub use service::{Pinbot, Submission};
pub use tracker::{ConvergenceTracker, Outcome, Quorum, TrackerConfig};
