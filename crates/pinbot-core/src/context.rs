//! Process-wide, read-only context.
//!
//! Built once at startup and shared by `Arc`; nothing in here changes afterwards.

use crate::error::{Error, Result};
use crate::notify::{Notifier, Reporter};
use crate::pinlog::PinLog;
use crate::selector::{Endpoint, PeerSelector};
use crate::tracker::TrackerConfig;
use std::time::Duration;

/// Public gateway used in operator links.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.io";

/// Default pause between entries when listing every pin status.
pub const DEFAULT_STATUS_ALL_PAUSE: Duration = Duration::from_secs(5);

/// Tunables for the operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Gateway prefix for links, without a trailing slash.
    pub gateway: String,
    /// Replication factors requested on cluster pins. Zero or negative lets the cluster
    /// decide.
    pub replication_min: i32,
    pub replication_max: i32,
    pub tracker: TrackerConfig,
    pub status_all_pause: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            replication_min: 0,
            replication_max: 0,
            tracker: TrackerConfig::default(),
            status_all_pause: DEFAULT_STATUS_ALL_PAUSE,
        }
    }
}

/// Endpoint and coordinator lists plus the shared services every operation uses.
#[derive(Debug)]
pub struct Context {
    endpoints: Vec<Endpoint>,
    selector: PeerSelector,
    pin_log: PinLog,
    notifier: Notifier,
    settings: Settings,
}

impl Context {
    pub fn new(
        endpoints: Vec<Endpoint>,
        selector: PeerSelector,
        pin_log: PinLog,
        notifier: Notifier,
        settings: Settings,
    ) -> Self {
        Self {
            endpoints,
            selector,
            pin_log,
            notifier,
            settings,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn selector(&self) -> &PeerSelector {
        &self.selector
    }

    pub fn pin_log(&self) -> &PinLog {
        &self.pin_log
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reporter(&self, recipient: &str) -> Reporter {
        self.notifier.reporter(recipient)
    }

    /// The storage endpoint paired with the coordinator at `index`.
    ///
    /// Coordinators and their IPFS proxies are loaded side by side, so the same index
    /// addresses both. If there are fewer endpoints than coordinators the index wraps.
    pub fn paired_endpoint(&self, index: usize) -> Result<&Endpoint> {
        if self.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(&self.endpoints[index % self.endpoints.len()])
    }
}
