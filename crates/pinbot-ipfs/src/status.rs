//! Pin status as reported by cluster peers.

use crate::content_id::ContentId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Tracker status of a pin on one cluster peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PinStatus {
    /// Anything the peer reports that this client does not know about.
    Undefined,
    Queued,
    Pinning,
    Pinned,
    Unpinning,
    Unpinned,
    Error,
}

impl PinStatus {
    /// Parse a cluster tracker status string.
    ///
    /// Cluster splits some states by direction (`pin_queued`, `unpin_error`, ...); those
    /// collapse onto the single tags used here.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "queued" | "pin_queued" | "unpin_queued" => Self::Queued,
            "pinning" => Self::Pinning,
            "pinned" => Self::Pinned,
            "unpinning" => Self::Unpinning,
            "unpinned" => Self::Unpinned,
            "error" | "pin_error" | "unpin_error" | "cluster_error" => Self::Error,
            _ => Self::Undefined,
        }
    }

    /// The tag as used in status filters and operator messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Queued => "queued",
            Self::Pinning => "pinning",
            Self::Pinned => "pinned",
            Self::Unpinning => "unpinning",
            Self::Unpinned => "unpinned",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for PinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PinStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PinStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&s))
    }
}

/// Set of statuses used to filter a `statusAll` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusFilter(Vec<PinStatus>);

impl StatusFilter {
    pub fn new(statuses: impl IntoIterator<Item = PinStatus>) -> Self {
        let mut statuses: Vec<_> = statuses.into_iter().collect();
        statuses.sort();
        statuses.dedup();
        Self(statuses)
    }

    /// Everything that has not settled yet: errors and in-flight operations.
    pub fn ongoing() -> Self {
        Self::new([
            PinStatus::Error,
            PinStatus::Pinning,
            PinStatus::Queued,
            PinStatus::Unpinning,
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, status: PinStatus) -> bool {
        self.0.contains(&status)
    }

    /// Comma separated form expected by the `filter` query parameter.
    pub fn to_query(&self) -> String {
        self.0
            .iter()
            .map(PinStatus::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("all")
        } else {
            f.write_str(&self.to_query())
        }
    }
}

/// Status of a pin on a single cluster peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerStatus {
    #[serde(default, rename = "peername")]
    pub peer_name: String,
    pub status: PinStatus,
    #[serde(default)]
    pub error: String,
}

impl PeerStatus {
    pub fn new(peer_name: impl Into<String>, status: PinStatus) -> Self {
        Self {
            peer_name: peer_name.into(),
            status,
            error: String::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    /// A peer is failing when it says so or carries an error message.
    pub fn is_failing(&self) -> bool {
        self.status == PinStatus::Error || !self.error.is_empty()
    }
}

/// Status of a pin across every cluster peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStatus {
    pub cid: ContentId,
    /// Keyed by cluster peer ID.
    #[serde(default)]
    pub peer_map: BTreeMap<String, PeerStatus>,
}

impl GlobalStatus {
    pub fn new(cid: ContentId) -> Self {
        Self {
            cid,
            peer_map: BTreeMap::new(),
        }
    }

    pub fn with_peer(mut self, peer_id: impl Into<String>, status: PeerStatus) -> Self {
        self.peer_map.insert(peer_id.into(), status);
        self
    }
}
