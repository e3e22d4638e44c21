//! Service capabilities consumed by the replication engine.

use crate::content_id::ContentId;
use crate::error::Result;
use crate::status::{GlobalStatus, StatusFilter};
use async_trait::async_trait;

/// An independent storage node (IPFS daemon RPC API).
///
/// Paths are IPFS paths (`/ipfs/<cid>[/sub]` or `/ipns/<name>[/sub]`).
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// List references below `path` recursively. The listing itself is drained and
    /// discarded; a successful call proves the daemon can reach the DAG.
    async fn refs(&self, path: &str) -> Result<()>;

    /// Pin `path` recursively.
    async fn pin(&self, path: &str) -> Result<()>;

    /// Remove the recursive pin on `path`.
    async fn unpin(&self, path: &str) -> Result<()>;

    /// Resolve `path` to a CID string (without the `/ipfs/` prefix).
    async fn resolve_path(&self, path: &str) -> Result<String>;
}

/// Options attached to a cluster pin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinOptions {
    /// Zero or negative lets the cluster pick.
    pub replication_min: i32,
    /// Zero or negative lets the cluster pick.
    pub replication_max: i32,
    /// Human readable label stored with the pin.
    pub name: String,
}

/// A cluster coordinator peer (IPFS Cluster REST API).
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn pin(&self, cid: &ContentId, opts: &PinOptions) -> Result<()>;

    async fn unpin(&self, cid: &ContentId) -> Result<()>;

    /// Global status of one pin. `local` restricts the answer to the queried peer.
    async fn status(&self, cid: &ContentId, local: bool) -> Result<GlobalStatus>;

    /// Global status of every pin matching `filter` (an empty filter matches all).
    async fn status_all(&self, filter: &StatusFilter, local: bool) -> Result<Vec<GlobalStatus>>;

    /// Retry failed operations for `cid` and return the resulting status.
    async fn recover(&self, cid: &ContentId, local: bool) -> Result<GlobalStatus>;
}
