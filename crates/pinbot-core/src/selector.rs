//! Cluster peer selection.
//!
//! All cluster peers share the same pinset, so any of them can take an authoritative
//! operation. Two strategies are available behind one [`PeerSelector`]:
//!
//! - **Random**: a uniform pick per call. No memory, so a dead peer keeps getting picked.
//! - **Failover**: an ordered pool that sticks to the last peer that answered and walks
//!   to the next one on failure, up to a fixed retry budget per call.

use async_trait::async_trait;
use pinbot_ipfs::{ClusterApi, ContentId, GlobalStatus, PinOptions, StatusFilter, StorageApi};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default number of attempts a failover call makes before giving up.
pub const DEFAULT_RETRIES: usize = 5;

/// A storage node in the fan-out set.
#[derive(Clone)]
pub struct Endpoint {
    /// Display identity used in operator messages.
    pub url: String,
    pub client: Arc<dyn StorageApi>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, client: Arc<dyn StorageApi>) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("url", &self.url).finish()
    }
}

/// A cluster coordinator.
#[derive(Clone)]
pub struct ClusterPeer {
    /// Display identity used in operator messages.
    pub addr: String,
    pub client: Arc<dyn ClusterApi>,
}

impl ClusterPeer {
    pub fn new(addr: impl Into<String>, client: Arc<dyn ClusterApi>) -> Self {
        Self {
            addr: addr.into(),
            client,
        }
    }
}

impl fmt::Debug for ClusterPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterPeer").field("addr", &self.addr).finish()
    }
}

/// The outcome of a selection: who to talk to and how to describe it.
#[derive(Clone)]
pub struct SelectedPeer {
    /// Display identity for operator messages. Under failover the pool may answer from
    /// a later peer, so this names the pool and where it starts.
    pub addr: String,
    pub client: Arc<dyn ClusterApi>,
    /// Index of the selected coordinator; pairs it with the storage endpoint at the same
    /// position.
    pub index: usize,
}

impl fmt::Debug for SelectedPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedPeer")
            .field("addr", &self.addr)
            .field("index", &self.index)
            .finish()
    }
}

/// Selection strategy, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Random,
    Failover { retries: usize },
}

/// Chooses the coordinator for each cluster operation.
#[derive(Debug, Clone)]
pub enum PeerSelector {
    Random(Arc<[ClusterPeer]>),
    Failover(Arc<FailoverPool>),
}

impl PeerSelector {
    pub fn new(strategy: Strategy, peers: Vec<ClusterPeer>) -> Self {
        match strategy {
            Strategy::Random => Self::Random(peers.into()),
            Strategy::Failover { retries } => Self::Failover(Arc::new(FailoverPool::new(peers, retries))),
        }
    }

    /// Number of configured coordinators.
    pub fn peer_count(&self) -> usize {
        match self {
            Self::Random(peers) => peers.len(),
            Self::Failover(pool) => pool.peers.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.peer_count() == 0
    }

    pub fn select(&self) -> Result<SelectedPeer> {
        match self {
            Self::Random(peers) => {
                if peers.is_empty() {
                    return Err(Error::NoClusterPeers);
                }
                let index = rand::thread_rng().gen_range(0..peers.len());
                let peer = &peers[index];
                Ok(SelectedPeer {
                    addr: peer.addr.clone(),
                    client: Arc::clone(&peer.client),
                    index,
                })
            }
            Self::Failover(pool) => {
                if pool.peers.is_empty() {
                    return Err(Error::NoClusterPeers);
                }
                let index = pool.current();
                Ok(SelectedPeer {
                    addr: format!("cluster pool (starting at {})", pool.peers[index].addr),
                    client: Arc::clone(pool) as Arc<dyn ClusterApi>,
                    index,
                })
            }
        }
    }
}

/// Ordered coordinator pool with per-call failover.
pub struct FailoverPool {
    peers: Vec<ClusterPeer>,
    retries: usize,
    cursor: AtomicUsize,
}

impl fmt::Debug for FailoverPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverPool")
            .field("peers", &self.peers)
            .field("retries", &self.retries)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl FailoverPool {
    pub fn new(peers: Vec<ClusterPeer>, retries: usize) -> Self {
        Self {
            peers,
            retries: retries.max(1),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Index of the peer the next call starts with.
    pub fn current(&self) -> usize {
        match self.peers.len() {
            0 => 0,
            n => self.cursor.load(Ordering::Relaxed) % n,
        }
    }

    async fn with_failover<T, F, Fut>(&self, op: &'static str, call: F) -> pinbot_ipfs::Result<T>
    where
        F: Fn(Arc<dyn ClusterApi>) -> Fut + Send + Sync,
        Fut: Future<Output = pinbot_ipfs::Result<T>> + Send,
        T: Send,
    {
        let n = self.peers.len();
        if n == 0 {
            return Err(pinbot_ipfs::Error::InvalidAddress(
                "empty cluster peer pool".to_string(),
            ));
        }

        let start = self.current();
        let mut last_err = None;
        for attempt in 0..self.retries {
            let index = (start + attempt) % n;
            let peer = &self.peers[index];
            match call(Arc::clone(&peer.client)).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(op, peer = %peer.addr, attempt, "failover call succeeded");
                    }
                    self.cursor.store(index, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(op, peer = %peer.addr, attempt, error = %e, "cluster call failed, trying next peer");
                    last_err = Some(e);
                }
            }
        }

        // Start the next call after the peer that failed last.
        self.cursor
            .store((start + self.retries) % n, Ordering::Relaxed);
        Err(last_err.unwrap_or_else(|| {
            pinbot_ipfs::Error::InvalidAddress("empty cluster peer pool".to_string())
        }))
    }
}

#[async_trait]
impl ClusterApi for FailoverPool {
    async fn pin(&self, cid: &ContentId, opts: &PinOptions) -> pinbot_ipfs::Result<()> {
        self.with_failover("pin", |c| async move { c.pin(cid, opts).await })
            .await
    }

    async fn unpin(&self, cid: &ContentId) -> pinbot_ipfs::Result<()> {
        self.with_failover("unpin", |c| async move { c.unpin(cid).await })
            .await
    }

    async fn status(&self, cid: &ContentId, local: bool) -> pinbot_ipfs::Result<GlobalStatus> {
        self.with_failover("status", |c| async move { c.status(cid, local).await })
            .await
    }

    async fn status_all(
        &self,
        filter: &StatusFilter,
        local: bool,
    ) -> pinbot_ipfs::Result<Vec<GlobalStatus>> {
        self.with_failover("status_all", |c| async move {
            c.status_all(filter, local).await
        })
        .await
    }

    async fn recover(&self, cid: &ContentId, local: bool) -> pinbot_ipfs::Result<GlobalStatus> {
        self.with_failover("recover", |c| async move { c.recover(cid, local).await })
            .await
    }
}
