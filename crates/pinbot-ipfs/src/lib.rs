//! Pinbot IPFS - clients for the services pinbot orchestrates.
//!
//! Two kinds of remote service are involved when content is replicated:
//!
//! - **Storage endpoints**: plain IPFS daemons (or an IPFS Cluster proxy) speaking the
//!   `/api/v0` RPC API. They pin, unpin, list references and resolve paths.
//! - **Cluster peers**: IPFS Cluster REST API peers. They accept authoritative pin/unpin
//!   requests with replication bounds and report the global pin status per peer.
//!
//! Both are exposed as object-safe async traits ([`StorageApi`], [`ClusterApi`]) so the
//! replication engine can be driven against fakes in tests, with reqwest-backed
//! implementations ([`IpfsClient`], [`ClusterClient`]) for production.

pub mod addr;
pub mod api;
pub mod cluster;
pub mod content_id;
pub mod error;
pub mod ipfs;
pub mod status;

pub use addr::ApiAddr;
pub use api::{ClusterApi, PinOptions, StorageApi};
pub use cluster::{ClusterAuth, ClusterClient};
pub use content_id::ContentId;
pub use error::{Error, Result};
pub use ipfs::IpfsClient;
pub use status::{GlobalStatus, PeerStatus, PinStatus, StatusFilter};

pub use reqwest::StatusCode;
