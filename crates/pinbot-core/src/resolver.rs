//! Content identifier resolution.
//!
//! A bare CID or `/ipfs/<cid>` decodes locally. Anything that needs the DAG or the
//! naming system (`/ipns/...`, `/ipfs/<cid>/sub/path`) is resolved by exactly one call
//! to a storage endpoint, and that endpoint must be one the fan-out also uses so the
//! identifier matches what gets pinned.

use crate::error::{Error, Result};
use pinbot_ipfs::{ContentId, StorageApi};
use tracing::debug;

pub const IPFS_NAMESPACE: &str = "/ipfs";
pub const IPNS_NAMESPACE: &str = "/ipns";

/// Prefix a bare address with `/ipfs/`. Namespaced paths are returned unchanged.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with(IPFS_NAMESPACE) || path.starts_with(IPNS_NAMESPACE) {
        path.to_string()
    } else {
        format!("{}/{}", IPFS_NAMESPACE, path)
    }
}

/// Whether resolving `path` needs a round trip to a storage endpoint.
pub fn needs_resolution(path: &str) -> bool {
    let path = normalize_path(path);
    // ["", "ipfs", "<cid>"] is the only shape that decodes locally.
    path.starts_with(IPNS_NAMESPACE) || path.split('/').count() > 3
}

/// Turn a user supplied path into a canonical content identifier.
pub async fn resolve(path: &str, endpoint: &dyn StorageApi) -> Result<ContentId> {
    let path = normalize_path(path);

    if needs_resolution(&path) {
        let resolved = endpoint
            .resolve_path(&path)
            .await
            .map_err(|e| Error::UnresolvablePath {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        debug!(%path, %resolved, "resolved path via storage endpoint");
        return ContentId::decode(&resolved)
            .map_err(|e| Error::MalformedIdentifier(e.to_string()));
    }

    let direct = path.split('/').nth(2).unwrap_or_default();
    ContentId::decode(direct).map_err(|e| Error::MalformedIdentifier(e.to_string()))
}
