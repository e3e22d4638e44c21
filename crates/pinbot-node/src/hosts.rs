//! Host list loading.
//!
//! Cluster peers come from the cluster peer file. Each peer also contributes a storage
//! endpoint: its IPFS proxy on the same host, so that resolution and fan-out go through
//! the same daemons. Only when there are no cluster peers is the plain hosts file used.

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use pinbot_core::{ClusterPeer, Endpoint};
use pinbot_ipfs::{ApiAddr, ClusterApi, ClusterClient, IpfsClient, StorageApi};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Storage daemon used when no host list exists.
pub const DEFAULT_HOST: &str = "localhost:5001";

/// Storage endpoints and cluster coordinators, in file order.
#[derive(Debug, Default)]
pub struct Hosts {
    pub endpoints: Vec<Endpoint>,
    pub peers: Vec<ClusterPeer>,
}

/// Read a host list: one entry per line, blank lines and `#` comments skipped.
///
/// Returns `None` if the file does not exist.
pub fn read_host_list(path: &Path) -> Result<Option<Vec<String>>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(
        contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect(),
    ))
}

/// Build clients for every configured host.
pub fn load(config: &NodeConfig) -> Result<Hosts> {
    let mut hosts = Hosts::default();

    let cluster_peers = read_host_list(&config.cluster_peers_file)?.unwrap_or_default();
    for line in &cluster_peers {
        let addr = parse(&config.cluster_peers_file, line)?;
        let cluster = ClusterClient::new(&addr, config.cluster_auth.clone(), config.request_timeout)?;
        let proxy = addr.with_port(config.proxy_port);
        let ipfs = IpfsClient::new(&proxy, config.request_timeout)?;

        hosts
            .peers
            .push(ClusterPeer::new(line.clone(), Arc::new(cluster) as Arc<dyn ClusterApi>));
        hosts
            .endpoints
            .push(Endpoint::new(proxy.base_url(), Arc::new(ipfs) as Arc<dyn StorageApi>));
    }

    if cluster_peers.is_empty() {
        let lines = match read_host_list(&config.hosts_file)? {
            Some(lines) => lines,
            None => {
                warn!(
                    file = ?config.hosts_file,
                    "failed to open hosts file, defaulting to {}", DEFAULT_HOST
                );
                vec![DEFAULT_HOST.to_string()]
            }
        };
        for line in &lines {
            let addr = parse(&config.hosts_file, line)?;
            let ipfs = IpfsClient::new(&addr, config.request_timeout)?;
            hosts
                .endpoints
                .push(Endpoint::new(addr.base_url(), Arc::new(ipfs) as Arc<dyn StorageApi>));
        }
    }

    info!(
        endpoints = hosts.endpoints.len(),
        cluster_peers = hosts.peers.len(),
        "loaded hosts"
    );
    Ok(hosts)
}

fn parse(file: &Path, line: &str) -> Result<ApiAddr> {
    ApiAddr::parse(line).map_err(|e| Error::HostList {
        file: file.display().to_string(),
        reason: e.to_string(),
    })
}
