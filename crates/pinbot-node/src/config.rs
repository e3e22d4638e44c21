//! Node configuration.
//!
//! Everything comes from `PINBOT_*` environment variables with defaults. Relative file
//! names are taken relative to the data directory.

use crate::error::{Error, Result};
use pinbot_core::selector::DEFAULT_RETRIES;
use pinbot_core::{Settings, Strategy};
use pinbot_ipfs::ClusterAuth;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default port of a cluster peer's IPFS proxy.
pub const DEFAULT_PROXY_PORT: u16 = 9095;

/// Default bound on every storage and cluster request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Admin socket file name inside the data directory.
pub const DEFAULT_ADMIN_SOCKET: &str = "admin.sock";

/// Node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Directory holding host lists, the pin log and the admin socket
    pub data_dir: PathBuf,

    /// Gateway used in operator links
    pub gateway: String,

    /// Cluster API credentials
    pub cluster_auth: Option<ClusterAuth>,

    /// One cluster API address per line
    pub cluster_peers_file: PathBuf,

    /// One IPFS API `host:port` per line, used when there are no cluster peers
    pub hosts_file: PathBuf,

    pub pin_log: PathBuf,

    pub strategy: Strategy,

    pub replication_min: i32,
    pub replication_max: i32,

    /// Admin socket path (for pinbot-admin)
    pub admin_socket: PathBuf,

    pub proxy_port: u16,

    pub request_timeout: Duration,

    /// Prefix of command lines, e.g. `!` in `!pin`
    pub command_prefix: String,
}

impl NodeConfig {
    /// Create config from environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = data_dir(&var);
        let in_data_dir = |key: &str, default: &str| -> PathBuf {
            resolve_in(&data_dir, var(key).unwrap_or_else(|| default.to_string()))
        };

        let gateway = var("PINBOT_GATEWAY")
            .unwrap_or_else(|| pinbot_core::context::DEFAULT_GATEWAY.to_string())
            .trim_end_matches('/')
            .to_string();

        let cluster_auth = match (var("PINBOT_CLUSTER_USER"), var("PINBOT_CLUSTER_PASSWORD")) {
            (Some(username), password) => Some(ClusterAuth {
                username,
                password: password.unwrap_or_default(),
            }),
            (None, Some(_)) => {
                return Err(Error::Config(
                    "PINBOT_CLUSTER_PASSWORD is set without PINBOT_CLUSTER_USER".to_string(),
                ))
            }
            (None, None) => None,
        };

        let retries = parse_var(&var, "PINBOT_PEER_RETRIES", DEFAULT_RETRIES)?;
        let strategy = match var("PINBOT_PEER_STRATEGY").as_deref() {
            None | Some("random") => Strategy::Random,
            Some("failover") => Strategy::Failover { retries },
            Some(other) => {
                return Err(Error::Config(format!(
                    "Invalid PINBOT_PEER_STRATEGY {:?}: expected random or failover",
                    other
                )))
            }
        };

        let replication_min = parse_var(&var, "PINBOT_REPLICATION_MIN", 0)?;
        let replication_max = parse_var(&var, "PINBOT_REPLICATION_MAX", 0)?;
        if replication_max > 0 && replication_min > replication_max {
            return Err(Error::Config(format!(
                "PINBOT_REPLICATION_MIN ({}) exceeds PINBOT_REPLICATION_MAX ({})",
                replication_min, replication_max
            )));
        }

        let timeout_secs = parse_var(&var, "PINBOT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT.as_secs())?;
        if timeout_secs == 0 {
            return Err(Error::Config("PINBOT_REQUEST_TIMEOUT_SECS must be positive".to_string()));
        }

        Ok(Self {
            gateway,
            cluster_auth,
            cluster_peers_file: in_data_dir("PINBOT_CLUSTER_PEERS_FILE", "clusterpeers"),
            hosts_file: in_data_dir("PINBOT_HOSTS_FILE", "hosts"),
            pin_log: in_data_dir("PINBOT_PIN_LOG", pinbot_core::pinlog::DEFAULT_PIN_LOG),
            admin_socket: admin_socket_from_lookup(&var),
            strategy,
            replication_min,
            replication_max,
            proxy_port: parse_var(&var, "PINBOT_PROXY_PORT", DEFAULT_PROXY_PORT)?,
            request_timeout: Duration::from_secs(timeout_secs),
            command_prefix: var("PINBOT_COMMAND_PREFIX").unwrap_or_else(|| "!".to_string()),
            data_dir,
        })
    }

    /// Engine settings derived from this config.
    pub fn settings(&self) -> Settings {
        Settings {
            gateway: self.gateway.clone(),
            replication_min: self.replication_min,
            replication_max: self.replication_max,
            ..Settings::default()
        }
    }
}

/// Admin socket path from the environment, as the node binds it.
pub fn admin_socket_from_env() -> PathBuf {
    admin_socket_from_lookup(|key| std::env::var(key).ok())
}

/// `PINBOT_ADMIN_SOCKET`, relative to the data directory, defaulting to `admin.sock`.
pub fn admin_socket_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    resolve_in(
        &data_dir(&var),
        var("PINBOT_ADMIN_SOCKET").unwrap_or_else(|| DEFAULT_ADMIN_SOCKET.to_string()),
    )
}

fn data_dir(var: &impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(var("PINBOT_DATA_DIR").unwrap_or_else(|| ".".to_string()))
}

fn resolve_in(dir: &Path, file: String) -> PathBuf {
    let path = PathBuf::from(file);
    if path.is_absolute() {
        path
    } else {
        dir.join(path)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {} {:?}: {}", key, raw, e))),
    }
}
