//! API address parsing.
//!
//! Host lists written for the cluster tools use multiaddrs (`/ip4/10.0.0.1/tcp/9094`),
//! while daemon host lists are usually `host:port`. Both end up as an HTTP base URL.

use crate::error::{Error, Result};
use std::fmt;

/// An HTTP API location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiAddr {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl ApiAddr {
    /// Parse a multiaddr, `host:port`, or `http(s)://host:port` address.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('/') {
            return Self::parse_multiaddr(text);
        }

        let (scheme, rest) = match text.split_once("://") {
            Some((scheme, rest)) => (scheme.to_string(), rest),
            None => ("http".to_string(), text),
        };
        let rest = rest.trim_end_matches('/');
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidAddress(text.to_string()))?;
        let port = port
            .parse()
            .map_err(|_| Error::InvalidAddress(text.to_string()))?;
        if host.is_empty() {
            return Err(Error::InvalidAddress(text.to_string()));
        }

        Ok(Self {
            scheme,
            host: host.trim_matches(|c| c == '[' || c == ']').to_string(),
            port,
        })
    }

    fn parse_multiaddr(text: &str) -> Result<Self> {
        let invalid = || Error::InvalidAddress(text.to_string());
        let parts: Vec<&str> = text.split('/').filter(|p| !p.is_empty()).collect();

        let (host, rest) = match parts.as_slice() {
            [proto, host, rest @ ..]
                if matches!(*proto, "ip4" | "ip6" | "dns" | "dns4" | "dns6") =>
            {
                (host.to_string(), rest)
            }
            _ => return Err(invalid()),
        };
        let (port, rest) = match rest {
            ["tcp", port, rest @ ..] => (port.parse().map_err(|_| invalid())?, rest),
            _ => return Err(invalid()),
        };
        let scheme = match rest {
            [] | ["http"] => "http",
            ["https"] | ["tls", "http"] => "https",
            _ => return Err(invalid()),
        };

        Ok(Self {
            scheme: scheme.to_string(),
            host,
            port,
        })
    }

    /// Same host, different port (used to reach a cluster peer's IPFS proxy).
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

impl fmt::Display for ApiAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}
