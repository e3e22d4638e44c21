//! IPFS daemon RPC client.

use crate::addr::ApiAddr;
use crate::api::StorageApi;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Client for one IPFS daemon's `/api/v0` endpoint.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    base: String,
    http: Client,
}

#[derive(Deserialize)]
struct ResolveResponse {
    #[serde(rename = "Path")]
    path: String,
}

impl IpfsClient {
    /// Create a client. Every request is bounded by `timeout`.
    pub fn new(addr: &ApiAddr, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: format!("{}/api/v0", addr.base_url()),
            http,
        })
    }

    /// The `/api/v0` base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn call(&self, cmd: &str, query: &[(&str, &str)]) -> Result<Response> {
        let url = format!("{}/{}", self.base, cmd);
        debug!(%url, ?query, "ipfs rpc call");
        let resp = self.http.post(&url).query(query).send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Error::from_response(resp).await)
        }
    }
}

#[async_trait]
impl StorageApi for IpfsClient {
    async fn refs(&self, path: &str) -> Result<()> {
        let resp = self
            .call("refs", &[("arg", path), ("recursive", "true")])
            .await?;

        let mut body = resp.bytes_stream();
        let mut received = 0usize;
        while let Some(chunk) = body.next().await {
            received += chunk?.len();
        }
        trace!(path, received, "drained refs listing");
        Ok(())
    }

    async fn pin(&self, path: &str) -> Result<()> {
        let resp = self
            .call("pin/add", &[("arg", path), ("recursive", "true")])
            .await?;
        resp.bytes().await?;
        Ok(())
    }

    async fn unpin(&self, path: &str) -> Result<()> {
        let resp = self
            .call("pin/rm", &[("arg", path), ("recursive", "true")])
            .await?;
        resp.bytes().await?;
        Ok(())
    }

    async fn resolve_path(&self, path: &str) -> Result<String> {
        let resp = self
            .call("resolve", &[("arg", path), ("recursive", "true")])
            .await?;
        let resolved: ResolveResponse = resp.json().await?;
        Ok(resolved
            .path
            .strip_prefix("/ipfs/")
            .unwrap_or(&resolved.path)
            .to_string())
    }
}
