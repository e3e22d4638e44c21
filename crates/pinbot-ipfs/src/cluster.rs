//! IPFS Cluster REST API client.

use crate::addr::ApiAddr;
use crate::api::{ClusterApi, PinOptions};
use crate::content_id::ContentId;
use crate::error::{Error, Result};
use crate::status::{GlobalStatus, StatusFilter};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

/// HTTP basic auth credentials for the cluster API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAuth {
    pub username: String,
    pub password: String,
}

/// Client for one cluster peer's REST API.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    base: String,
    http: Client,
    auth: Option<ClusterAuth>,
}

impl ClusterClient {
    /// Create a client. Every request is bounded by `timeout`.
    pub fn new(addr: &ApiAddr, auth: Option<ClusterAuth>, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base: addr.base_url(),
            http,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base, path);
        debug!(%method, %url, "cluster api call");
        let req = self.http.request(method, url);
        match &self.auth {
            Some(auth) => req.basic_auth(&auth.username, Some(&auth.password)),
            None => req,
        }
    }

    async fn send(req: RequestBuilder) -> Result<Response> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Error::from_response(resp).await)
        }
    }
}

fn local_flag(local: bool) -> &'static str {
    if local {
        "true"
    } else {
        "false"
    }
}

/// Newer peers stream one JSON object per line, older ones return an array.
fn parse_status_list(body: &str) -> Result<Vec<GlobalStatus>> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

#[async_trait]
impl ClusterApi for ClusterClient {
    async fn pin(&self, cid: &ContentId, opts: &PinOptions) -> Result<()> {
        let min = opts.replication_min.to_string();
        let max = opts.replication_max.to_string();
        let req = self
            .request(Method::POST, &format!("/pins/{}", cid))
            .query(&[
                ("replication-min", min.as_str()),
                ("replication-max", max.as_str()),
                ("name", opts.name.as_str()),
            ]);
        Self::send(req).await?.bytes().await?;
        Ok(())
    }

    async fn unpin(&self, cid: &ContentId) -> Result<()> {
        let req = self.request(Method::DELETE, &format!("/pins/{}", cid));
        Self::send(req).await?.bytes().await?;
        Ok(())
    }

    async fn status(&self, cid: &ContentId, local: bool) -> Result<GlobalStatus> {
        let req = self
            .request(Method::GET, &format!("/pins/{}", cid))
            .query(&[("local", local_flag(local))]);
        Ok(Self::send(req).await?.json().await?)
    }

    async fn status_all(&self, filter: &StatusFilter, local: bool) -> Result<Vec<GlobalStatus>> {
        let mut req = self
            .request(Method::GET, "/pins")
            .query(&[("local", local_flag(local))]);
        if !filter.is_empty() {
            req = req.query(&[("filter", filter.to_query())]);
        }
        let body = Self::send(req).await?.text().await?;
        parse_status_list(&body)
    }

    async fn recover(&self, cid: &ContentId, local: bool) -> Result<GlobalStatus> {
        let req = self
            .request(Method::POST, &format!("/pins/{}/recover", cid))
            .query(&[("local", local_flag(local))]);
        Ok(Self::send(req).await?.json().await?)
    }
}
