//! In-memory storage endpoints and cluster peers for tests.

use crate::notify::{Notification, Notifier};
use async_trait::async_trait;
use pinbot_ipfs::{
    ClusterApi, ContentId, Error, GlobalStatus, PinOptions, Result, StatusCode, StatusFilter,
    StorageApi,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

fn api_error(status: StatusCode, message: &str) -> Error {
    Error::Api {
        status,
        message: message.to_string(),
    }
}

/// A storage endpoint that records calls and fails on request.
#[derive(Default)]
pub struct MockStorage {
    resolve_to: Option<String>,
    failure: Option<(StatusCode, String)>,
    fail_op: Option<&'static str>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    resolve_calls: AtomicUsize,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolving_to(mut self, cid: &str) -> Self {
        self.resolve_to = Some(cid.to_string());
        self
    }

    /// Every call fails with a 500 carrying `message`.
    pub fn failing_with(self, message: &str) -> Self {
        self.failing_with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn failing_with_status(mut self, status: StatusCode, message: &str) -> Self {
        self.failure = Some((status, message.to_string()));
        self
    }

    /// Restrict the configured failure to one operation (`refs`, `pin`, `unpin`, `resolve`).
    pub fn only_on(mut self, op: &'static str) -> Self {
        self.fail_op = Some(op);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    async fn record(&self, op: &'static str, arg: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", op, arg));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match (&self.failure, self.fail_op) {
            (Some((status, msg)), None) => Err(api_error(*status, msg)),
            (Some((status, msg)), Some(only)) if only == op => Err(api_error(*status, msg)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl StorageApi for MockStorage {
    async fn refs(&self, path: &str) -> Result<()> {
        self.record("refs", path).await
    }

    async fn pin(&self, path: &str) -> Result<()> {
        self.record("pin", path).await
    }

    async fn unpin(&self, path: &str) -> Result<()> {
        self.record("unpin", path).await
    }

    async fn resolve_path(&self, path: &str) -> Result<String> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.record("resolve", path).await?;
        self.resolve_to
            .clone()
            .ok_or_else(|| api_error(StatusCode::INTERNAL_SERVER_ERROR, "no resolution configured"))
    }
}

/// A cluster peer that replays scripted status snapshots.
///
/// Each `status` call pops the next scripted answer; the last one repeats forever.
#[derive(Default)]
pub struct MockCluster {
    statuses: Mutex<VecDeque<std::result::Result<GlobalStatus, String>>>,
    listing: Vec<GlobalStatus>,
    fail_op: Option<(&'static str, String)>,
    calls: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_status(self, status: GlobalStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(status));
        self
    }

    pub fn then_status_error(self, message: &str) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn listing(mut self, statuses: Vec<GlobalStatus>) -> Self {
        self.listing = statuses;
        self
    }

    /// Fail `op` (`pin`, `unpin`, `status_all`, `recover`) with `message`.
    pub fn failing(mut self, op: &'static str, message: &str) -> Self {
        self.fail_op = Some((op, message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn record(&self, op: &'static str, arg: String) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", op, arg));
        match &self.fail_op {
            Some((failing, msg)) if *failing == op => {
                Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, msg))
            }
            _ => Ok(()),
        }
    }

    fn next_status(&self, cid: &ContentId) -> Result<GlobalStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        match next {
            Some(Ok(status)) => Ok(status),
            Some(Err(msg)) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, &msg)),
            None => Ok(GlobalStatus::new(*cid)),
        }
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn pin(&self, cid: &ContentId, opts: &PinOptions) -> Result<()> {
        self.record(
            "pin",
            format!(
                "{} min={} max={} name={}",
                cid, opts.replication_min, opts.replication_max, opts.name
            ),
        )
    }

    async fn unpin(&self, cid: &ContentId) -> Result<()> {
        self.record("unpin", cid.to_string())
    }

    async fn status(&self, cid: &ContentId, _local: bool) -> Result<GlobalStatus> {
        self.next_status(cid)
    }

    async fn status_all(&self, filter: &StatusFilter, _local: bool) -> Result<Vec<GlobalStatus>> {
        self.record("status_all", filter.to_string())?;
        Ok(self.listing.clone())
    }

    async fn recover(&self, cid: &ContentId, _local: bool) -> Result<GlobalStatus> {
        self.record("recover", cid.to_string())?;
        self.next_status(cid)
    }
}

/// A notifier whose queue is read directly by the test.
pub fn capture() -> (Notifier, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(4096);
    (Notifier::new(tx), rx)
}

/// Everything queued so far, as text.
pub fn drain(rx: &mut mpsc::Receiver<Notification>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(n) = rx.try_recv() {
        lines.push(n.text);
    }
    lines
}
