//! Concurrent pin/unpin against every storage endpoint.
//!
//! One task per endpoint. Each task probes the DAG with a recursive refs listing and
//! then pins or unpins. A failing endpoint is reported by URL and never stops the others;
//! the caller waits for all of them before getting the aggregate.

use crate::notify::Reporter;
use crate::report::format_error;
use crate::selector::Endpoint;
use pinbot_ipfs::StorageApi;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Direct endpoint operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pin,
    Unpin,
}

impl Operation {
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Unpin => "unpin",
        }
    }

    pub const fn in_progress(&self) -> &'static str {
        match self {
            Self::Pin => "pinning",
            Self::Unpin => "unpinning",
        }
    }

    pub const fn done(&self) -> &'static str {
        match self {
            Self::Pin => "pinned",
            Self::Unpin => "unpinned",
        }
    }
}

/// One endpoint's failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.endpoint, self.error)
    }
}

/// Aggregate result of a fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub succeeded: usize,
    pub failed: Vec<EndpointFailure>,
}

impl FanoutReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    /// `"pinned on 2 of 3 nodes (1 failures) -- https://ipfs.io/ipfs/Qm..."`
    pub fn summary(&self, op: Operation, gateway: &str, path: &str) -> String {
        format!(
            "{} on {} of {} nodes ({} failures) -- {}{}",
            op.done(),
            self.succeeded,
            self.total(),
            self.failed.len(),
            gateway,
            path
        )
    }
}

async fn run_on_endpoint(op: Operation, path: &str, client: &dyn StorageApi) -> Result<(), String> {
    client
        .refs(path)
        .await
        .map_err(|e| format_error("refs", &e))?;

    match op {
        Operation::Pin => client.pin(path).await,
        Operation::Unpin => client.unpin(path).await,
    }
    .map_err(|e| format_error(op.verb(), &e))
}

/// Run `op` on `path` against every endpoint and wait for all of them.
///
/// Announces the start, each failure as it arrives, and the aggregate. `path` must
/// already be normalized.
pub async fn dispatch(
    op: Operation,
    path: &str,
    endpoints: &[Endpoint],
    gateway: &str,
    reporter: &Reporter,
) -> FanoutReport {
    reporter
        .say(format!("now {} on {} nodes", op.in_progress(), endpoints.len()))
        .await;

    // Sized to the endpoint count so no task ever blocks reporting its failure.
    let (tx, mut rx) = mpsc::channel::<EndpointFailure>(endpoints.len().max(1));
    let mut tasks = Vec::with_capacity(endpoints.len());

    for endpoint in endpoints {
        let tx = tx.clone();
        let url = endpoint.url.clone();
        let client = endpoint.client.clone();
        let path = path.to_string();
        let handle = tokio::spawn(async move {
            if let Err(error) = run_on_endpoint(op, &path, client.as_ref()).await {
                debug!(endpoint = %url, %error, "endpoint {} failed", op.verb());
                let _ = tx.send(EndpointFailure { endpoint: url, error }).await;
            }
        });
        tasks.push((endpoint.url.clone(), handle));
    }
    drop(tx);

    let mut report = FanoutReport::default();
    while let Some(failure) = rx.recv().await {
        reporter.say(failure.to_string()).await;
        report.failed.push(failure);
    }

    // The channel closes once every task has finished; a task that died without
    // reporting still counts as a failure.
    for (url, handle) in tasks {
        if let Err(e) = handle.await {
            let failure = EndpointFailure {
                endpoint: url,
                error: format!("{} task aborted: {}", op.verb(), e),
            };
            reporter.say(failure.to_string()).await;
            report.failed.push(failure);
        }
    }
    report.succeeded = endpoints.len() - report.failed.len();

    info!(
        op = op.verb(),
        %path,
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "fan-out complete"
    );
    reporter.say(report.summary(op, gateway, path)).await;
    report
}
