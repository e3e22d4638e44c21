//! Operations exposed to the request layer.
//!
//! Every operation reports to one recipient through the notification queue and never
//! returns an error: failures are part of the conversation with the operator. Cluster
//! submissions hand back the spawned tracker so callers (and tests) can await the
//! outcome if they care.

use crate::context::Context;
use crate::fanout::{self, FanoutReport, Operation};
use crate::notify::Reporter;
use crate::report::status_lines;
use crate::resolver::{normalize_path, resolve};
use crate::tracker::{ConvergenceTracker, Outcome, Quorum};
use pinbot_ipfs::{ContentId, PinOptions, PinStatus, StatusFilter};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A cluster operation that was accepted and is being tracked.
#[derive(Debug)]
pub struct Submission {
    pub cid: ContentId,
    pub tracker: JoinHandle<Outcome>,
}

/// The replication service.
#[derive(Debug, Clone)]
pub struct Pinbot {
    ctx: Arc<Context>,
}

impl Pinbot {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Pin on every storage endpoint, log it, then pin in the cluster.
    pub async fn pin(&self, recipient: &str, path: &str, label: &str) -> Option<Submission> {
        let reporter = self.ctx.reporter(recipient);
        let report = self.fan_out(Operation::Pin, path, &reporter).await;

        if report.succeeded > 0 {
            self.record_pin(&normalize_path(path), label, &reporter).await;
        }
        if self.ctx.selector().is_empty() {
            return None;
        }
        self.cluster_op(Operation::Pin, path, label, &reporter).await
    }

    /// Unpin on every storage endpoint, then unpin in the cluster.
    pub async fn unpin(&self, recipient: &str, path: &str) -> Option<Submission> {
        let reporter = self.ctx.reporter(recipient);
        self.fan_out(Operation::Unpin, path, &reporter).await;

        if self.ctx.selector().is_empty() {
            return None;
        }
        self.cluster_op(Operation::Unpin, path, "", &reporter).await
    }

    /// Pin through one cluster coordinator and track replication.
    pub async fn pin_cluster(&self, recipient: &str, path: &str, label: &str) -> Option<Submission> {
        let reporter = self.ctx.reporter(recipient);
        let submission = self.cluster_op(Operation::Pin, path, label, &reporter).await?;
        self.record_pin(&normalize_path(path), label, &reporter).await;
        Some(submission)
    }

    /// Unpin through one cluster coordinator and track it.
    pub async fn unpin_cluster(&self, recipient: &str, path: &str) -> Option<Submission> {
        let reporter = self.ctx.reporter(recipient);
        self.cluster_op(Operation::Unpin, path, "", &reporter).await
    }

    /// Print the global status of one pin.
    pub async fn status(&self, recipient: &str, path: &str) {
        let reporter = self.ctx.reporter(recipient);
        let peer = match self.ctx.selector().select() {
            Ok(peer) => peer,
            Err(e) => {
                reporter.say(format!("cannot query status: {}", e)).await;
                return;
            }
        };

        let cid = match self.resolve_with(peer.index, path).await {
            Ok(cid) => cid,
            Err(e) => {
                reporter.say(format!("could not resolve cid: {}", e)).await;
                return;
            }
        };

        match peer.client.status(&cid, false).await {
            Ok(status) => reporter.say_all(status_lines(&status)).await,
            Err(e) => {
                reporter
                    .say(format!("{}: error obtaining pin status: {}", peer.addr, e))
                    .await;
            }
        }
    }

    /// Print the status of every pin matching `filter`, pausing between pins.
    pub async fn status_all(&self, recipient: &str, filter: &StatusFilter) {
        let reporter = self.ctx.reporter(recipient);
        let peer = match self.ctx.selector().select() {
            Ok(peer) => peer,
            Err(e) => {
                reporter.say(format!("cannot query status: {}", e)).await;
                return;
            }
        };

        let statuses = match peer.client.status_all(filter, false).await {
            Ok(statuses) => statuses,
            Err(e) => {
                reporter
                    .say(format!("{}: error obtaining pin statuses: {}", peer.addr, e))
                    .await;
                return;
            }
        };

        if statuses.is_empty() {
            reporter.say(format!("No pins in state {}.", filter)).await;
            return;
        }

        let pause = self.ctx.settings().status_all_pause;
        for (i, status) in statuses.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(pause).await;
            }
            reporter.say_all(status_lines(status)).await;
        }
    }

    /// Ask the cluster to retry failed operations on one pin. Not tracked.
    pub async fn recover(&self, recipient: &str, path: &str) {
        let reporter = self.ctx.reporter(recipient);
        let peer = match self.ctx.selector().select() {
            Ok(peer) => peer,
            Err(e) => {
                reporter.say(format!("cannot recover: {}", e)).await;
                return;
            }
        };
        reporter.say(format!("Recovering pin via {}", peer.addr)).await;

        let cid = match self.resolve_with(peer.index, path).await {
            Ok(cid) => cid,
            Err(e) => {
                reporter
                    .say(format!("could not determine cid to recover: {}", e))
                    .await;
                return;
            }
        };
        if cid.to_string() != path {
            reporter.say(format!("{} resolved as {}", path, cid)).await;
        }

        match peer.client.recover(&cid, false).await {
            Ok(status) => {
                info!(%cid, peer = %peer.addr, "recover triggered");
                reporter
                    .say(format!(
                        "Recover operation triggered for {}. You can later manually track the status with !status <cid>",
                        cid
                    ))
                    .await;
                reporter.say_all(status_lines(&status)).await;
            }
            Err(e) => {
                reporter
                    .say(format!("{}: failed to recover: {}", peer.addr, e))
                    .await;
            }
        }
    }

    async fn fan_out(&self, op: Operation, path: &str, reporter: &Reporter) -> FanoutReport {
        let path = normalize_path(path);
        let settings = self.ctx.settings();
        fanout::dispatch(op, &path, self.ctx.endpoints(), &settings.gateway, reporter).await
    }

    async fn record_pin(&self, path: &str, label: &str, reporter: &Reporter) {
        if let Err(e) = self.ctx.pin_log().append(path, label).await {
            warn!(%path, error = %e, "failed to append to pin log");
            reporter
                .say(format!("failed to write log entry for last pin: {}", e))
                .await;
        }
    }

    async fn resolve_with(&self, index: usize, path: &str) -> crate::Result<ContentId> {
        let endpoint = self.ctx.paired_endpoint(index)?;
        resolve(path, endpoint.client.as_ref()).await
    }

    async fn cluster_op(
        &self,
        op: Operation,
        path: &str,
        label: &str,
        reporter: &Reporter,
    ) -> Option<Submission> {
        let verb = op.verb();
        let peer = match self.ctx.selector().select() {
            Ok(peer) => peer,
            Err(e) => {
                reporter
                    .say(format!("cannot {} in cluster: {}", verb, e))
                    .await;
                return None;
            }
        };
        reporter
            .say(format!("Cluster-{}ning via {}", verb, peer.addr))
            .await;

        let cid = match self.resolve_with(peer.index, path).await {
            Ok(cid) => cid,
            Err(e) => {
                reporter
                    .say(format!("could not determine cid to {}: {}", verb, e))
                    .await;
                return None;
            }
        };
        if cid.to_string() != path {
            reporter.say(format!("{} resolved as {}", path, cid)).await;
        }

        let settings = self.ctx.settings();
        let (submitted, target) = match op {
            Operation::Pin => {
                let opts = PinOptions {
                    replication_min: settings.replication_min,
                    replication_max: settings.replication_max,
                    name: label.to_string(),
                };
                (peer.client.pin(&cid, &opts).await, PinStatus::Pinned)
            }
            Operation::Unpin => (peer.client.unpin(&cid).await, PinStatus::Unpinned),
        };
        if let Err(e) = submitted {
            warn!(%cid, peer = %peer.addr, error = %e, "cluster {} failed", verb);
            reporter
                .say(format!("{}: failed to {} in cluster: {}", peer.addr, verb, e))
                .await;
            return None;
        }
        info!(%cid, peer = %peer.addr, "cluster {} submitted", verb);

        let quorum = Quorum::resolve(
            settings.replication_min,
            settings.replication_max,
            self.ctx.selector().peer_count(),
            target,
        );
        let tracker = ConvergenceTracker::new(cid, target, quorum, peer.client, reporter.clone())
            .with_gateway(settings.gateway.clone())
            .with_config(settings.tracker)
            .spawn();

        Some(Submission { cid, tracker })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Settings;
    use crate::mock::{capture, drain, MockCluster, MockStorage};
    use crate::notify::Notification;
    use crate::pinlog::PinLog;
    use crate::selector::{ClusterPeer, Endpoint, PeerSelector, Strategy};
    use pinbot_ipfs::{ClusterApi, GlobalStatus, PeerStatus, StorageApi};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
    const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

    struct Harness {
        bot: Pinbot,
        rx: mpsc::Receiver<Notification>,
        storage: Arc<MockStorage>,
        cluster: Arc<MockCluster>,
        dir: TempDir,
    }

    impl Harness {
        fn log_contents(&self) -> String {
            std::fs::read_to_string(self.dir.path().join("pins.log")).unwrap()
        }
    }

    fn harness(storage: MockStorage, cluster: MockCluster, settings: Settings) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let pin_log = PinLog::new(dir.path().join("pins.log"));
        pin_log.ensure_exists().unwrap();

        let storage = Arc::new(storage);
        let cluster = Arc::new(cluster);
        let (notifier, rx) = capture();
        let ctx = Context::new(
            vec![Endpoint::new("http://node-0:9095", storage.clone() as Arc<dyn StorageApi>)],
            PeerSelector::new(
                Strategy::Random,
                vec![ClusterPeer::new("http://node-0:9094", cluster.clone() as Arc<dyn ClusterApi>)],
            ),
            pin_log,
            notifier,
            settings,
        );
        Harness {
            bot: Pinbot::new(Arc::new(ctx)),
            rx,
            storage,
            cluster,
            dir,
        }
    }

    fn pinned(cid: &str) -> GlobalStatus {
        GlobalStatus::new(ContentId::decode(cid).unwrap())
            .with_peer("p0", PeerStatus::new("alpha", PinStatus::Pinned))
    }

    #[tokio::test(start_paused = true)]
    async fn cluster_pin_submits_tracks_and_logs() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().then_status(pinned(V0)),
            Settings::default(),
        );

        let submission = h.bot.pin_cluster("#ops", V0, "my label").await.unwrap();
        assert_eq!(submission.cid.to_string(), V0);
        assert_eq!(submission.tracker.await.unwrap(), Outcome::Success { done: 1 });

        assert_eq!(
            h.cluster.calls(),
            vec![format!("pin {} min=0 max=0 name=my label", V0)]
        );
        assert_eq!(h.storage.resolve_calls(), 0);
        assert_eq!(h.log_contents(), format!("/ipfs/{}\tmy label\n", V0));
        assert_eq!(
            drain(&mut h.rx),
            vec![
                "Cluster-pinning via http://node-0:9094".to_string(),
                format!("{}: operation submitted. Waiting for status to reach pinned", V0),
                format!("Reached pinned in 1 cluster peers: https://ipfs.io/ipfs/{} .", V0),
            ]
        );
    }

    #[tokio::test]
    async fn rejected_cluster_pin_is_not_logged() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().failing("pin", "peer unreachable"),
            Settings::default(),
        );

        assert!(h.bot.pin_cluster("#ops", V0, "label").await.is_none());
        assert_eq!(h.log_contents(), "");
        assert_eq!(
            drain(&mut h.rx)[1],
            "http://node-0:9094: failed to pin in cluster: 500 Internal Server Error: peer unreachable"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn replication_beyond_configured_coordinators_is_awaited() {
        let partial = GlobalStatus::new(ContentId::decode(V0).unwrap())
            .with_peer("p1", PeerStatus::new("alpha", PinStatus::Pinned))
            .with_peer("p2", PeerStatus::new("beta", PinStatus::Pinning))
            .with_peer("p3", PeerStatus::new("gamma", PinStatus::Pinning));
        let complete = GlobalStatus::new(ContentId::decode(V0).unwrap())
            .with_peer("p1", PeerStatus::new("alpha", PinStatus::Pinned))
            .with_peer("p2", PeerStatus::new("beta", PinStatus::Pinned))
            .with_peer("p3", PeerStatus::new("gamma", PinStatus::Pinned));
        let settings = Settings {
            replication_min: 2,
            replication_max: 3,
            ..Settings::default()
        };
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().then_status(partial).then_status(complete),
            settings,
        );

        let submission = h.bot.pin_cluster("#ops", V0, "").await.unwrap();
        assert_eq!(submission.tracker.await.unwrap(), Outcome::Success { done: 3 });
        assert_eq!(h.cluster.status_calls(), 2);
        assert_eq!(
            drain(&mut h.rx).last().unwrap(),
            &format!("Reached pinned in 3 cluster peers: https://ipfs.io/ipfs/{} .", V0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ipns_path_is_resolved_through_the_paired_endpoint() {
        let mut h = harness(
            MockStorage::new().resolving_to(V1),
            MockCluster::new().then_status(
                GlobalStatus::new(ContentId::decode(V1).unwrap())
                    .with_peer("p0", PeerStatus::new("alpha", PinStatus::Unpinned)),
            ),
            Settings::default(),
        );

        let submission = h.bot.unpin_cluster("#ops", "/ipns/docs.example").await.unwrap();
        assert_eq!(submission.cid.to_string(), V1);
        submission.tracker.await.unwrap();

        assert_eq!(h.storage.resolve_calls(), 1);
        assert_eq!(h.cluster.calls(), vec![format!("unpin {}", V1)]);
        assert_eq!(
            drain(&mut h.rx)[..2],
            [
                "Cluster-unpinning via http://node-0:9094".to_string(),
                format!("/ipns/docs.example resolved as {}", V1),
            ]
        );
    }

    #[tokio::test]
    async fn unresolvable_path_stops_the_request() {
        let mut h = harness(
            MockStorage::new().failing_with("could not resolve name"),
            MockCluster::new(),
            Settings::default(),
        );

        assert!(h.bot.pin_cluster("#ops", "/ipns/nowhere", "x").await.is_none());
        assert!(h.cluster.calls().is_empty());
        let lines = drain(&mut h.rx);
        assert!(lines[1].starts_with("could not determine cid to pin: could not resolve /ipns/nowhere"));
    }

    #[tokio::test(start_paused = true)]
    async fn legacy_unpin_fans_out_then_unpins_in_cluster() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().then_status(
                GlobalStatus::new(ContentId::decode(V0).unwrap())
                    .with_peer("p0", PeerStatus::new("alpha", PinStatus::Unpinned)),
            ),
            Settings::default(),
        );

        let submission = h.bot.unpin("#ops", V0).await.unwrap();
        submission.tracker.await.unwrap();

        assert_eq!(
            h.storage.calls(),
            vec![format!("refs /ipfs/{}", V0), format!("unpin /ipfs/{}", V0)]
        );
        assert_eq!(h.cluster.calls(), vec![format!("unpin {}", V0)]);
        assert_eq!(h.log_contents(), "");
        let lines = drain(&mut h.rx);
        assert_eq!(lines[0], "now unpinning on 1 nodes");
        assert_eq!(
            lines[1],
            format!("unpinned on 1 of 1 nodes (0 failures) -- https://ipfs.io/ipfs/{}", V0)
        );
    }

    #[tokio::test]
    async fn status_prints_the_table() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().then_status(pinned(V0)),
            Settings::default(),
        );

        h.bot.status("#ops", V0).await;
        assert_eq!(
            drain(&mut h.rx),
            vec![format!("Status for {}:", V0), "  - alpha : pinned | ".to_string()]
        );
    }

    #[tokio::test]
    async fn status_of_malformed_cid() {
        let mut h = harness(MockStorage::new(), MockCluster::new(), Settings::default());
        h.bot.status("#ops", "not-a-cid").await;
        let lines = drain(&mut h.rx);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("could not resolve cid: malformed content identifier"));
        assert_eq!(h.cluster.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn status_all_pauses_between_pins() {
        let settings = Settings {
            status_all_pause: Duration::from_secs(5),
            ..Settings::default()
        };
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().listing(vec![pinned(V0), pinned(V1)]),
            settings,
        );

        let started = tokio::time::Instant::now();
        h.bot.status_all("#ops", &StatusFilter::ongoing()).await;

        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert_eq!(
            h.cluster.calls(),
            vec!["status_all queued,pinning,unpinning,error".to_string()]
        );
        let lines = drain(&mut h.rx);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], format!("Status for {}:", V1));
    }

    #[tokio::test]
    async fn status_all_failure_and_empty_listing() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().failing("status_all", "timeout"),
            Settings::default(),
        );
        h.bot.status_all("#ops", &StatusFilter::default()).await;
        assert_eq!(
            drain(&mut h.rx),
            vec!["http://node-0:9094: error obtaining pin statuses: 500 Internal Server Error: timeout".to_string()]
        );

        let mut h = harness(MockStorage::new(), MockCluster::new(), Settings::default());
        h.bot.status_all("#ops", &StatusFilter::default()).await;
        assert_eq!(drain(&mut h.rx), vec!["No pins in state all.".to_string()]);
    }

    #[tokio::test]
    async fn recover_prints_snapshot_without_tracking() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().then_status(pinned(V0)),
            Settings::default(),
        );

        h.bot.recover("#ops", &format!("/ipfs/{}", V0)).await;

        assert_eq!(h.cluster.calls(), vec![format!("recover {}", V0)]);
        assert_eq!(h.cluster.status_calls(), 1);
        assert_eq!(
            drain(&mut h.rx),
            vec![
                "Recovering pin via http://node-0:9094".to_string(),
                format!("/ipfs/{} resolved as {}", V0, V0),
                format!(
                    "Recover operation triggered for {}. You can later manually track the status with !status <cid>",
                    V0
                ),
                format!("Status for {}:", V0),
                "  - alpha : pinned | ".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn recover_failure() {
        let mut h = harness(
            MockStorage::new(),
            MockCluster::new().failing("recover", "not found in pinset"),
            Settings::default(),
        );
        h.bot.recover("#ops", V0).await;
        assert_eq!(
            drain(&mut h.rx)[1],
            "http://node-0:9094: failed to recover: 500 Internal Server Error: not found in pinset"
        );
    }

    #[tokio::test]
    async fn operations_without_cluster_peers() {
        let dir = tempfile::tempdir().unwrap();
        let pin_log = PinLog::new(dir.path().join("pins.log"));
        pin_log.ensure_exists().unwrap();
        let storage = Arc::new(MockStorage::new());
        let (notifier, mut rx) = capture();
        let bot = Pinbot::new(Arc::new(Context::new(
            vec![Endpoint::new("http://localhost:5001", storage as Arc<dyn StorageApi>)],
            PeerSelector::new(Strategy::Failover { retries: 3 }, Vec::new()),
            pin_log,
            notifier,
            Settings::default(),
        )));

        assert!(bot.pin("#ops", V0, "solo").await.is_none());
        assert_eq!(drain(&mut rx).len(), 2);

        assert!(bot.pin_cluster("#ops", V0, "solo").await.is_none());
        bot.status("#ops", V0).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                "cannot pin in cluster: no cluster peers configured".to_string(),
                "cannot query status: no cluster peers configured".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failover_messages_name_the_pool() {
        let dir = tempfile::tempdir().unwrap();
        let pin_log = PinLog::new(dir.path().join("pins.log"));
        pin_log.ensure_exists().unwrap();
        let down = Arc::new(MockCluster::new().failing("pin", "connection refused"));
        let also_down = Arc::new(MockCluster::new().failing("pin", "connection refused"));
        let (notifier, mut rx) = capture();
        let bot = Pinbot::new(Arc::new(Context::new(
            vec![Endpoint::new("http://node-0:9095", Arc::new(MockStorage::new()) as Arc<dyn StorageApi>)],
            PeerSelector::new(
                Strategy::Failover { retries: 2 },
                vec![
                    ClusterPeer::new("http://node-0:9094", down as Arc<dyn ClusterApi>),
                    ClusterPeer::new("http://node-1:9094", also_down as Arc<dyn ClusterApi>),
                ],
            ),
            pin_log,
            notifier,
            Settings::default(),
        )));

        assert!(bot.pin_cluster("#ops", V0, "").await.is_none());
        assert_eq!(
            drain(&mut rx),
            vec![
                "Cluster-pinning via cluster pool (starting at http://node-0:9094)".to_string(),
                "cluster pool (starting at http://node-0:9094): failed to pin in cluster: 500 Internal Server Error: connection refused".to_string(),
            ]
        );
    }
}
