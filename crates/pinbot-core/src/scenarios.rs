//! End-to-end runs of the service against in-memory endpoints and coordinators.

use crate::context::{Context, Settings};
use crate::mock::{capture, drain, MockCluster, MockStorage};
use crate::notify::Notification;
use crate::pinlog::PinLog;
use crate::selector::{ClusterPeer, Endpoint, PeerSelector, Strategy};
use crate::service::Pinbot;
use crate::tracker::Outcome;
use pinbot_ipfs::{ClusterApi, ContentId, GlobalStatus, PeerStatus, PinStatus, StatusCode, StorageApi};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

const V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const V1: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";

struct Deployment {
    bot: Pinbot,
    rx: mpsc::Receiver<Notification>,
    storages: Vec<Arc<MockStorage>>,
    dir: TempDir,
}

/// `storages.len()` endpoints and three coordinators sharing one scripted cluster.
fn deploy(storages: Vec<MockStorage>, cluster: Arc<MockCluster>, settings: Settings) -> Deployment {
    let dir = tempfile::tempdir().unwrap();
    let pin_log = PinLog::new(dir.path().join("pins.log"));
    pin_log.ensure_exists().unwrap();

    let storages: Vec<_> = storages.into_iter().map(Arc::new).collect();
    let endpoints = storages
        .iter()
        .enumerate()
        .map(|(i, s)| Endpoint::new(format!("http://ipfs-{}:9095", i), s.clone() as Arc<dyn StorageApi>))
        .collect();
    let peers = (0..3)
        .map(|i| ClusterPeer::new(format!("http://ipfs-{}:9094", i), cluster.clone() as Arc<dyn ClusterApi>))
        .collect();

    let (notifier, rx) = capture();
    let ctx = Context::new(
        endpoints,
        PeerSelector::new(Strategy::Random, peers),
        pin_log,
        notifier,
        settings,
    );
    Deployment {
        bot: Pinbot::new(Arc::new(ctx)),
        rx,
        storages,
        dir,
    }
}

fn snapshot(cid: &str, peers: &[PinStatus]) -> GlobalStatus {
    peers
        .iter()
        .enumerate()
        .fold(GlobalStatus::new(ContentId::decode(cid).unwrap()), |st, (i, status)| {
            let id = format!("p{}", i + 1);
            st.with_peer(id.clone(), PeerStatus::new(id, *status))
        })
}

#[tokio::test(start_paused = true)]
async fn partial_fanout_is_logged_once() {
    use PinStatus::*;
    let cluster = Arc::new(MockCluster::new().then_status(snapshot(V0, &[Pinned, Pinned, Pinned])));
    let mut d = deploy(
        vec![
            MockStorage::new(),
            MockStorage::new()
                .failing_with_status(StatusCode::GATEWAY_TIMEOUT, "<h1>504 Gateway Time-out</h1>")
                .only_on("pin"),
            MockStorage::new(),
        ],
        cluster,
        Settings::default(),
    );

    let submission = d.bot.pin("#ops", V0, "release notes").await.unwrap();
    submission.tracker.await.unwrap();

    let lines = drain(&mut d.rx);
    assert_eq!(lines[0], "now pinning on 3 nodes");
    assert_eq!(lines[1], "http://ipfs-1:9095 -- pin failed: 504 Gateway Time-out");
    assert_eq!(
        lines[2],
        format!("pinned on 2 of 3 nodes (1 failures) -- https://ipfs.io/ipfs/{}", V0)
    );

    let log = std::fs::read_to_string(d.dir.path().join("pins.log")).unwrap();
    assert_eq!(log, format!("/ipfs/{}\trelease notes\n", V0));
}

#[tokio::test(start_paused = true)]
async fn direct_address_is_never_resolved_remotely() {
    use PinStatus::*;
    let cluster = Arc::new(MockCluster::new().then_status(snapshot(V1, &[Pinned, Pinned, Pinned])));
    let mut d = deploy(
        vec![MockStorage::new(), MockStorage::new(), MockStorage::new()],
        cluster.clone(),
        Settings::default(),
    );

    let path = format!("/ipfs/{}", V1);
    let submission = d.bot.pin_cluster("#ops", &path, "").await.unwrap();

    assert_eq!(submission.cid, ContentId::decode(V1).unwrap());
    assert_eq!(submission.tracker.await.unwrap(), Outcome::Success { done: 3 });
    assert!(d.storages.iter().all(|s| s.resolve_calls() == 0));
    assert!(drain(&mut d.rx).contains(&format!("{} resolved as {}", path, V1)));
}

#[tokio::test(start_paused = true)]
async fn ipns_path_resolves_exactly_once() {
    use PinStatus::*;
    let cluster = Arc::new(MockCluster::new().then_status(snapshot(V0, &[Pinned, Pinned, Pinned])));
    let storages = (0..3).map(|_| MockStorage::new().resolving_to(V0)).collect();
    let d = deploy(storages, cluster.clone(), Settings::default());

    let submission = d
        .bot
        .pin_cluster("#ops", "/ipns/myname/sub/file", "")
        .await
        .unwrap();

    assert_eq!(submission.cid.to_string(), V0);
    assert_ne!(submission.cid.to_string(), "/ipns/myname/sub/file");
    let resolutions: usize = d.storages.iter().map(|s| s.resolve_calls()).sum();
    assert_eq!(resolutions, 1);
    assert!(cluster.calls()[0].starts_with(&format!("pin {}", V0)));
    submission.tracker.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn replication_between_min_and_max() {
    use PinStatus::*;
    let cluster = Arc::new(
        MockCluster::new()
            .then_status(snapshot(V0, &[Pinned, Pinned, Pinning]))
            .then_status(snapshot(V0, &[Pinned, Pinned, Pinned])),
    );
    let settings = Settings {
        replication_min: 2,
        replication_max: 3,
        ..Settings::default()
    };
    let mut d = deploy(vec![MockStorage::new()], cluster.clone(), settings);

    let submission = d.bot.pin_cluster("#ops", V0, "docs").await.unwrap();
    assert_eq!(submission.tracker.await.unwrap(), Outcome::Success { done: 3 });

    assert_eq!(cluster.calls(), vec![format!("pin {} min=2 max=3 name=docs", V0)]);
    let lines = drain(&mut d.rx);
    let notices = lines.iter().filter(|l| l.contains("minimum replication reached")).count();
    assert_eq!(notices, 1);
    assert_eq!(
        lines.last().unwrap(),
        &format!("Reached pinned in 3 cluster peers: https://ipfs.io/ipfs/{} .", V0)
    );
}

#[tokio::test(start_paused = true)]
async fn stalled_replication_times_out_once() {
    use PinStatus::*;
    let cluster = Arc::new(MockCluster::new().then_status(snapshot(V0, &[Pinning, Queued, Pinning])));
    let mut d = deploy(vec![MockStorage::new()], cluster, Settings::default());

    let submission = d.bot.pin_cluster("#ops", V0, "").await.unwrap();
    assert_eq!(submission.tracker.await.unwrap(), Outcome::TimedOut { done: 0 });

    let lines = drain(&mut d.rx);
    let timeouts = lines.iter().filter(|l| l.contains("I won't keep watching")).count();
    assert_eq!(timeouts, 1);
    assert!(lines.last().unwrap().contains("I won't keep watching"));

    tokio::time::advance(std::time::Duration::from_secs(7200)).await;
    assert!(drain(&mut d.rx).is_empty());
}
