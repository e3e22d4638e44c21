//! Convergence tracking for submitted cluster operations.
//!
//! A tracker is a detached task owning its own state. It merges three event sources:
//!
//! - the poll interval, which fetches the global pin status and evaluates the quorum,
//! - the progress interval, which reports how far replication has come,
//! - the absolute deadline, after which the tracker gives up.
//!
//! Each session ends in exactly one [`Outcome`] and says nothing afterwards.

use crate::notify::Reporter;
use crate::report::{format_elapsed, status_lines};
use pinbot_ipfs::{ClusterApi, ContentId, GlobalStatus, PinStatus};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default pause between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default pause between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default time after which a session gives up.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(60 * 60);

/// Tracker timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub progress_interval: Duration,
    pub deadline: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// Replication thresholds, fixed when tracking starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quorum {
    pub min: usize,
    pub max: usize,
}

impl Quorum {
    /// Effective thresholds for a request against `peers` coordinators.
    ///
    /// A non-positive `max`, or an unpin, requires every coordinator. Otherwise the
    /// requested `max` stands as given, since the cluster can be larger than the
    /// configured coordinator list. A non-positive `min` means `max`, and `min` never
    /// exceeds `max`.
    pub fn resolve(min: i32, max: i32, peers: usize, target: PinStatus) -> Self {
        if max <= 0 || target == PinStatus::Unpinned {
            return Self {
                min: peers,
                max: peers,
            };
        }
        let max = max as usize;
        let min = if min <= 0 { max } else { (min as usize).min(max) };
        Self { min, max }
    }
}

/// How a tracking session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `max` peers reached the target and none reported an error.
    Success { done: usize },
    /// `max` peers reached the target but some peers reported errors.
    PartialFailure { terminal: usize, errors: usize },
    /// The deadline passed first.
    TimedOut { done: usize },
    /// A status poll failed; the session stopped without a quorum verdict.
    StatusFetchFailed,
}

/// Counts taken from one status snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    terminal: usize,
    errors: usize,
    done: usize,
}

/// Per-session state, owned by the tracking task.
#[derive(Debug)]
struct ConvergenceState {
    done: BTreeMap<String, bool>,
    min_announced: bool,
}

impl ConvergenceState {
    fn new() -> Self {
        Self {
            done: BTreeMap::new(),
            min_announced: false,
        }
    }

    fn done_count(&self) -> usize {
        self.done.values().filter(|d| **d).count()
    }

    /// Rebuild the done map from `status` and count it.
    fn observe(&mut self, status: &GlobalStatus, target: PinStatus) -> Tally {
        self.done.clear();
        let mut tally = Tally::default();
        for (peer, info) in &status.peer_map {
            let reached = info.status == target;
            let failing = info.is_failing();
            if reached {
                tally.terminal += 1;
            }
            if failing {
                tally.errors += 1;
            }
            self.done.insert(peer.clone(), reached && !failing);
        }
        tally.done = self.done_count();
        tally
    }
}

/// Watches one cluster operation until it converges, fails or times out.
pub struct ConvergenceTracker {
    cid: ContentId,
    target: PinStatus,
    quorum: Quorum,
    client: Arc<dyn ClusterApi>,
    reporter: Reporter,
    gateway: String,
    config: TrackerConfig,
}

impl ConvergenceTracker {
    pub fn new(
        cid: ContentId,
        target: PinStatus,
        quorum: Quorum,
        client: Arc<dyn ClusterApi>,
        reporter: Reporter,
    ) -> Self {
        Self {
            cid,
            target,
            quorum,
            client,
            reporter,
            gateway: String::new(),
            config: TrackerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Run on a detached task.
    pub fn spawn(self) -> JoinHandle<Outcome> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> Outcome {
        let cid = self.cid;
        let target = self.target;
        let Quorum { min, max } = self.quorum;

        self.reporter
            .say(format!(
                "{}: operation submitted. Waiting for status to reach {}",
                cid, target
            ))
            .await;
        info!(%cid, %target, min, max, "tracking cluster operation");

        let start = Instant::now();
        let deadline = tokio::time::sleep_until(start + self.config.deadline);
        tokio::pin!(deadline);

        let mut poll = interval_at(start + self.config.poll_interval, self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress = interval_at(
            start + self.config.progress_interval,
            self.config.progress_interval,
        );
        progress.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = ConvergenceState::new();

        loop {
            tokio::select! {
                biased;

                _ = &mut deadline => {
                    let done = state.done_count();
                    info!(%cid, %target, done, "gave up waiting for cluster operation");
                    self.reporter
                        .say(format!(
                            "{}: still not '{}'. I won't keep watching, but you can run !status <cid> to check manually.",
                            cid, target
                        ))
                        .await;
                    return Outcome::TimedOut { done };
                }

                _ = poll.tick() => {
                    let status = match self.client.status(&cid, false).await {
                        Ok(status) => status,
                        Err(e) => {
                            warn!(%cid, error = %e, "status poll failed, stopping tracker");
                            self.reporter
                                .say(format!(
                                    "{}: an error happened: {}. You can attempt recovery with !recover <cid>.",
                                    cid, e
                                ))
                                .await;
                            return Outcome::StatusFetchFailed;
                        }
                    };

                    let tally = state.observe(&status, target);
                    debug!(%cid, ?tally, "polled cluster status");

                    if tally.terminal >= max {
                        if tally.errors == 0 {
                            info!(%cid, %target, done = tally.done, "cluster operation converged");
                            self.reporter
                                .say(format!(
                                    "Reached {} in {} cluster peers: {}/ipfs/{} .",
                                    target, tally.done, self.gateway, cid
                                ))
                                .await;
                            return Outcome::Success { done: tally.done };
                        }

                        warn!(%cid, %target, errors = tally.errors, "cluster operation finished with errors");
                        self.reporter
                            .say(format!(
                                "{}: reached {} in {} cluster peers, but {} reported errors:",
                                cid, target, tally.terminal, tally.errors
                            ))
                            .await;
                        self.reporter.say_all(status_lines(&status)).await;
                        return Outcome::PartialFailure {
                            terminal: tally.terminal,
                            errors: tally.errors,
                        };
                    }

                    if target == PinStatus::Pinned && tally.done >= min && !state.min_announced {
                        state.min_announced = true;
                        self.reporter
                            .say(format!(
                                "{}: minimum replication reached ({} peers pinned, minimum {}). Still waiting for {}.",
                                cid, tally.done, min, max
                            ))
                            .await;
                    }
                }

                _ = progress.tick() => {
                    self.reporter
                        .say(format!(
                            "still waiting: {} elapsed, {}/{} peers {}",
                            format_elapsed(start.elapsed()),
                            state.done_count(),
                            max,
                            target
                        ))
                        .await;
                }
            }
        }
    }
}
