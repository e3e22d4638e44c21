//! Chat-style command lines.

use pinbot_core::Pinbot;
use pinbot_ipfs::StatusFilter;
use tracing::debug;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `pin <hash> <label...>`
    PinCluster { path: String, label: String },
    /// `unpin <hash>`
    UnpinCluster { path: String },
    /// `legacypin <hash> <label...>`: every storage endpoint, then the cluster
    Pin { path: String, label: String },
    /// `legacyunpin <hash>`
    Unpin { path: String },
    /// `status <hash>`
    Status { path: String },
    /// `ongoing`: every pin that has not settled
    Ongoing,
    /// `recover <hash>`
    Recover { path: String },
    Botsnack,
    /// Known command, wrong arguments. Carries the reply.
    Usage(String),
}

impl Command {
    /// Parse `line`. Returns `None` for anything that is not a known command.
    pub fn parse(prefix: &str, line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix(prefix)?;
        let mut words = rest.split_whitespace();
        let name = words.next()?;
        let args: Vec<&str> = words.collect();

        let path = args.first().map(|p| p.to_string());
        let label = (args.len() > 1).then(|| args[1..].join(" "));
        let usage = |text: String| Some(Self::Usage(text));

        match name {
            "pin" | "legacypin" => match (path, label) {
                (Some(path), Some(label)) if name == "pin" => Some(Self::PinCluster { path, label }),
                (Some(path), Some(label)) => Some(Self::Pin { path, label }),
                _ => usage(format!("usage: {}{} <hash> <label>", prefix, name)),
            },
            "unpin" => match path {
                Some(path) => Some(Self::UnpinCluster { path }),
                None => usage("what do you want me to unpin from cluster?".to_string()),
            },
            "legacyunpin" => match path {
                Some(path) => Some(Self::Unpin { path }),
                None => usage("what do you want me to unpin?".to_string()),
            },
            "status" => match path {
                Some(path) => Some(Self::Status { path }),
                None => usage(format!("usage: {}status <hash>", prefix)),
            },
            "recover" => match path {
                Some(path) => Some(Self::Recover { path }),
                None => usage(format!("usage: {}recover <hash>", prefix)),
            },
            "ongoing" => Some(Self::Ongoing),
            "botsnack" => Some(Self::Botsnack),
            _ => None,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PinCluster { .. } => "pin",
            Self::UnpinCluster { .. } => "unpin",
            Self::Pin { .. } => "legacypin",
            Self::Unpin { .. } => "legacyunpin",
            Self::Status { .. } => "status",
            Self::Ongoing => "ongoing",
            Self::Recover { .. } => "recover",
            Self::Botsnack => "botsnack",
            Self::Usage(_) => "usage",
        }
    }

    /// Run against `bot`, reporting to `recipient`.
    ///
    /// Returns once the request part is done; convergence trackers keep running.
    pub async fn run(self, bot: &Pinbot, recipient: &str) {
        debug!(command = self.name(), %recipient, "running command");
        match self {
            Self::PinCluster { path, label } => {
                bot.pin_cluster(recipient, &path, &label).await;
            }
            Self::UnpinCluster { path } => {
                bot.unpin_cluster(recipient, &path).await;
            }
            Self::Pin { path, label } => {
                bot.pin(recipient, &path, &label).await;
            }
            Self::Unpin { path } => {
                bot.unpin(recipient, &path).await;
            }
            Self::Status { path } => bot.status(recipient, &path).await,
            Self::Ongoing => bot.status_all(recipient, &StatusFilter::ongoing()).await,
            Self::Recover { path } => bot.recover(recipient, &path).await,
            Self::Botsnack => bot.context().reporter(recipient).say("om nom nom").await,
            Self::Usage(text) => bot.context().reporter(recipient).say(text).await,
        }
    }
}
