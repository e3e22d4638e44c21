//! Pinbot node.
//!
//! Wires everything together:
//! - Host lists into storage endpoints and cluster coordinators
//! - The notification queue, delivering through a [`BroadcastSink`]
//! - The admin socket as the operator front-end (pinbot-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::hosts::{self, Hosts};
use crate::sink::{BroadcastSink, DEFAULT_BROADCAST_CAPACITY};
use pinbot_core::notify::DEFAULT_CAPACITY;
use pinbot_core::{Context, NotificationQueue, PeerSelector, PinLog, Pinbot};
use std::sync::Arc;

/// A pinbot node instance.
pub struct PinbotNode {
    config: NodeConfig,
    bot: Pinbot,
    sink: BroadcastSink,
    queue: NotificationQueue,
}

impl PinbotNode {
    /// Create a node from configuration, loading host lists from disk.
    pub fn new(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let hosts = hosts::load(&config)?;
        Self::with_hosts(config, hosts)
    }

    /// Create a node with an explicit set of hosts.
    pub fn with_hosts(config: NodeConfig, hosts: Hosts) -> Result<Self> {
        let pin_log = PinLog::new(&config.pin_log);
        pin_log.ensure_exists()?;

        let sink = BroadcastSink::new(DEFAULT_BROADCAST_CAPACITY);
        let (notifier, queue) = NotificationQueue::new(DEFAULT_CAPACITY, Arc::new(sink.clone()));

        let ctx = Context::new(
            hosts.endpoints,
            PeerSelector::new(config.strategy, hosts.peers),
            pin_log,
            notifier,
            config.settings(),
        );

        Ok(Self {
            bot: Pinbot::new(Arc::new(ctx)),
            config,
            sink,
            queue,
        })
    }

    /// The replication service, for embedding.
    pub fn bot(&self) -> &Pinbot {
        &self.bot
    }

    /// Run the node (delivery loop and admin socket).
    pub async fn run(self) -> Result<()> {
        let Self {
            config,
            bot,
            sink,
            queue,
        } = self;

        let ctx = bot.context();
        tracing::info!("Pinbot node starting");
        tracing::info!("  Endpoints: {}", ctx.endpoints().len());
        tracing::info!("  Cluster peers: {} ({:?})", ctx.selector().peer_count(), config.strategy);
        tracing::info!("  Gateway: {}", config.gateway);
        tracing::info!("  Pin log: {:?}", config.pin_log);
        tracing::info!("  Admin: {:?}", config.admin_socket);

        tokio::spawn(async move {
            let stats = queue.run().await;
            tracing::info!(?stats, "Notification delivery stopped");
        });

        let admin_socket = AdminSocket::new(
            bot,
            config.command_prefix,
            sink.sender(),
            &config.admin_socket,
        );
        admin_socket.run().await
    }
}
