//! Pinbot Node - operator-driven IPFS replication daemon
//!
//! Runs the replication engine from `pinbot-core` against the IPFS daemons and IPFS
//! Cluster peers listed in its host files.
//!
//! # Architecture
//!
//! - **Config**: `PINBOT_*` environment variables
//! - **Hosts**: cluster peer and storage host lists
//! - **Command**: chat-style command lines (`!pin <hash> <label>`)
//! - **Sink**: delivers notifications to the log and to connected operators
//! - **Admin Socket**: Unix socket front-end (pinbot-admin CLI)
//!
//! # Example
//!
//! ```no_run
//! use pinbot_node::{NodeConfig, PinbotNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = PinbotNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod command;
pub mod config;
pub mod error;
pub mod hosts;
pub mod node;
pub mod sink;

pub use admin_socket::{AdminCommand, AdminResponse, AdminSocket};
pub use command::Command;
pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::PinbotNode;
pub use sink::BroadcastSink;
