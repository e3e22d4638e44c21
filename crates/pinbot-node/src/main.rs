//! Pinbot Node binary
//!
//! Replicates IPFS content on operator command.

use pinbot_node::{NodeConfig, PinbotNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinbot_node=info,pinbot_core=info,pinbot_ipfs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pinbot Node");

    let config = NodeConfig::from_env()?;

    let node = PinbotNode::new(config)?;
    node.run().await?;

    Ok(())
}
