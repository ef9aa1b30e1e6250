//! Coordinator binary entry point
//!
//! Starts both client front doors and routes requests to the configured
//! ledger shards.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coordinator::{CoordinatorServer, CoordinatorService};
use ledger_core::ClusterConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coordinator=info,ledger_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Optional configuration file path, else the fixed default deployment
    let config = match std::env::args().nth(1) {
        Some(path) => ClusterConfig::from_file(path)?,
        None => ClusterConfig::default(),
    };

    tracing::info!(
        class_a = config.coordinator.client_a_port,
        class_b = config.coordinator.client_b_port,
        shards = config.shards.len(),
        "Coordinator starting"
    );

    let service = CoordinatorService::new(config);
    CoordinatorServer::new(service).run().await?;

    Ok(())
}
