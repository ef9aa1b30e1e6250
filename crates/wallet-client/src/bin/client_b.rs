//! Class-B wallet client binary

use ledger_core::{ClientClass, ClusterConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_client=warn".into()),
        )
        .init();

    let config = ClusterConfig::default();
    let addr = config.coordinator.client_addr(ClientClass::B);
    wallet_client::run_cli(ClientClass::B, &addr).await?;
    Ok(())
}
