//! Shard binary entry point
//!
//! Usage: `shard <NAME> [config.json]`. Loads the shard's flat transaction
//! source and serves dump/append datagrams on its configured port.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_core::ClusterConfig;
use ledger_shard::{Ledger, ShardService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_shard=info,ledger_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let name = args.next().ok_or("usage: shard <NAME> [config.json]")?;

    let config = match args.next() {
        Some(path) => ClusterConfig::from_file(path)?,
        None => ClusterConfig::default(),
    };

    let shard_config = config
        .shard(&name)
        .ok_or_else(|| format!("no shard named {:?} in configuration", name))?
        .clone();

    // A malformed source record aborts startup; serving a partial ledger
    // would silently corrupt every balance it contributes to.
    let ledger = Ledger::load(&shard_config.data_file).map_err(|e| {
        tracing::error!(error = %e, file = %shard_config.data_file, "Ledger load failed");
        e
    })?;

    tracing::info!(
        shard = %shard_config.name,
        port = shard_config.port,
        records = ledger.len(),
        "Shard server starting"
    );

    let service = ShardService::new(shard_config.name.clone(), ledger);

    let addr = shard_config.addr();
    tokio::select! {
        result = service.serve(&addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(shard = %shard_config.name, "Shutting down");
        }
    }

    Ok(())
}
