use anyhow::Result;
use std::time::Duration;

use coordinator::{CoordinatorServer, CoordinatorService, ShardGateway};
use ledger_core::{ClientClass, ClusterConfig, CoordinatorConfig, ShardConfig, ESCROW_ACCOUNT};
use ledger_shard::{Ledger, ShardService};
use tokio::net::UdpSocket;
use tokio::time::sleep;
use wallet_client::WalletClient;
use wire::{Command, Response};

// Spawn one shard service over a ledger file written into `dir`
async fn start_shard(dir: &tempfile::TempDir, name: &str, records: &str) -> Result<ShardConfig> {
    let path = dir.path().join(format!("block_{}.txt", name));
    std::fs::write(&path, records)?;

    let ledger = Ledger::load(&path)?;
    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let port = socket.local_addr()?.port();
    tokio::spawn(ShardService::new(name, ledger).run(socket));

    Ok(ShardConfig {
        name: name.to_string(),
        host: "127.0.0.1".to_string(),
        port,
        data_file: path.display().to_string(),
    })
}

// Start the coordinator's front doors on free ports over the given shards
async fn start_coordinator(shards: Vec<ShardConfig>) -> Result<ClusterConfig> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = ClusterConfig {
        coordinator: CoordinatorConfig {
            host: "127.0.0.1".to_string(),
            client_a_port: portpicker::pick_unused_port().expect("no ports free"),
            client_b_port: portpicker::pick_unused_port().expect("no ports free"),
            shard_timeout: Duration::from_millis(300),
        },
        shards,
    };

    let service = CoordinatorService::new(config.clone());
    tokio::spawn(CoordinatorServer::new(service).run());

    // Give it a moment to start
    sleep(Duration::from_millis(100)).await;

    Ok(config)
}

async fn send(config: &ClusterConfig, class: ClientClass, command: Command) -> Result<Response> {
    let addr = config.coordinator.client_addr(class);
    let response = WalletClient::connect(class, &addr)
        .await?
        .request(command)
        .await?;
    Ok(response)
}

async fn balance(config: &ClusterConfig, class: ClientClass, account: &str) -> Result<Response> {
    send(
        config,
        class,
        Command::CheckWallet {
            username: account.to_string(),
        },
    )
    .await
}

#[tokio::test]
async fn test_balance_enquiry_walkthrough() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let shard = start_shard(&dir, "A", "1 alice bob 50\n2 bob alice 20\n").await?;
    let config = start_coordinator(vec![shard]).await?;

    // bob holds 50 - 20 = 30
    let response = balance(&config, ClientClass::B, "bob").await?;
    assert!(response.success);
    assert_eq!(response.message, "30");

    // Both client classes speak the same protocol on their own ports
    let response = balance(&config, ClientClass::A, "bob").await?;
    assert!(response.success);
    assert_eq!(response.message, "30");

    // Unknown accounts are a failure, never a zero balance
    let response = balance(&config, ClientClass::B, "carol").await?;
    assert!(!response.success);
    assert_eq!(response.message, "carol is not part of the network.");

    Ok(())
}

#[tokio::test]
async fn test_overdraft_is_rejected_without_mutation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let shard = start_shard(&dir, "A", "1 alice bob 50\n2 bob alice 20\n").await?;
    let config = start_coordinator(vec![shard.clone()]).await?;

    // alice's aggregated balance is -30
    let response = send(
        &config,
        ClientClass::B,
        Command::TxCoins {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: 1000,
        },
    )
    .await?;
    assert!(!response.success);

    // No record was appended anywhere
    let gateway = ShardGateway::new(Duration::from_millis(300));
    assert_eq!(gateway.dump(&shard).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_cross_shard_transfer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let shard_a = start_shard(&dir, "A", "1 mint alice 100\n").await?;
    let shard_b = start_shard(&dir, "B", "1 mint bob 10\n").await?;
    let config = start_coordinator(vec![shard_a, shard_b]).await?;

    let response = send(
        &config,
        ClientClass::B,
        Command::TxCoins {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: 30,
        },
    )
    .await?;
    assert!(response.success, "{}", response.message);

    assert_eq!(balance(&config, ClientClass::B, "alice").await?.message, "70");
    assert_eq!(balance(&config, ClientClass::B, "bob").await?.message, "40");

    // Both commit legs landed, so the escrow account nets to zero
    assert_eq!(
        balance(&config, ClientClass::B, ESCROW_ACCOUNT).await?.message,
        "0"
    );

    Ok(())
}

#[tokio::test]
async fn test_txlist_aggregates_records() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let shard_a = start_shard(&dir, "A", "1 alice bob 50\n2 bob alice 20\n").await?;
    let shard_b = start_shard(&dir, "B", "1 bob carol 10\n").await?;
    let config = start_coordinator(vec![shard_a, shard_b]).await?;

    let response = send(
        &config,
        ClientClass::A,
        Command::TxList {
            username: "bob".to_string(),
        },
    )
    .await?;
    assert!(response.success);
    assert_eq!(
        response.message,
        "1 alice bob 50; 2 bob alice 20; 1 bob carol 10"
    );

    Ok(())
}

#[tokio::test]
async fn test_concurrent_clients_are_served_independently() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let shard = start_shard(&dir, "A", "1 alice bob 50\n").await?;
    let config = start_coordinator(vec![shard]).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            balance(&config, ClientClass::B, "bob").await
        }));
    }

    for handle in handles {
        let response = handle.await??;
        assert!(response.success);
        assert_eq!(response.message, "50");
    }

    Ok(())
}
