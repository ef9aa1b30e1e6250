//! Coordinator server for the sharded ledger network
//!
//! This crate provides the routing/coordination layer that sits between
//! the clients and the ledger shards:
//! - **Front doors**: one TCP acceptor per client class, a spawned handler
//!   task per connection
//! - **Shard gateway**: one-shot datagram request/reply with timeout
//! - **Aggregation**: balances and listings computed across shard dumps
//! - **Transfer commit**: single-shard and two-step cross-shard appends
//!
//! # Example
//!
//! ```ignore
//! use coordinator::{CoordinatorServer, CoordinatorService};
//! use ledger_core::ClusterConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = CoordinatorService::new(ClusterConfig::default());
//!     CoordinatorServer::new(service).run().await?;
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod gateway;
pub mod server;
pub mod service;

// Re-export main types
pub use gateway::ShardGateway;
pub use server::CoordinatorServer;
pub use service::CoordinatorService;
