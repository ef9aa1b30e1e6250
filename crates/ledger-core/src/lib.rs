//! Ledger Core - Foundation for the sharded ledger network
//!
//! Provides domain types, error handling, and cluster configuration
//! shared by the coordinator, the shard servers, and the clients.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ClusterConfig, CoordinatorConfig, ShardConfig};
pub use error::{Error, Result};
pub use types::*;
