//! Cluster configuration types
//!
//! Defaults reproduce the fixed deployment the network was first built
//! around: loopback only, well-known ports per client class and per shard.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{ClientClass, Error, Result};

/// Full cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Coordinator settings
    pub coordinator: CoordinatorConfig,

    /// Shard endpoints, in home-shard precedence order
    pub shards: Vec<ShardConfig>,
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Address the front doors bind to
    pub host: String,

    /// TCP port for class-A clients
    pub client_a_port: u16,

    /// TCP port for class-B clients
    pub client_b_port: u16,

    /// Per-shard datagram exchange timeout
    #[serde(with = "duration_ms")]
    pub shard_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            client_a_port: 25493,
            client_b_port: 26493,
            shard_timeout: Duration::from_millis(500),
        }
    }
}

impl CoordinatorConfig {
    /// Listening address for the given client class
    pub fn client_addr(&self, class: ClientClass) -> String {
        let port = match class {
            ClientClass::A => self.client_a_port,
            ClientClass::B => self.client_b_port,
        };
        format!("{}:{}", self.host, port)
    }
}

/// One shard endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardConfig {
    /// Shard name used in logs and error messages
    pub name: String,

    /// Shard host
    pub host: String,

    /// Shard UDP port
    pub port: u16,

    /// Flat transaction source file loaded at shard startup
    pub data_file: String,
}

impl ShardConfig {
    /// Datagram address of this shard
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        let shard = |name: &str, port: u16, data_file: &str| ShardConfig {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port,
            data_file: data_file.to_string(),
        };

        Self {
            coordinator: CoordinatorConfig::default(),
            shards: vec![
                shard("A", 21493, "block1.txt"),
                shard("B", 22493, "block2.txt"),
                shard("C", 23493, "block3.txt"),
            ],
        }
    }
}

impl ClusterConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the routing layer cannot serve
    pub fn validate(&self) -> Result<()> {
        if self.shards.is_empty() {
            return Err(Error::InvalidConfig {
                message: "at least one shard endpoint is required".to_string(),
            });
        }

        for (i, shard) in self.shards.iter().enumerate() {
            if self.shards[..i].iter().any(|s| s.name == shard.name) {
                return Err(Error::InvalidConfig {
                    message: format!("duplicate shard name: {}", shard.name),
                });
            }
        }

        if self.coordinator.client_a_port == self.coordinator.client_b_port {
            return Err(Error::InvalidConfig {
                message: "client classes must listen on distinct ports".to_string(),
            });
        }

        Ok(())
    }

    /// Find a shard endpoint by name
    pub fn shard(&self, name: &str) -> Option<&ShardConfig> {
        self.shards.iter().find(|s| s.name == name)
    }
}

/// Duration serialization helper, millisecond granularity
mod duration_ms {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
