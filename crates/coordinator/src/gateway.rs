//! Shard gateway client
//!
//! One datagram out, one reply in, bounded by a timeout. The channel is
//! unreliable and unordered, so a timeout means "shard unreachable" and
//! never "shard has no data". Retry policy belongs to the caller.

use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use ledger_core::{Error, Result, Serial, ShardConfig, Transaction};
use wire::{
    decode_append_reply, decode_dump_reply, encode_shard_request, AppendReply, ShardRequest,
    MAX_DATAGRAM,
};

/// Datagram request/reply client for the shard endpoints
#[derive(Debug, Clone)]
pub struct ShardGateway {
    /// How long to wait for the single reply datagram
    timeout: Duration,
}

impl ShardGateway {
    /// Create a gateway with the given per-exchange timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Send one request datagram and collect the single reply
    ///
    /// Binds an ephemeral socket per exchange so concurrent queries never
    /// share state; connects it so only the queried shard's reply is
    /// accepted.
    pub async fn query(&self, shard: &ShardConfig, request: &ShardRequest) -> Result<Vec<u8>> {
        let payload = encode_shard_request(request)?;

        let exchange = async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(shard.addr()).await?;
            socket.send(&payload).await?;

            let mut buf = vec![0u8; MAX_DATAGRAM];
            let len = socket.recv(&mut buf).await?;
            buf.truncate(len);
            Ok::<_, std::io::Error>(buf)
        };

        match timeout(self.timeout, exchange).await {
            Ok(Ok(reply)) => {
                debug!(shard = %shard.name, len = reply.len(), "Shard reply received");
                Ok(reply)
            }
            Ok(Err(e)) => {
                debug!(shard = %shard.name, error = %e, "Shard exchange failed");
                Err(Error::ShardUnavailable {
                    shard: shard.name.clone(),
                })
            }
            Err(_) => {
                debug!(shard = %shard.name, timeout = ?self.timeout, "Shard timed out");
                Err(Error::ShardUnavailable {
                    shard: shard.name.clone(),
                })
            }
        }
    }

    /// Fetch one shard's full transaction snapshot
    pub async fn dump(&self, shard: &ShardConfig) -> Result<Vec<Transaction>> {
        let reply = self.query(shard, &ShardRequest::Dump).await?;
        decode_dump_reply(&reply)
    }

    /// Append one record on a shard, returning the serial it assigned
    pub async fn append(
        &self,
        shard: &ShardConfig,
        sender: &str,
        receiver: &str,
        amount: u64,
    ) -> Result<Serial> {
        let request = ShardRequest::Append {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
        };
        let reply = self.query(shard, &request).await?;

        match decode_append_reply(&reply)? {
            AppendReply::Ack { serial } => Ok(serial),
            AppendReply::Rejected { message } => Err(Error::ShardRejected {
                shard: shard.name.clone(),
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_shard() -> ShardConfig {
        ShardConfig {
            name: "dead".to_string(),
            host: "127.0.0.1".to_string(),
            port: portpicker::pick_unused_port().expect("no free port"),
            data_file: String::new(),
        }
    }

    #[tokio::test]
    async fn test_unresponsive_shard_is_unavailable() {
        let gateway = ShardGateway::new(Duration::from_millis(100));
        let result = gateway.dump(&dead_shard()).await;

        assert!(matches!(
            result,
            Err(Error::ShardUnavailable { shard }) if shard == "dead"
        ));
    }

    #[tokio::test]
    async fn test_silent_shard_times_out() {
        // A bound socket that never replies: the exchange must end at the
        // timeout, not hang.
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let shard = ShardConfig {
            name: "mute".to_string(),
            host: "127.0.0.1".to_string(),
            port,
            data_file: String::new(),
        };

        let gateway = ShardGateway::new(Duration::from_millis(100));
        let started = std::time::Instant::now();
        let result = gateway.query(&shard, &ShardRequest::Dump).await;

        assert!(matches!(result, Err(Error::ShardUnavailable { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(socket);
    }
}
