//! UDP serve loop for one shard
//!
//! Dumps read the shared ledger under a read guard; appends are funneled
//! through a single writer task over an mpsc channel, so concurrent
//! handler invocations can never interleave or lose a write.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use ledger_core::{Error, Result, Serial};
use wire::{
    decode_shard_request, encode_append_reply, encode_dump_reply, AppendReply, ShardRequest,
    MAX_DATAGRAM,
};

use crate::Ledger;

/// One queued append, acknowledged once the record is in the ledger
struct AppendRequest {
    sender: String,
    receiver: String,
    amount: u64,
    ack: oneshot::Sender<Serial>,
}

/// Shard ledger service
///
/// Cheap to clone; all clones answer from the same ledger and feed the
/// same writer task.
#[derive(Clone)]
pub struct ShardService {
    name: String,
    ledger: Arc<RwLock<Ledger>>,
    append_tx: mpsc::Sender<AppendRequest>,
}

impl ShardService {
    /// Create the service and spawn its writer task
    pub fn new(name: impl Into<String>, ledger: Ledger) -> Self {
        let name = name.into();
        let ledger = Arc::new(RwLock::new(ledger));
        let (append_tx, append_rx) = mpsc::channel::<AppendRequest>(64);

        tokio::spawn(Self::writer_loop(
            name.clone(),
            Arc::clone(&ledger),
            append_rx,
        ));

        Self {
            name,
            ledger,
            append_tx,
        }
    }

    /// Sole owner of the ledger's write path
    async fn writer_loop(
        name: String,
        ledger: Arc<RwLock<Ledger>>,
        mut rx: mpsc::Receiver<AppendRequest>,
    ) {
        info!(shard = %name, "Append writer started");

        while let Some(request) = rx.recv().await {
            let serial = ledger
                .write()
                .append(request.sender, request.receiver, request.amount);

            info!(shard = %name, serial, "Record appended");
            let _ = request.ack.send(serial);
        }

        info!(shard = %name, "Append writer stopped");
    }

    /// Queue one append and wait for the assigned serial
    async fn append(&self, sender: String, receiver: String, amount: u64) -> Result<Serial> {
        let (ack, ack_rx) = oneshot::channel();
        self.append_tx
            .send(AppendRequest {
                sender,
                receiver,
                amount,
                ack,
            })
            .await
            .map_err(|_| Error::ChannelClosed {
                channel: "shard append".to_string(),
            })?;

        ack_rx.await.map_err(|_| Error::ChannelClosed {
            channel: "shard append ack".to_string(),
        })
    }

    /// Produce the reply datagram for one inbound request
    ///
    /// Malformed or unanswerable requests get an `ERR` reply; the service
    /// never dies on bad input.
    pub async fn handle_datagram(&self, bytes: &[u8]) -> bytes::Bytes {
        let reply = match decode_shard_request(bytes) {
            Ok(ShardRequest::Dump) => {
                let snapshot = self.ledger.read().snapshot();
                debug!(shard = %self.name, records = snapshot.len(), "Serving dump");
                encode_dump_reply(&snapshot)
            }
            Ok(ShardRequest::Append {
                sender,
                receiver,
                amount,
            }) => self
                .append(sender, receiver, amount)
                .await
                .map(|serial| encode_append_reply(&AppendReply::Ack { serial })),
            Err(e) => {
                warn!(shard = %self.name, error = %e, "Rejecting shard request");
                Ok(encode_append_reply(&AppendReply::Rejected {
                    message: e.user_message(),
                }))
            }
        };

        reply.unwrap_or_else(|e| {
            error!(shard = %self.name, error = %e, "Failed to build reply");
            encode_append_reply(&AppendReply::Rejected {
                message: e.user_message(),
            })
        })
    }

    /// Serve requests on the given socket until the task is cancelled
    pub async fn run(self, socket: UdpSocket) -> Result<()> {
        let local = socket.local_addr()?;
        info!(shard = %self.name, address = %local, "Shard listening");

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let (len, peer) = socket.recv_from(&mut buf).await?;
            debug!(shard = %self.name, peer = %peer, len, "Request received");

            let reply = self.handle_datagram(&buf[..len]).await;
            if let Err(e) = socket.send_to(&reply, peer).await {
                // Datagram channel is best-effort; the peer times out and retries
                warn!(shard = %self.name, peer = %peer, error = %e, "Reply send failed");
            }
        }
    }

    /// Bind the shard's endpoint and serve
    pub async fn serve(self, addr: &str) -> Result<()> {
        let socket = UdpSocket::bind(addr).await?;
        self.run(socket).await
    }
}
