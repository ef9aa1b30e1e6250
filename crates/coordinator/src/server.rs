//! Client front doors with graceful shutdown
//!
//! One TCP acceptor per client class. Every accepted connection is handed
//! to its own task immediately, so the accept loop never waits on a
//! handler; each handler owns its connection for exactly one
//! request/response exchange and then drops it.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};

use ledger_core::{ClientClass, Result};
use wire::{decode_request, encode_response, Response, MAX_FRAME};

use crate::service::CoordinatorService;

/// One client class's listening endpoint
pub struct FrontDoor {
    class: ClientClass,
    listener: TcpListener,
}

impl FrontDoor {
    /// Bind the front door for one client class
    ///
    /// Binding is the one step allowed to kill the process; everything
    /// after accept is handled per-connection.
    pub async fn bind(class: ClientClass, addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            class = class.tag(),
            address = %listener.local_addr()?,
            "Front door listening"
        );
        Ok(Self { class, listener })
    }

    /// Address this front door is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled, one spawned handler per connection
    pub async fn run(self, service: Arc<CoordinatorService>) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(class = self.class.tag(), peer = %peer, "Connection accepted");

            let service = Arc::clone(&service);
            let class = self.class;
            tokio::spawn(async move {
                if let Err(e) = handle_connection(service, stream).await {
                    warn!(
                        class = class.tag(),
                        peer = %peer,
                        error = %e,
                        "Connection handler failed"
                    );
                }
            });
        }
    }
}

/// Serve exactly one request/response exchange
///
/// Every outcome that reaches the write produces exactly one terminating
/// response frame, including parse failures.
async fn handle_connection<S>(service: Arc<CoordinatorService>, mut stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; MAX_FRAME];
    let mut filled = 0;
    loop {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
        if buf[..filled].contains(&0) || filled == MAX_FRAME {
            break;
        }
    }

    let response = match decode_request(&buf[..filled]) {
        Ok(request) => service.handle_request(request).await,
        Err(e) => Response::fail(e.user_message()),
    };

    let frame = encode_response(&response).unwrap_or_else(|e| {
        error!(error = %e, "Response exceeded the frame budget");
        // Fallback body is short by construction
        bytes::Bytes::from(format!("0{}\0", e.user_message()))
    });

    stream.write_all(&frame).await?;
    Ok(())
}

/// Coordinator server: both front doors plus shutdown handling
pub struct CoordinatorServer {
    service: CoordinatorService,
}

impl CoordinatorServer {
    /// Create a server around the given service
    pub fn new(service: CoordinatorService) -> Self {
        Self { service }
    }

    /// Run both front doors until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let coordinator = self.service.config().coordinator.clone();
        let door_a =
            FrontDoor::bind(ClientClass::A, &coordinator.client_addr(ClientClass::A)).await?;
        let door_b =
            FrontDoor::bind(ClientClass::B, &coordinator.client_addr(ClientClass::B)).await?;

        let service = Arc::new(self.service);
        let mut handle_a = tokio::spawn(door_a.run(Arc::clone(&service)));
        let mut handle_b = tokio::spawn(door_b.run(Arc::clone(&service)));

        tokio::select! {
            result = &mut handle_a => {
                error!("Class A front door stopped");
                if let Ok(inner) = result {
                    inner?;
                }
            }
            result = &mut handle_b => {
                error!("Class B front door stopped");
                if let Ok(inner) = result {
                    inner?;
                }
            }
            _ = shutdown_signal() => {
                info!(
                    requests = service.request_count(),
                    uptime_secs = service.uptime_secs(),
                    "Coordinator shutdown complete"
                );
            }
        }

        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
