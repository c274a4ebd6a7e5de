//! UDP front end
//!
//! Owns the listening socket. Each received datagram is handed to the
//! dispatcher on its own task together with the source address; the same
//! socket is what registrations store as their reply handle.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::handler::Proxy;

/// Largest datagram accepted in one receive (the classic SIP-over-UDP
/// server packet cap).
const MAX_DATAGRAM: usize = 8192;

pub struct ProxyServer {
    socket: Arc<UdpSocket>,
}

impl ProxyServer {
    /// Bind the listener. This is the only fatal failure the proxy has.
    pub async fn bind(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("failed to bind SIP listener on {}", addr))?;
        Ok(Self { socket: Arc::new(socket) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().context("failed to get listener address")
    }

    /// Receive loop. Runs until the token is cancelled; per-datagram
    /// failures never stop it.
    pub async fn run(self, proxy: Arc<Proxy>, cancel: CancellationToken) {
        let mut buf = [0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("SIP listener stopping");
                    break;
                }
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, client)) => {
                        let payload = buf[..len].to_vec();
                        let proxy = Arc::clone(&proxy);
                        let socket = Arc::clone(&self.socket);
                        tokio::spawn(async move {
                            proxy.handle_datagram(&payload, client, &socket).await;
                        });
                    }
                    Err(e) => warn!("receive error on SIP listener: {}", e),
                }
            }
        }
    }
}
