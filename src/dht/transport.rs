use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::error::DhtError;

/// Datagram buffer size. Larger inbound datagrams are truncated.
pub const MAX_DATAGRAM: usize = 1024;

/// Receive timeout for outbound queries.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Thin UDP adapter: bind, send a datagram, receive a datagram with an
/// optional deadline. The protocol engine never touches sockets directly.
pub struct Transport {
    socket: UdpSocket,
}

impl Transport {
    /// Binds the dispatcher socket on all interfaces.
    pub async fn bind(port: u16) -> Result<Self, DhtError> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self { socket })
    }

    /// Binds an ephemeral socket for a single paired query/reply exchange.
    pub async fn ephemeral() -> Result<Self, DhtError> {
        Self::bind(0).await
    }

    pub fn local_port(&self) -> Result<u16, DhtError> {
        Ok(self.socket.local_addr()?.port())
    }

    pub async fn send(&self, data: &[u8], addr: SocketAddr) -> Result<(), DhtError> {
        self.socket.send_to(data, addr).await?;
        Ok(())
    }

    /// Receives the next datagram, blocking indefinitely.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), DhtError> {
        Ok(self.socket.recv_from(buf).await?)
    }

    /// Receives the next datagram, or fails with [`DhtError::Timeout`] once
    /// `wait` has elapsed.
    pub async fn recv_timeout(
        &self,
        buf: &mut [u8],
        wait: Duration,
    ) -> Result<(usize, SocketAddr), DhtError> {
        match timeout(wait, self.socket.recv_from(buf)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DhtError::Timeout),
        }
    }

    /// Sends a query datagram and waits up to [`QUERY_TIMEOUT`] for the
    /// paired reply.
    pub async fn exchange(&self, data: &[u8], addr: SocketAddr) -> Result<Vec<u8>, DhtError> {
        self.send(data, addr).await?;

        let mut buf = [0u8; MAX_DATAGRAM];
        let (n, _) = self.recv_timeout(&mut buf, QUERY_TIMEOUT).await?;
        Ok(buf[..n].to_vec())
    }
}
