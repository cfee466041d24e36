//! Transport layer for Matchforge.
//!
//! Provides [`TcpTransport`] (the listening side) and [`Connection`]
//! (a single client's duplex text endpoint). The wire format is plain
//! UTF-8 text, at most [`MAX_MESSAGE_BYTES`] per message.
//!
//! Ownership rules for a connection's read direction are deliberately
//! narrow: the reactor consumes bytes only while the connection's
//! read-interest flag is set, and a contest worker consumes bytes only
//! while it is cleared. [`Connection::readable`] waits for readiness
//! without consuming anything, so flipping the flag hands the buffered
//! bytes over intact.

mod connection;
mod error;

pub use connection::{Connection, ReadOutcome};
pub use error::TransportError;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::TcpListener;

/// Maximum size of a single wire message, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 1024;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A TCP listener that accepts [`Connection`]s.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Binds a new transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self { listener })
    }

    /// Returns the local address the transport is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for and accepts the next incoming connection.
    pub async fn accept(&self) -> Result<Arc<Connection>, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "accepted connection");

        Ok(Arc::new(Connection::new(id, peer, stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new(1), "alice");
        map.insert(ConnectionId::new(2), "bob");
        assert_eq!(map[&ConnectionId::new(1)], "alice");
    }

    #[tokio::test]
    async fn test_accept_assigns_unique_ids() {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let c1 = tokio::net::TcpStream::connect(addr).await.unwrap();
        let a = transport.accept().await.unwrap();
        let c2 = tokio::net::TcpStream::connect(addr).await.unwrap();
        let b = transport.accept().await.unwrap();

        assert_ne!(a.id(), b.id());
        drop((c1, c2));
    }
}
