//! A single client connection: a duplex text endpoint over TCP.
//!
//! The read direction is shared between two consumers that are never
//! active at the same time: the reactor (while `read_interest` is set)
//! and a contest worker (while it is cleared). Readiness is observed
//! with [`Connection::readable`], which never consumes bytes; the
//! actual read is a separate non-blocking step. This mirrors a
//! selector-style registration: cancelling interest leaves pending
//! bytes in the kernel buffer for the next owner.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::{ConnectionId, MAX_MESSAGE_BYTES, TransportError};

/// Result of one non-blocking read attempt.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A complete text message (trailing whitespace stripped).
    Message(String),
    /// No bytes available right now.
    WouldBlock,
    /// The connection is closed (EOF, I/O error, or invalid UTF-8).
    /// The connection has already been marked closed.
    Closed,
}

/// A single client connection.
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: OwnedReadHalf,
    writer: Mutex<OwnedWriteHalf>,
    closed: AtomicBool,
    /// While set, the reactor owns the read direction. Cleared when a
    /// contest takes exclusive ownership of the socket.
    read_interest: AtomicBool,
}

impl Connection {
    /// Wraps an accepted TCP stream. New connections start with
    /// read-interest set (the reactor polls them immediately).
    pub fn new(id: ConnectionId, peer: SocketAddr, stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            id,
            peer,
            reader,
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
            read_interest: AtomicBool::new(true),
        }
    }

    /// Returns the unique identifier for this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the peer's socket address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns `true` once the connection has been marked closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Marks the connection closed without touching the socket.
    /// The socket itself is released when the last `Arc` drops.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Whether the reactor currently owns the read direction.
    pub fn read_interest(&self) -> bool {
        self.read_interest.load(Ordering::SeqCst)
    }

    /// Hands the read direction to the reactor (`true`) or to a
    /// contest worker (`false`).
    pub fn set_read_interest(&self, interested: bool) {
        self.read_interest.store(interested, Ordering::SeqCst);
    }

    /// Waits until the socket is readable. Consumes no bytes.
    ///
    /// Errors are swallowed here: a failed readiness wait surfaces as
    /// an error on the next read attempt instead.
    pub async fn readable(&self) {
        let _ = self.reader.readable().await;
    }

    /// Attempts one non-blocking read of at most [`MAX_MESSAGE_BYTES`].
    ///
    /// EOF, I/O errors, and invalid UTF-8 all mark the connection
    /// closed and report [`ReadOutcome::Closed`]; a failing peer never
    /// propagates beyond its own connection.
    pub fn try_read_message(&self) -> ReadOutcome {
        if self.is_closed() {
            return ReadOutcome::Closed;
        }

        let mut buf = [0u8; MAX_MESSAGE_BYTES];
        match self.reader.try_read(&mut buf) {
            Ok(0) => {
                tracing::debug!(id = %self.id, peer = %self.peer, "peer closed connection");
                self.mark_closed();
                ReadOutcome::Closed
            }
            Ok(n) => match std::str::from_utf8(&buf[..n]) {
                Ok(text) => ReadOutcome::Message(text.trim_end().to_string()),
                Err(_) => {
                    tracing::warn!(id = %self.id, "undecodable message, closing");
                    self.mark_closed();
                    ReadOutcome::Closed
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                ReadOutcome::WouldBlock
            }
            Err(e) => {
                tracing::debug!(id = %self.id, error = %e, "read failed, closing");
                self.mark_closed();
                ReadOutcome::Closed
            }
        }
    }

    /// Blocks until one non-empty message arrives.
    ///
    /// This is the contest-side read: the worker owns the socket
    /// exclusively, so it may wait as long as it likes. Transient
    /// empty reads are tolerated; a closed connection is an error.
    pub async fn recv_message(&self) -> Result<String, TransportError> {
        loop {
            if self.is_closed() {
                return Err(TransportError::ConnectionClosed);
            }
            self.readable().await;
            match self.try_read_message() {
                ReadOutcome::Message(msg) if !msg.is_empty() => return Ok(msg),
                ReadOutcome::Message(_) | ReadOutcome::WouldBlock => continue,
                ReadOutcome::Closed => {
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    /// Sends a text message to the peer.
    ///
    /// Writes are serialized per connection; a failed write marks the
    /// connection closed.
    pub async fn send(&self, msg: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(msg.as_bytes()).await.map_err(|e| {
            self.mark_closed();
            TransportError::SendFailed(e)
        })
    }

    /// Closes the connection: marks it closed and shuts down the
    /// write direction so the peer sees EOF.
    pub async fn close(&self) {
        self.mark_closed();
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .field("read_interest", &self.read_interest())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TcpTransport;

    /// Accepts one connection over loopback and returns both ends.
    async fn pair() -> (std::sync::Arc<Connection>, TcpStream) {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let server = transport.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_new_connection_has_read_interest() {
        let (conn, _client) = pair().await;
        assert!(conn.read_interest());
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn test_recv_message_returns_trimmed_line() {
        let (conn, mut client) = pair().await;
        client.write_all(b"hello world\n").await.unwrap();

        let msg = conn.recv_message().await.unwrap();
        assert_eq!(msg, "hello world");
    }

    #[tokio::test]
    async fn test_send_reaches_peer() {
        use tokio::io::AsyncReadExt;

        let (conn, mut client) = pair().await;
        conn.send("Invalid token").await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"Invalid token");
    }

    #[tokio::test]
    async fn test_try_read_message_would_block_when_idle() {
        let (conn, _client) = pair().await;
        assert!(matches!(conn.try_read_message(), ReadOutcome::WouldBlock));
    }

    #[tokio::test]
    async fn test_try_read_message_peer_eof_marks_closed() {
        let (conn, client) = pair().await;
        drop(client);

        // Wait for the FIN to arrive, then read.
        conn.readable().await;
        assert!(matches!(conn.try_read_message(), ReadOutcome::Closed));
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_send_after_mark_closed_fails() {
        let (conn, _client) = pair().await;
        conn.mark_closed();

        let result = conn.send("late").await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_close_sends_eof_to_peer() {
        use tokio::io::AsyncReadExt;

        let (conn, mut client) = pair().await;
        conn.close().await;

        let mut buf = [0u8; 8];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(n, 0, "peer should see EOF");
    }

    #[tokio::test]
    async fn test_set_read_interest_round_trip() {
        let (conn, _client) = pair().await;
        conn.set_read_interest(false);
        assert!(!conn.read_interest());
        conn.set_read_interest(true);
        assert!(conn.read_interest());
    }

    #[tokio::test]
    async fn test_recv_message_skips_blank_lines() {
        let (conn, mut client) = pair().await;
        client.write_all(b"\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        client.write_all(b"real input\n").await.unwrap();

        let msg = conn.recv_message().await.unwrap();
        assert_eq!(msg, "real input");
    }
}
