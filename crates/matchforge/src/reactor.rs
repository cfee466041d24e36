//! The connection reactor: one loop, all sockets.
//!
//! A single task multiplexes three event sources with `select!`:
//! accepts, re-registration commands, and read-readiness of attached
//! connections. It is the only place sockets are polled for
//! readability.
//!
//! Readiness futures never consume bytes. When one resolves, the loop
//! re-checks the connection's read-interest flag: if a matcher
//! detached it for a contest in the meantime, the future is simply
//! dropped and the buffered bytes stay in the kernel for the worker.
//! Structural changes to the readiness set happen only on this task —
//! other components request reattachment through the command channel.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use matchforge_transport::{
    Connection, ConnectionId, ReadOutcome, TcpTransport,
};
use tokio::sync::mpsc;

use crate::dispatcher::dispatch_line;
use crate::server::ServerState;

/// Requests funneled onto the reactor task.
#[derive(Debug)]
pub(crate) enum ReactorCommand {
    /// Re-register a connection for read-interest (settlement drain,
    /// after a contest releases the socket).
    Attach(Arc<Connection>),
}

type ReadinessFuture = BoxFuture<'static, ConnectionId>;

/// Runs the reactor loop. Never returns.
pub(crate) async fn run_reactor(
    transport: TcpTransport,
    state: Arc<ServerState>,
    mut commands: mpsc::UnboundedReceiver<ReactorCommand>,
) {
    // Invariant: `armed` holds exactly the connection ids with a
    // pending future in `readiness`.
    let mut armed: HashSet<ConnectionId> = HashSet::new();
    let mut readiness: FuturesUnordered<ReadinessFuture> =
        FuturesUnordered::new();

    loop {
        tokio::select! {
            accepted = transport.accept() => match accepted {
                Ok(conn) => {
                    state
                        .connections
                        .lock()
                        .await
                        .insert(conn.id(), Arc::clone(&conn));
                    arm(&mut readiness, &mut armed, conn);
                }
                Err(e) => {
                    // One failed accept never stops the listener.
                    tracing::error!(error = %e, "accept failed");
                }
            },

            Some(command) = commands.recv() => match command {
                ReactorCommand::Attach(conn) => {
                    if conn.is_closed() {
                        tracing::debug!(
                            id = %conn.id(),
                            "ignoring attach of closed connection"
                        );
                        continue;
                    }
                    state
                        .connections
                        .lock()
                        .await
                        .entry(conn.id())
                        .or_insert_with(|| Arc::clone(&conn));
                    if !armed.contains(&conn.id()) {
                        arm(&mut readiness, &mut armed, conn);
                    }
                }
            },

            Some(id) = readiness.next(), if !readiness.is_empty() => {
                armed.remove(&id);
                let conn = state.connections.lock().await.get(&id).cloned();
                let Some(conn) = conn else { continue };
                if conn.is_closed() {
                    continue; // reaper prunes the table entry
                }
                if !conn.read_interest() {
                    // Detached for a contest between readiness and now:
                    // leave the bytes for the worker.
                    continue;
                }

                match conn.try_read_message() {
                    ReadOutcome::Message(chunk) => {
                        // A client write may carry several newline-
                        // terminated commands in one chunk.
                        for line in chunk.lines() {
                            let line = line.trim();
                            if !line.is_empty() {
                                dispatch_line(&state, &conn, line).await;
                            }
                        }
                        if !conn.is_closed() && conn.read_interest() {
                            arm(&mut readiness, &mut armed, conn);
                        }
                    }
                    ReadOutcome::WouldBlock => {
                        arm(&mut readiness, &mut armed, conn);
                    }
                    ReadOutcome::Closed => {
                        // Already marked closed; stop tracking. The
                        // loop itself is never interrupted by one
                        // peer's failure.
                    }
                }
            }
        }
    }
}

/// Arms a readiness future for a connection.
fn arm(
    readiness: &mut FuturesUnordered<ReadinessFuture>,
    armed: &mut HashSet<ConnectionId>,
    conn: Arc<Connection>,
) {
    armed.insert(conn.id());
    readiness.push(Box::pin(async move {
        conn.readable().await;
        conn.id()
    }));
}
