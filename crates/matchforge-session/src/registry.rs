//! The session registry: the authoritative set of authenticated sessions.
//!
//! Owns three lookups that are always kept in sync:
//! - `name → session` (primary)
//! - `token → name` (reconnect resolution)
//! - `connection id → name` (dispatching requeue choices)
//!
//! The connection/session relationship is deliberately stored as
//! one-directional indexes here rather than as mutual references on the
//! objects themselves.
//!
//! # Concurrency note
//!
//! All operations take the registry's own mutex for the duration of the
//! map mutation only, never across socket I/O. The per-session
//! connection lock (see [`Session`]) covers the rebind/reattach race
//! independently of this lock.

use std::collections::HashMap;
use std::sync::Arc;

use matchforge_transport::{Connection, ConnectionId};
use rand::Rng;
use tokio::sync::Mutex;

use crate::{Session, SessionConfig, SessionError};

struct Inner {
    by_name: HashMap<String, Arc<Session>>,
    token_index: HashMap<String, String>,
    conn_index: HashMap<ConnectionId, String>,
}

/// Tracks every live session and its reconnect token.
pub struct SessionRegistry {
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl SessionRegistry {
    /// Creates a new, empty registry with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                by_name: HashMap::new(),
                token_index: HashMap::new(),
                conn_index: HashMap::new(),
            }),
        }
    }

    /// Creates a session for a freshly authenticated player.
    ///
    /// Allocates the reconnect token the client must persist. A token
    /// colliding with a live session's token denies the creation
    /// outright rather than silently reissuing.
    ///
    /// # Errors
    /// - [`SessionError::DuplicateSession`] — a live session already
    ///   exists under this name
    /// - [`SessionError::TokenCollision`] — the generated token is
    ///   already in use
    pub async fn create(
        &self,
        name: &str,
        rating: i32,
        connection: Arc<Connection>,
    ) -> Result<Arc<Session>, SessionError> {
        let mut inner = self.inner.lock().await;

        if inner.by_name.contains_key(name) {
            return Err(SessionError::DuplicateSession(name.to_string()));
        }

        let token = generate_token();
        if inner.token_index.contains_key(&token) {
            return Err(SessionError::TokenCollision);
        }

        let conn_id = connection.id();
        let session = Arc::new(Session::new(
            name.to_string(),
            rating,
            token.clone(),
            connection,
        ));

        inner.token_index.insert(token, name.to_string());
        inner.conn_index.insert(conn_id, name.to_string());
        inner.by_name.insert(name.to_string(), Arc::clone(&session));

        tracing::info!(name, rating, "session created");
        Ok(session)
    }

    /// Rebinds an existing session to a new connection via its token.
    ///
    /// The token is not consumed (it stays valid for further
    /// reconnects) and the session keeps its queue position. The
    /// replaced connection is marked closed so the reaper prunes it.
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownToken`] if no live session owns
    /// the token.
    pub async fn reconnect(
        &self,
        token: &str,
        connection: Arc<Connection>,
    ) -> Result<Arc<Session>, SessionError> {
        let mut inner = self.inner.lock().await;

        let name = inner
            .token_index
            .get(token)
            .cloned()
            .ok_or(SessionError::UnknownToken)?;
        let session = inner
            .by_name
            .get(&name)
            .cloned()
            .ok_or(SessionError::UnknownToken)?;

        let new_id = connection.id();
        let old = session.rebind(connection);
        if old.id() != new_id {
            old.mark_closed();
        }
        inner.conn_index.remove(&old.id());
        inner.conn_index.insert(new_id, name.clone());

        tracing::info!(%name, %new_id, "session reconnected");
        Ok(session)
    }

    /// Looks up the session currently bound to a connection.
    pub async fn session_for_connection(
        &self,
        id: ConnectionId,
    ) -> Option<Arc<Session>> {
        let inner = self.inner.lock().await;
        let name = inner.conn_index.get(&id)?;
        inner.by_name.get(name).cloned()
    }

    /// Whether a live session exists under this name.
    pub async fn contains(&self, name: &str) -> bool {
        self.inner.lock().await.by_name.contains_key(name)
    }

    /// Removes a session (explicit quit). Clears all three indexes.
    pub async fn remove(&self, name: &str) -> Option<Arc<Session>> {
        let mut inner = self.inner.lock().await;
        let session = inner.by_name.remove(name)?;
        inner.token_index.remove(session.reconnect_token());
        let conn_id = session.connection().id();
        inner.conn_index.remove(&conn_id);
        tracing::info!(name, "session removed");
        Some(session)
    }

    /// One reaper pass: marks fresh disconnects, evicts sessions whose
    /// grace period elapsed, clears marks on reconnected sessions.
    ///
    /// Returns the evicted sessions.
    pub async fn sweep(&self) -> Vec<Arc<Session>> {
        let grace = self.config.disconnect_grace;
        let mut inner = self.inner.lock().await;

        let expired: Vec<String> = inner
            .by_name
            .values()
            .filter(|s| s.update_disconnect_mark(grace))
            .map(|s| s.name().to_string())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for name in expired {
            if let Some(session) = inner.by_name.remove(&name) {
                inner.token_index.remove(session.reconnect_token());
                let conn_id = session.connection().id();
                inner.conn_index.remove(&conn_id);
                tracing::info!(
                    name = session.name(),
                    "session evicted (grace period elapsed)"
                );
                evicted.push(session);
            }
        }
        evicted
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.by_name.len()
    }

    /// Returns `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.by_name.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Guessing a valid token is computationally infeasible, so a token is
/// as good as the password that produced the session.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
