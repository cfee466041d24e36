//! Session types: a player's server-side identity.
//!
//! A session outlives any one socket. The player authenticates once,
//! receives a reconnect token, and may rebind a fresh connection to the
//! same session for as long as the session lives.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

use matchforge_transport::Connection;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected session is retained before the reaper
    /// evicts it. Default: 30 seconds.
    pub disconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_grace: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An authenticated player's session.
///
/// Created on successful login or registration, destroyed when the
/// reaper evicts it after the grace period or on explicit quit.
///
/// The connection reference is the only rebindable field. Both mutation
/// paths — `rebind` on token reconnect and `reattach` when settlement
/// returns a player to the reactor — go through the same lock, so one
/// cannot overwrite the other's update.
pub struct Session {
    name: String,
    rating: AtomicI32,
    /// Issued once at authentication; never rotated. Valid for the
    /// session's whole lifetime, across any number of reconnects.
    reconnect_token: String,
    joined_at: Instant,
    /// `None` while connected; the instant the reaper first observed
    /// the disconnect otherwise.
    disconnect_mark: Mutex<Option<Instant>>,
    connection: Mutex<Arc<Connection>>,
}

impl Session {
    pub fn new(
        name: String,
        rating: i32,
        reconnect_token: String,
        connection: Arc<Connection>,
    ) -> Self {
        Self {
            name,
            rating: AtomicI32::new(rating),
            reconnect_token,
            joined_at: Instant::now(),
            disconnect_mark: Mutex::new(None),
            connection: Mutex::new(connection),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rating(&self) -> i32 {
        self.rating.load(Ordering::Relaxed)
    }

    /// Overwrites the rating. Only a contest worker writes this, and a
    /// session is in at most one contest at a time.
    pub fn set_rating(&self, rating: i32) {
        self.rating.store(rating, Ordering::Relaxed);
    }

    pub fn reconnect_token(&self) -> &str {
        &self.reconnect_token
    }

    /// Time since this session was created. Drives ranked relaxation.
    pub fn waited(&self) -> Duration {
        self.joined_at.elapsed()
    }

    /// Returns the current connection reference.
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.connection.lock().expect("session lock poisoned"))
    }

    /// Whether the current connection is still open.
    pub fn is_connected(&self) -> bool {
        !self.connection().is_closed()
    }

    /// Replaces the connection reference (token reconnect). Returns the
    /// previous connection so the caller can retire it.
    ///
    /// The new connection inherits the old one's read-interest: a
    /// session reconnecting mid-contest stays detached, so its next
    /// input still belongs to the contest worker, not the reactor.
    pub fn rebind(&self, connection: Arc<Connection>) -> Arc<Connection> {
        let mut guard = self.connection.lock().expect("session lock poisoned");
        connection.set_read_interest(guard.read_interest());
        std::mem::replace(&mut *guard, connection)
    }

    /// Detaches the current connection from reactor read-interest and
    /// returns it. Called under group formation: the contest owns the
    /// socket exclusively from here until settlement.
    pub fn detach(&self) -> Arc<Connection> {
        let guard = self.connection.lock().expect("session lock poisoned");
        guard.set_read_interest(false);
        Arc::clone(&guard)
    }

    /// Restores reactor read-interest on the current connection and
    /// returns it for re-registration. Holding the same lock as
    /// `rebind` means a concurrent reconnect cannot be lost: whichever
    /// runs second sees the other's connection.
    pub fn reattach(&self) -> Arc<Connection> {
        let guard = self.connection.lock().expect("session lock poisoned");
        guard.set_read_interest(true);
        Arc::clone(&guard)
    }

    /// Advances this session's disconnect bookkeeping and reports
    /// whether the grace period has fully elapsed.
    ///
    /// - connected again → any stale mark is cleared (token reconnect)
    /// - first observed disconnected → mark now, grace starts
    /// - marked and `grace` exceeded → `true`: evict from the caller's
    ///   collection
    pub fn update_disconnect_mark(&self, grace: Duration) -> bool {
        let mut mark =
            self.disconnect_mark.lock().expect("session lock poisoned");
        if self.is_connected() {
            *mark = None;
            return false;
        }
        match *mark {
            None => {
                *mark = Some(Instant::now());
                false
            }
            Some(at) => at.elapsed() > grace,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("rating", &self.rating())
            .finish()
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} rating", self.name, self.rating())
    }
}
