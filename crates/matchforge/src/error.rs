//! Unified error type for the Matchforge server.

use matchforge_arena::ArenaError;
use matchforge_protocol::ProtocolError;
use matchforge_session::SessionError;
use matchforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From`
/// impls, so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum MatchforgeError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (malformed command line).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, reconnect, credential store).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// An arena-level error (pool shut down).
    #[error(transparent)]
    Arena(#[from] ArenaError),
}
