//! Error types for the session layer.

/// Errors that can occur during session management or credential
/// storage.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A live session already exists under this name. A player can
    /// only be logged in once.
    #[error("a live session already exists for {0:?}")]
    DuplicateSession(String),

    /// The freshly generated reconnect token collided with a live one.
    /// Session creation is denied; the client may retry.
    #[error("reconnect token collision")]
    TokenCollision,

    /// The presented reconnect token matches no live session.
    #[error("unknown reconnect token")]
    UnknownToken,

    /// Reading or writing the credential file failed.
    #[error("credential store I/O failed: {0}")]
    Store(#[source] std::io::Error),
}
