//! Error types for the protocol layer.

/// Errors produced while parsing a client line.
///
/// A parse error never closes a connection by itself; the dispatcher
/// decides whether to answer with an error reply or to ignore the line
/// depending on whether a session exists.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The line contained a `:` but did not match the auth grammar.
    #[error("malformed command: {0:?}")]
    MalformedCommand(String),

    /// The mode field was not `1`, `2`, or `3`.
    #[error("unknown queue mode: {0:?}")]
    UnknownMode(String),

    /// The auth-choice field was not `1` or `2`.
    #[error("unknown auth action: {0:?}")]
    UnknownAuthAction(String),

    /// The credential section was not `<username>/<password>`.
    #[error("missing credentials")]
    MissingCredentials,
}
