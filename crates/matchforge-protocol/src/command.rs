//! Client command grammar.

use crate::ProtocolError;

/// Which queue an authenticating or requeuing client is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    /// Unranked, strict-FIFO matching.
    Simple,
    /// Rating-proximity matching with time-based relaxation.
    Ranked,
}

/// The credential action inside an auth command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
}

/// A bare-digit choice from an already-authenticated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueChoice {
    /// `1` — join the simple queue.
    Simple,
    /// `2` — join the ranked queue.
    Ranked,
    /// `3` — close the connection.
    Quit,
}

/// A parsed client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `<mode>:<choice>:<username>/<password>` with mode 1 or 2.
    Auth {
        mode: QueueMode,
        action: AuthAction,
        username: String,
        password: String,
    },
    /// Mode `3` in the auth position: quit before authenticating.
    /// The rest of the line is not examined.
    Quit,
    /// A bare requeue digit.
    Choice(RequeueChoice),
    /// Anything else: a reconnect-token candidate. The dispatcher
    /// resolves it against the session registry.
    Bare(String),
}

/// Parses one client line into a [`ClientCommand`].
///
/// Lines without a `:` can never fail to parse — they are either a
/// recognized choice digit or a token candidate. Lines with a `:` must
/// match the auth grammar exactly.
pub fn parse_line(line: &str) -> Result<ClientCommand, ProtocolError> {
    let line = line.trim();

    if let Some((mode, rest)) = line.split_once(':') {
        // Quit is honored before the credential section is examined.
        if mode == "3" {
            return Ok(ClientCommand::Quit);
        }
        let mode = match mode {
            "1" => QueueMode::Simple,
            "2" => QueueMode::Ranked,
            other => return Err(ProtocolError::UnknownMode(other.to_string())),
        };

        let (action, credentials) = rest
            .split_once(':')
            .ok_or_else(|| ProtocolError::MalformedCommand(line.to_string()))?;
        let action = match action {
            "1" => AuthAction::Login,
            "2" => AuthAction::Register,
            other => {
                return Err(ProtocolError::UnknownAuthAction(other.to_string()));
            }
        };

        let (username, password) = credentials
            .split_once('/')
            .ok_or(ProtocolError::MissingCredentials)?;
        if username.is_empty() || password.is_empty() {
            return Err(ProtocolError::MissingCredentials);
        }

        return Ok(ClientCommand::Auth {
            mode,
            action,
            username: username.to_string(),
            password: password.to_string(),
        });
    }

    match line {
        "1" => Ok(ClientCommand::Choice(RequeueChoice::Simple)),
        "2" => Ok(ClientCommand::Choice(RequeueChoice::Ranked)),
        "3" => Ok(ClientCommand::Choice(RequeueChoice::Quit)),
        other => Ok(ClientCommand::Bare(other.to_string())),
    }
}
