//! Literal server reply strings.
//!
//! Clients match on these strings, so they are part of the wire
//! contract and must not drift.

/// Acknowledges a successful token reconnect.
pub const RECONNECTED: &str = "Reconnected, back in queue.";

/// An unrecognized token (or malformed line from an unauthenticated
/// connection).
pub const INVALID_TOKEN: &str = "Invalid token";

/// Login rejected: unknown name, bad password, or a live session
/// already exists under that name.
pub const LOGIN_FAILED: &str = "Failed to login, re-input your credentials.";

/// Registration rejected: the name is already taken (or the row could
/// not be persisted).
pub const REGISTER_FAILED: &str =
    "Failed to register, re-input your credentials.";

/// A requeue digit arrived on a connection with no session.
pub const NOT_AUTHENTICATED: &str = "Not authenticated, log in first.";

/// Builds the contest greeting broadcast to every rostered player.
pub fn found_game<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut msg = String::from("Found game with players: \n");
    for name in names {
        msg.push_str(name);
        msg.push('\n');
    }
    msg
}

/// Builds the winner announcement broadcast after a contest settles.
pub fn winner_announcement(name: &str) -> String {
    format!("Winner was: {name}!")
}
