//! Wire protocol for Matchforge.
//!
//! The protocol is newline-delimited UTF-8 text. A client line is one of:
//!
//! ```text
//! <token>                              reconnect with a previously issued token
//! <mode>:<choice>:<username>/<password>  authenticate (mode 1=simple, 2=ranked, 3=quit;
//!                                        choice 1=login, 2=register)
//! 1 | 2 | 3                            requeue choice for an authenticated session
//! ```
//!
//! Server replies are literal strings defined in [`reply`].
//!
//! Parsing is context-free here; the dispatcher decides what a
//! [`ClientCommand::Bare`] line means (a token candidate) based on
//! whether the connection already holds a session.

mod command;
mod error;
pub mod reply;

pub use command::{
    AuthAction, ClientCommand, QueueMode, RequeueChoice, parse_line,
};
pub use error::ProtocolError;
