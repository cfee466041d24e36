//! Player sessions and credentials for Matchforge.
//!
//! This crate handles everything about a player's server-side identity:
//!
//! 1. **Credentials** — the file-backed user repository
//!    ([`CredentialStore`]) and the PBKDF2 password hashing behind it
//!    ([`password`])
//! 2. **Session tracking** — the authoritative set of authenticated
//!    sessions ([`SessionRegistry`])
//! 3. **Reconnection** — token-based rebinding of a fresh connection to
//!    an existing session, with a configurable grace period
//!
//! # How it fits in the stack
//!
//! ```text
//! Arena layer (above)  ← queues sessions and runs contests over them
//!     ↕
//! Session layer (this crate)  ← player identity and connection binding
//!     ↕
//! Transport layer (below)  ← provides Connection, ConnectionId
//! ```

mod error;
pub mod password;
mod registry;
mod session;
mod store;

pub use error::SessionError;
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig};
pub use store::{CredentialStore, UserRecord};
