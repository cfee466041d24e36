//! # Matchforge
//!
//! A real-time matchmaking server: clients authenticate over a
//! line-oriented TCP protocol, queue for two-player contests under an
//! unranked-FIFO or ranked skill-proximity policy, get grouped and run
//! by a fixed worker pool, and are reattached afterward with ranked
//! rating changes persisted.
//!
//! Five concurrent loops share the server's state:
//!
//! - the **reactor** (connection accept + readiness multiplexing),
//! - two **matchers** (one per queue),
//! - the **contest pool** workers,
//! - the **reaper** (disconnect grace sweeps),
//! - the **settlement drain** (reattach + rating persistence).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use matchforge::prelude::*;
//!
//! # async fn run() -> Result<(), MatchforgeError> {
//! let server = Server::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatcher;
mod error;
mod reactor;
mod reaper;
mod server;
mod settlement;

pub use config::ServerConfig;
pub use error::MatchforgeError;
pub use server::{Server, ServerBuilder};

/// Commonly used items for server binaries and tests.
pub mod prelude {
    pub use crate::{MatchforgeError, Server, ServerBuilder, ServerConfig};
    pub use matchforge_arena::{
        ContestConfig, MatchConfig, OutcomeResolver, RandomOutcome,
    };
    pub use matchforge_session::SessionConfig;
}
