//! Matchmaking and contest execution for Matchforge.
//!
//! Two halves:
//!
//! - **Queues & matchers** — [`MatchQueue`] holds sessions in arrival
//!   order; [`run_simple_matcher`] groups strictly FIFO,
//!   [`run_ranked_matcher`] groups by rating proximity with a
//!   quadratically widening window (see [`relaxation_window`]).
//! - **Execution** — [`ContestPool`] is a fixed set of workers draining
//!   one shared FIFO of [`Contest`]s; the in-contest "game" is a
//!   pluggable [`OutcomeResolver`] strategy.
//!
//! Group formation is atomic: removing the members from the queue and
//! detaching their connections from reactor read-interest happen in one
//! critical section, so a contest always owns its sockets exclusively.

mod contest;
mod error;
mod matcher;
mod pool;
mod queue;
mod resolver;

pub use contest::{Contest, ContestConfig};
pub use error::ArenaError;
pub use matcher::{MatchConfig, run_ranked_matcher, run_simple_matcher};
pub use pool::ContestPool;
pub use queue::{MatchQueue, relaxation_window};
pub use resolver::{OutcomeResolver, RandomOutcome};
