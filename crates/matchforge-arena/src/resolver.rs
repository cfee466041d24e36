//! The in-contest "game" as a strategy.
//!
//! Real game rules are out of scope for the matchmaking server; the
//! executor only needs something that turns a roster into a winner.
//! [`RandomOutcome`] is the default (and test) strategy.

use std::sync::Arc;

use matchforge_session::Session;
use rand::Rng;

/// Decides the winner of a contest.
pub trait OutcomeResolver: Send + Sync + 'static {
    /// Returns the roster index of the winner. The roster is never
    /// empty.
    fn resolve(&self, roster: &[Arc<Session>]) -> usize;
}

/// Picks a uniformly random winner.
pub struct RandomOutcome;

impl OutcomeResolver for RandomOutcome {
    fn resolve(&self, roster: &[Arc<Session>]) -> usize {
        rand::rng().random_range(0..roster.len())
    }
}
