//! Error types for the arena layer.

/// Errors that can occur submitting work to the arena.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// The contest pool has been shut down; no new contests run.
    #[error("contest pool is shut down")]
    PoolClosed,
}
