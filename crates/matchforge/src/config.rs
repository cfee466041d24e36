//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use matchforge_arena::{ContestConfig, MatchConfig};
use matchforge_session::SessionConfig;

/// Top-level configuration, composing the per-layer configs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path of the credential file. Default: `db_user.csv` in the
    /// working directory.
    pub db_path: PathBuf,

    /// Rating assigned to newly registered players. Default: 100.
    pub base_rating: i32,

    /// Number of contest pool workers. Default: 5.
    pub workers: usize,

    /// Reaper tick. Default: 1 second.
    pub reap_interval: Duration,

    /// Settlement drain tick. Default: 1 second.
    pub settle_interval: Duration,

    /// Session layer config (disconnect grace period).
    pub session: SessionConfig,

    /// Matchmaking config (roster size, ranked relaxation, poll).
    pub matching: MatchConfig,

    /// Contest execution config (settle delay, input timeout).
    pub contest: ContestConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db_user.csv"),
            base_rating: 100,
            workers: 5,
            reap_interval: Duration::from_secs(1),
            settle_interval: Duration::from_secs(1),
            session: SessionConfig::default(),
            matching: MatchConfig::default(),
            contest: ContestConfig::default(),
        }
    }
}
