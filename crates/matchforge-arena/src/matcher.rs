//! The two matcher loops.
//!
//! Each queue gets one long-running task. A matcher attempts one
//! grouping pass, submits on success, and otherwise sleeps on the
//! queue's enqueue signal with a timeout — the timeout is what lets
//! ranked windows relax and reconnected entries become eligible
//! without a fresh enqueue.

use std::sync::Arc;
use std::time::Duration;

use crate::{Contest, ContestPool, MatchQueue};

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Configuration for the matchmaking engine.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Roster size of every contest. Default: 2.
    pub players_per_contest: usize,

    /// Time a ranked anchor must wait for each relaxation step.
    /// Default: 5 seconds.
    pub relax_period: Duration,

    /// Base width of the ranked rating window; the window is this
    /// times the square of the relaxation count. Default: 50.
    pub relax_quantity: i32,

    /// How long a matcher sleeps between grouping attempts when no
    /// enqueue signal arrives. Default: 500 ms.
    pub poll_interval: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            players_per_contest: 2,
            relax_period: Duration::from_secs(5),
            relax_quantity: 50,
            poll_interval: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// Matcher loops
// ---------------------------------------------------------------------------

/// Runs the simple (strict FIFO) matcher until the pool shuts down.
pub async fn run_simple_matcher(
    queue: Arc<MatchQueue>,
    pool: Arc<ContestPool>,
    config: MatchConfig,
) {
    loop {
        match queue.take_fifo_group(config.players_per_contest).await {
            Some(group) => {
                tracing::info!(
                    players = ?group.iter().map(|s| s.name()).collect::<Vec<_>>(),
                    "simple group formed"
                );
                if pool.submit(Contest::new(group, false)).is_err() {
                    tracing::info!("pool closed, simple matcher stopping");
                    break;
                }
            }
            None => queue.wait_for_entries(config.poll_interval).await,
        }
    }
}

/// Runs the ranked (skill-proximity) matcher until the pool shuts down.
pub async fn run_ranked_matcher(
    queue: Arc<MatchQueue>,
    pool: Arc<ContestPool>,
    config: MatchConfig,
) {
    loop {
        let group = queue
            .take_ranked_group(
                config.players_per_contest,
                config.relax_period,
                config.relax_quantity,
            )
            .await;
        match group {
            Some(group) => {
                tracing::info!(
                    players = ?group.iter().map(|s| s.name()).collect::<Vec<_>>(),
                    "ranked group formed"
                );
                if pool.submit(Contest::new(group, true)).is_err() {
                    tracing::info!("pool closed, ranked matcher stopping");
                    break;
                }
            }
            None => queue.wait_for_entries(config.poll_interval).await,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContestConfig, OutcomeResolver};
    use matchforge_session::Session;
    use matchforge_transport::TcpTransport;

    struct First;

    impl OutcomeResolver for First {
        fn resolve(&self, _roster: &[Arc<Session>]) -> usize {
            0
        }
    }

    fn fast_match_config() -> MatchConfig {
        MatchConfig {
            poll_interval: Duration::from_millis(10),
            ..MatchConfig::default()
        }
    }

    fn fast_contest_config() -> ContestConfig {
        ContestConfig {
            settle_delay: Duration::from_millis(5),
            input_timeout: Duration::from_millis(100),
        }
    }

    /// A session whose client half is already dropped: it still reads
    /// as connected (nothing has touched the socket yet), and its
    /// contest finishes immediately.
    async fn orphan_session(name: &str, rating: i32) -> Arc<Session> {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let client = tokio::net::TcpStream::connect(addr).await.unwrap();
        let conn = transport.accept().await.unwrap();
        drop(client);
        Arc::new(Session::new(
            name.to_string(),
            rating,
            format!("token-{name}"),
            conn,
        ))
    }

    async fn wait_for_one_completed(pool: &ContestPool) -> Contest {
        for _ in 0..200 {
            let mut done = pool.take_completed().await;
            if let Some(contest) = done.pop() {
                return contest;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no contest completed in time");
    }

    #[tokio::test]
    async fn test_simple_matcher_groups_two_and_submits() {
        let queue = Arc::new(MatchQueue::new("simple"));
        let pool = Arc::new(ContestPool::new(
            1,
            Arc::new(First),
            fast_contest_config(),
        ));
        let matcher = tokio::spawn(run_simple_matcher(
            Arc::clone(&queue),
            Arc::clone(&pool),
            fast_match_config(),
        ));

        queue.enqueue(orphan_session("alice", 100).await).await;
        queue.enqueue(orphan_session("bob", 100).await).await;

        let contest = wait_for_one_completed(&pool).await;
        assert!(!contest.is_ranked());
        let names: Vec<&str> =
            contest.players().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["alice", "bob"]);
        assert!(queue.is_empty().await);

        matcher.abort();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_simple_matcher_waits_below_roster_size() {
        let queue = Arc::new(MatchQueue::new("simple"));
        let pool = Arc::new(ContestPool::new(
            1,
            Arc::new(First),
            fast_contest_config(),
        ));
        let matcher = tokio::spawn(run_simple_matcher(
            Arc::clone(&queue),
            Arc::clone(&pool),
            fast_match_config(),
        ));

        queue.enqueue(orphan_session("alice", 100).await).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(pool.take_completed().await.is_empty());
        assert_eq!(queue.len().await, 1);

        matcher.abort();
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_ranked_matcher_respects_window_then_relaxes() {
        // 100 vs 250 with a 20 ms relax period: not groupable at
        // first (window 0), groupable once a few periods elapse.
        let queue = Arc::new(MatchQueue::new("ranked"));
        let pool = Arc::new(ContestPool::new(
            1,
            Arc::new(First),
            fast_contest_config(),
        ));
        let config = MatchConfig {
            relax_period: Duration::from_millis(20),
            poll_interval: Duration::from_millis(10),
            ..MatchConfig::default()
        };
        let matcher = tokio::spawn(run_ranked_matcher(
            Arc::clone(&queue),
            Arc::clone(&pool),
            config,
        ));

        queue.enqueue(orphan_session("carol", 250).await).await;
        queue.enqueue(orphan_session("dave", 100).await).await;

        let contest = wait_for_one_completed(&pool).await;
        assert!(contest.is_ranked());
        let mut names: Vec<&str> =
            contest.players().iter().map(|s| s.name()).collect();
        names.sort_unstable();
        assert_eq!(names, ["carol", "dave"]);

        matcher.abort();
        pool.shutdown().await;
    }
}
