//! A single contest: a fixed roster run to completion by one worker.

use std::sync::Arc;
use std::time::Duration;

use matchforge_protocol::reply;
use matchforge_session::Session;

use crate::OutcomeResolver;

/// Rating awarded to the winner and taken from each loser.
const RATING_DELTA: i32 = 10;

/// Losers only pay the delta while their rating exceeds this floor.
/// Inherited asymmetric rule: a rating of 10 or below is frozen.
const RATING_FLOOR: i32 = 10;

// ---------------------------------------------------------------------------
// ContestConfig
// ---------------------------------------------------------------------------

/// Configuration for contest execution.
#[derive(Debug, Clone)]
pub struct ContestConfig {
    /// Pause between resolving the outcome and announcing it.
    /// Default: 2 seconds.
    pub settle_delay: Duration,

    /// How long to wait for any single player's contest input before
    /// giving up on it. Bounds the damage a silent peer can do to a
    /// worker slot. Default: 60 seconds.
    pub input_timeout: Duration,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            input_timeout: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// Contest
// ---------------------------------------------------------------------------

/// One contest between a fixed roster of sessions.
///
/// Lifecycle: submitted to the pool (pending) → run by a worker →
/// completed (winner set exactly once) → settled by the drain. A
/// contest is never re-run.
pub struct Contest {
    players: Vec<Arc<Session>>,
    ranked: bool,
    winner: Option<usize>,
}

impl Contest {
    /// Creates a pending contest over the given roster.
    pub fn new(players: Vec<Arc<Session>>, ranked: bool) -> Self {
        Self {
            players,
            ranked,
            winner: None,
        }
    }

    /// The roster, in grouping order.
    pub fn players(&self) -> &[Arc<Session>] {
        &self.players
    }

    pub fn is_ranked(&self) -> bool {
        self.ranked
    }

    /// The winning session, once decided.
    pub fn winner(&self) -> Option<&Arc<Session>> {
        self.winner.map(|idx| &self.players[idx])
    }

    /// Runs the contest to completion on the calling worker.
    ///
    /// The contest owns every roster member's socket exclusively here —
    /// the group was detached from reactor read-interest at formation.
    /// Send failures and lost connections are logged per player and
    /// never abort the contest; a winner is always decided.
    pub async fn run(
        &mut self,
        resolver: &dyn OutcomeResolver,
        config: &ContestConfig,
    ) {
        self.greet_players().await;
        self.gather_inputs(config.input_timeout).await;

        let winner_idx = self.resolve_winner(resolver);
        if self.ranked {
            self.apply_rating_deltas(winner_idx);
        }

        tokio::time::sleep(config.settle_delay).await;
        self.announce_winner(winner_idx).await;

        self.winner = Some(winner_idx);
        tracing::info!(
            winner = self.players[winner_idx].name(),
            ranked = self.ranked,
            "contest completed"
        );
    }

    /// Broadcasts the roster greeting to every player.
    async fn greet_players(&self) {
        let greeting =
            reply::found_game(self.players.iter().map(|p| p.name()));
        for player in &self.players {
            if let Err(e) = player.connection().send(&greeting).await {
                tracing::warn!(
                    player = player.name(),
                    error = %e,
                    "failed to greet player"
                );
            }
        }
    }

    /// Collects one input line per player, in roster order.
    ///
    /// A lost connection or an expired input timeout skips that
    /// player's input; the contest continues regardless.
    async fn gather_inputs(&self, input_timeout: Duration) {
        for player in &self.players {
            let conn = player.connection();
            match tokio::time::timeout(input_timeout, conn.recv_message())
                .await
            {
                Ok(Ok(input)) => {
                    tracing::info!(
                        player = player.name(),
                        %input,
                        "contest input received"
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        player = player.name(),
                        error = %e,
                        "connection lost while waiting for input"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        player = player.name(),
                        "player input timed out"
                    );
                }
            }
        }
    }

    fn resolve_winner(&self, resolver: &dyn OutcomeResolver) -> usize {
        let idx = resolver.resolve(&self.players);
        debug_assert!(idx < self.players.len());
        idx.min(self.players.len() - 1)
    }

    /// Winner gains the delta; every other player pays it only while
    /// above the floor.
    fn apply_rating_deltas(&self, winner_idx: usize) {
        for (idx, player) in self.players.iter().enumerate() {
            if idx == winner_idx {
                player.set_rating(player.rating() + RATING_DELTA);
            } else if player.rating() > RATING_FLOOR {
                player.set_rating(player.rating() - RATING_DELTA);
            }
        }
    }

    async fn announce_winner(&self, winner_idx: usize) {
        let announcement =
            reply::winner_announcement(self.players[winner_idx].name());
        for player in &self.players {
            if let Err(e) = player.connection().send(&announcement).await {
                tracing::warn!(
                    player = player.name(),
                    error = %e,
                    "failed to announce winner"
                );
            }
        }
    }
}

impl std::fmt::Debug for Contest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Contest")
            .field(
                "players",
                &self.players.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("ranked", &self.ranked)
            .field("winner", &self.winner().map(|w| w.name()))
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RandomOutcome;
    use matchforge_transport::{Connection, TcpTransport};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Resolver that always picks a fixed roster index.
    struct Fixed(usize);

    impl OutcomeResolver for Fixed {
        fn resolve(&self, _roster: &[Arc<Session>]) -> usize {
            self.0
        }
    }

    fn fast_config() -> ContestConfig {
        ContestConfig {
            settle_delay: Duration::from_millis(10),
            input_timeout: Duration::from_millis(200),
        }
    }

    async fn conn() -> (Arc<Connection>, TcpStream) {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let server = transport.accept().await.unwrap();
        (server, client)
    }

    async fn session(name: &str, rating: i32) -> (Arc<Session>, TcpStream) {
        let (c, keep) = conn().await;
        let session = Arc::new(Session::new(
            name.to_string(),
            rating,
            format!("token-{name}"),
            c,
        ));
        (session, keep)
    }

    /// Plays the client side: reads the greeting, sends one input,
    /// returns everything received (greeting + announcement).
    async fn play(mut socket: TcpStream) -> String {
        let mut received = String::new();
        let mut buf = [0u8; 256];

        // Greeting arrives first.
        let n = socket.read(&mut buf).await.unwrap();
        received.push_str(std::str::from_utf8(&buf[..n]).unwrap());

        socket.write_all(b"my move\n").await.unwrap();

        // Winner announcement after the settle delay.
        let n = socket.read(&mut buf).await.unwrap();
        received.push_str(std::str::from_utf8(&buf[..n]).unwrap());
        received
    }

    #[tokio::test]
    async fn test_run_broadcasts_greeting_and_winner() {
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, sock_b) = session("bob", 100).await;
        let mut contest = Contest::new(vec![alice, bob], false);

        let client_a = tokio::spawn(play(sock_a));
        let client_b = tokio::spawn(play(sock_b));

        contest.run(&Fixed(0), &fast_config()).await;

        let seen_a = client_a.await.unwrap();
        let seen_b = client_b.await.unwrap();
        for seen in [&seen_a, &seen_b] {
            assert!(seen.contains("Found game with players: \nalice\nbob\n"));
            assert!(seen.contains("Winner was: alice!"));
        }
        assert_eq!(contest.winner().unwrap().name(), "alice");
    }

    #[tokio::test]
    async fn test_run_unranked_leaves_ratings_untouched() {
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, sock_b) = session("bob", 100).await;
        let mut contest =
            Contest::new(vec![Arc::clone(&alice), Arc::clone(&bob)], false);

        let a = tokio::spawn(play(sock_a));
        let b = tokio::spawn(play(sock_b));
        contest.run(&Fixed(1), &fast_config()).await;
        let _ = (a.await, b.await);

        assert_eq!(alice.rating(), 100);
        assert_eq!(bob.rating(), 100);
    }

    #[tokio::test]
    async fn test_run_ranked_applies_deltas() {
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, sock_b) = session("bob", 100).await;
        let mut contest =
            Contest::new(vec![Arc::clone(&alice), Arc::clone(&bob)], true);

        let a = tokio::spawn(play(sock_a));
        let b = tokio::spawn(play(sock_b));
        contest.run(&Fixed(0), &fast_config()).await;
        let _ = (a.await, b.await);

        assert_eq!(alice.rating(), 110, "winner gains 10");
        assert_eq!(bob.rating(), 90, "loser pays 10");
    }

    #[tokio::test]
    async fn test_run_ranked_loser_at_floor_keeps_rating() {
        // A loser at or below 10 pays nothing; at 11 they drop to 1.
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, sock_b) = session("bob", 10).await;
        let mut contest =
            Contest::new(vec![Arc::clone(&alice), Arc::clone(&bob)], true);

        let a = tokio::spawn(play(sock_a));
        let b = tokio::spawn(play(sock_b));
        contest.run(&Fixed(0), &fast_config()).await;
        let _ = (a.await, b.await);

        assert_eq!(bob.rating(), 10, "rating at the floor is frozen");
    }

    #[tokio::test]
    async fn test_run_silent_player_times_out_but_contest_finishes() {
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, _sock_b) = session("bob", 100).await; // never speaks
        let mut contest = Contest::new(vec![alice, bob], false);

        let a = tokio::spawn(play(sock_a));
        contest.run(&Fixed(0), &fast_config()).await;
        let _ = a.await;

        assert!(contest.winner().is_some(), "silent player cannot stall");
    }

    #[tokio::test]
    async fn test_run_disconnected_player_does_not_abort() {
        let (alice, sock_a) = session("alice", 100).await;
        let (bob, sock_b) = session("bob", 100).await;
        drop(sock_b); // bob is gone before the contest starts
        let mut contest = Contest::new(vec![alice, bob], false);

        let a = tokio::spawn(play(sock_a));
        contest.run(&Fixed(0), &fast_config()).await;
        let _ = a.await;

        assert_eq!(contest.winner().unwrap().name(), "alice");
    }

    #[tokio::test]
    async fn test_random_outcome_stays_in_roster_bounds() {
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        let roster = vec![a, b];

        let resolver = RandomOutcome;
        for _ in 0..64 {
            assert!(resolver.resolve(&roster) < roster.len());
        }
    }
}
