//! Match queues: ordered collections of sessions waiting for a group.
//!
//! A session is a member of at most one queue at a time (the dispatcher
//! enforces this across queues; `enqueue` rejects duplicates within
//! one). Group formation removes the members and detaches their
//! connections from reactor read-interest in a single critical section.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use matchforge_session::Session;
use tokio::sync::{Mutex, Notify};

/// An ordered queue of sessions waiting to be matched.
pub struct MatchQueue {
    /// Queue name for logging ("simple" / "ranked").
    label: &'static str,
    entries: Mutex<VecDeque<Arc<Session>>>,
    /// Signaled on every enqueue; matchers wait on it with a timeout.
    notify: Notify,
}

impl MatchQueue {
    /// Creates a new, empty queue.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    /// Appends a session and signals the matcher.
    ///
    /// Returns `false` without enqueueing if the session is already a
    /// member; membership is exclusive.
    pub async fn enqueue(&self, session: Arc<Session>) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|s| s.name() == session.name()) {
            tracing::warn!(
                queue = self.label,
                player = session.name(),
                "already queued, ignoring"
            );
            return false;
        }
        tracing::info!(
            queue = self.label,
            player = %session,
            "player queued"
        );
        entries.push_back(session);
        drop(entries);
        self.notify.notify_one();
        true
    }

    /// Whether a session with this name is queued.
    pub async fn contains(&self, name: &str) -> bool {
        self.entries.lock().await.iter().any(|s| s.name() == name)
    }

    /// Number of queued sessions (connected or not).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Waits for an enqueue signal, or until `poll` elapses.
    ///
    /// The timeout is what drives ranked relaxation (and re-checks of
    /// entries whose connection came back) without any enqueue
    /// happening.
    pub async fn wait_for_entries(&self, poll: Duration) {
        let _ = tokio::time::timeout(poll, self.notify.notified()).await;
    }

    /// Simple rule: take the first `n` currently connected sessions in
    /// arrival order.
    ///
    /// Disconnected entries are passed over but left in place; pruning
    /// them is the reaper's job. On success the members are removed and
    /// their connections detached atomically; `None` leaves the queue
    /// untouched.
    pub async fn take_fifo_group(&self, n: usize) -> Option<Vec<Arc<Session>>> {
        let mut entries = self.entries.lock().await;

        let picked: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_connected())
            .map(|(i, _)| i)
            .take(n)
            .collect();
        if picked.len() < n {
            return None;
        }

        Some(extract_group(&mut entries, &picked))
    }

    /// Ranked rule: anchor scan with time-relaxed rating windows.
    ///
    /// For each connected anchor in arrival order, partners are
    /// collected from the whole queue (in order, anchor excluded) whose
    /// rating falls within the anchor's current window. The first
    /// anchor that fills a group wins; partial groups are discarded.
    /// An anchor can be starved indefinitely while later arrivals
    /// match — ranked grouping makes no FIFO promise.
    pub async fn take_ranked_group(
        &self,
        n: usize,
        relax_period: Duration,
        relax_quantity: i32,
    ) -> Option<Vec<Arc<Session>>> {
        let mut entries = self.entries.lock().await;

        for anchor_idx in 0..entries.len() {
            let anchor = &entries[anchor_idx];
            if !anchor.is_connected() {
                continue;
            }

            let window =
                relaxation_window(anchor.waited(), relax_period, relax_quantity);
            let low = (anchor.rating().saturating_sub(window)).max(0);
            let high = anchor.rating().saturating_add(window);

            let mut picked = vec![anchor_idx];
            for (idx, candidate) in entries.iter().enumerate() {
                if picked.len() == n {
                    break;
                }
                if idx == anchor_idx || !candidate.is_connected() {
                    continue;
                }
                let rating = candidate.rating();
                if rating >= low && rating <= high {
                    picked.push(idx);
                }
            }

            if picked.len() == n {
                tracing::debug!(
                    queue = self.label,
                    anchor = entries[anchor_idx].name(),
                    window,
                    "ranked window matched"
                );
                return Some(extract_group(&mut entries, &picked));
            }
        }

        None
    }

    /// One reaper pass over the queue: marks fresh disconnects, evicts
    /// entries whose grace period elapsed, clears marks on entries
    /// whose connection came back. Returns the evicted sessions.
    pub async fn sweep_disconnected(&self, grace: Duration) -> Vec<Arc<Session>> {
        let mut entries = self.entries.lock().await;
        let mut evicted = Vec::new();
        let mut i = 0;
        while i < entries.len() {
            if entries[i].update_disconnect_mark(grace) {
                let session = entries.remove(i).expect("index in bounds");
                tracing::info!(
                    queue = self.label,
                    player = %session,
                    "removed from queue (grace period elapsed)"
                );
                evicted.push(session);
            } else {
                i += 1;
            }
        }
        evicted
    }
}

/// Removes the picked indices from the queue and detaches each member,
/// preserving `picked`'s order in the returned roster. Callers hold the
/// entries lock, so removal and detach are one atomic step.
fn extract_group(
    entries: &mut VecDeque<Arc<Session>>,
    picked: &[usize],
) -> Vec<Arc<Session>> {
    let group: Vec<Arc<Session>> =
        picked.iter().map(|&i| Arc::clone(&entries[i])).collect();

    let mut descending = picked.to_vec();
    descending.sort_unstable_by(|a, b| b.cmp(a));
    for idx in descending {
        entries.remove(idx);
    }

    for session in &group {
        session.detach();
    }
    group
}

/// The ranked rating window after `waited` time in queue.
///
/// `relaxations = floor(waited / period)`, window = `quantity × relaxations²`.
/// Quadratic growth guarantees an eventual match under low load at the
/// cost of rating fairness. A zero or sub-millisecond period degenerates
/// to a fully open window.
pub fn relaxation_window(
    waited: Duration,
    period: Duration,
    quantity: i32,
) -> i32 {
    let period_ms = period.as_millis();
    if period_ms == 0 {
        return i32::MAX;
    }
    let relaxations = (waited.as_millis() / period_ms) as i64;
    let window = i64::from(quantity) * relaxations * relaxations;
    window.clamp(0, i64::from(i32::MAX)) as i32
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use matchforge_transport::{Connection, TcpTransport};
    use tokio::net::TcpStream;

    /// Opens a loopback connection pair.
    async fn conn() -> (Arc<Connection>, TcpStream) {
        let transport = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let server = transport.accept().await.unwrap();
        (server, client)
    }

    /// A queued-up session plus the client socket keeping it connected.
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

    fn disconnect(session: &Session) {
        session.connection().mark_closed();
    }

    // =====================================================================
    // relaxation_window()
    // =====================================================================

    #[test]
    fn test_relaxation_window_zero_wait_is_zero() {
        let w = relaxation_window(
            Duration::ZERO,
            Duration::from_secs(5),
            50,
        );
        assert_eq!(w, 0, "fresh anchor only accepts an exact rating match");
    }

    #[test]
    fn test_relaxation_window_one_period_is_quantity() {
        let w = relaxation_window(
            Duration::from_secs(5),
            Duration::from_secs(5),
            50,
        );
        assert_eq!(w, 50);
    }

    #[test]
    fn test_relaxation_window_two_periods_is_four_quantity() {
        let w = relaxation_window(
            Duration::from_secs(10),
            Duration::from_secs(5),
            50,
        );
        assert_eq!(w, 200);
    }

    #[test]
    fn test_relaxation_window_floors_partial_periods() {
        let w = relaxation_window(
            Duration::from_secs(9),
            Duration::from_secs(5),
            50,
        );
        assert_eq!(w, 50, "9s waited is still one full 5s period");
    }

    #[test]
    fn test_relaxation_window_huge_wait_saturates() {
        let w = relaxation_window(
            Duration::from_secs(60 * 60 * 24 * 30),
            Duration::from_secs(5),
            50,
        );
        assert_eq!(w, i32::MAX);
    }

    // =====================================================================
    // enqueue() / contains()
    // =====================================================================

    #[tokio::test]
    async fn test_enqueue_duplicate_is_rejected() {
        let queue = MatchQueue::new("simple");
        let (a, _k) = session("alice", 100).await;

        assert!(queue.enqueue(Arc::clone(&a)).await);
        assert!(!queue.enqueue(a).await);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_contains_tracks_membership() {
        let queue = MatchQueue::new("simple");
        let (a, _k) = session("alice", 100).await;

        assert!(!queue.contains("alice").await);
        queue.enqueue(a).await;
        assert!(queue.contains("alice").await);
    }

    // =====================================================================
    // take_fifo_group()
    // =====================================================================

    #[tokio::test]
    async fn test_take_fifo_group_too_few_returns_none() {
        let queue = MatchQueue::new("simple");
        let (a, _k) = session("alice", 100).await;
        queue.enqueue(a).await;

        assert!(queue.take_fifo_group(2).await.is_none());
        assert_eq!(queue.len().await, 1, "queue untouched on failure");
    }

    #[tokio::test]
    async fn test_take_fifo_group_preserves_arrival_order() {
        // A,B,C,D arrive in order: the first group must be exactly
        // {A,B}, the second exactly {C,D}.
        let queue = MatchQueue::new("simple");
        let mut keep = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let (s, k) = session(name, 100).await;
            queue.enqueue(s).await;
            keep.push(k);
        }

        let first = queue.take_fifo_group(2).await.unwrap();
        let names: Vec<&str> = first.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["a", "b"]);

        let second = queue.take_fifo_group(2).await.unwrap();
        let names: Vec<&str> = second.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["c", "d"]);

        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_fifo_group_passes_over_disconnected() {
        let queue = MatchQueue::new("simple");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        let (c, _kc) = session("carol", 100).await;
        disconnect(&a);
        for s in [&a, &b, &c] {
            queue.enqueue(Arc::clone(s)).await;
        }

        let group = queue.take_fifo_group(2).await.unwrap();
        let names: Vec<&str> = group.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["bob", "carol"]);

        // The disconnected head stays for the reaper.
        assert!(queue.contains("alice").await);
    }

    #[tokio::test]
    async fn test_take_fifo_group_detaches_connections() {
        let queue = MatchQueue::new("simple");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        queue.enqueue(Arc::clone(&a)).await;
        queue.enqueue(Arc::clone(&b)).await;

        queue.take_fifo_group(2).await.unwrap();

        assert!(!a.connection().read_interest());
        assert!(!b.connection().read_interest());
    }

    // =====================================================================
    // take_ranked_group()
    // =====================================================================

    #[tokio::test]
    async fn test_take_ranked_group_zero_window_requires_exact_match() {
        // A huge relax period keeps the window at zero.
        let queue = MatchQueue::new("ranked");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 150).await;
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        let group = queue
            .take_ranked_group(2, Duration::from_secs(3600), 50)
            .await;
        assert!(group.is_none(), "150 is outside a zero-width window");
    }

    #[tokio::test]
    async fn test_take_ranked_group_exact_rating_matches_immediately() {
        let queue = MatchQueue::new("ranked");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        let group = queue
            .take_ranked_group(2, Duration::from_secs(3600), 50)
            .await
            .unwrap();
        let names: Vec<&str> = group.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["alice", "bob"]);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_take_ranked_group_window_widens_with_wait() {
        // With a 20ms period, 100ms of waiting gives at least
        // window = 50 × 5² = 1250 — plenty for a 150-point gap.
        let queue = MatchQueue::new("ranked");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 250).await;
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        let group = queue
            .take_ranked_group(2, Duration::from_millis(20), 50)
            .await;
        assert!(group.is_some());
    }

    #[tokio::test]
    async fn test_take_ranked_group_skips_unmatchable_anchor() {
        // The first anchor has no partner in range, but a later pair
        // does — ranked grouping does not promise FIFO fairness.
        let queue = MatchQueue::new("ranked");
        let (outlier, _ko) = session("outlier", 9000).await;
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        queue.enqueue(outlier).await;
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        let group = queue
            .take_ranked_group(2, Duration::from_secs(3600), 50)
            .await
            .unwrap();
        let names: Vec<&str> = group.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["alice", "bob"]);
        assert!(queue.contains("outlier").await, "anchor left queued");
    }

    #[tokio::test]
    async fn test_take_ranked_group_ignores_disconnected_partner() {
        let queue = MatchQueue::new("ranked");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        disconnect(&b);
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        let group = queue
            .take_ranked_group(2, Duration::from_secs(3600), 50)
            .await;
        assert!(group.is_none());
    }

    // =====================================================================
    // sweep_disconnected()
    // =====================================================================

    #[tokio::test]
    async fn test_sweep_disconnected_marks_then_evicts() {
        let queue = MatchQueue::new("simple");
        let (a, _ka) = session("alice", 100).await;
        let (b, _kb) = session("bob", 100).await;
        disconnect(&a);
        queue.enqueue(a).await;
        queue.enqueue(b).await;

        // First pass stamps the mark, second evicts (zero grace).
        assert!(queue.sweep_disconnected(Duration::ZERO).await.is_empty());
        let evicted = queue.sweep_disconnected(Duration::ZERO).await;
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].name(), "alice");
        assert!(queue.contains("bob").await);
    }

    #[tokio::test]
    async fn test_sweep_disconnected_within_grace_keeps_entry() {
        let queue = MatchQueue::new("simple");
        let (a, _ka) = session("alice", 100).await;
        disconnect(&a);
        queue.enqueue(a).await;

        queue.sweep_disconnected(Duration::from_secs(3600)).await;
        queue.sweep_disconnected(Duration::from_secs(3600)).await;

        assert!(queue.contains("alice").await);
    }
}
