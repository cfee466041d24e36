//! The disconnect reaper.
//!
//! Ticks on an interval and sweeps the four shared collections — live
//! connections, session registry, both queues — each under its own
//! lock. Sessions and queue entries share the disconnect-mark state,
//! so the grace period starts at the first sweep that observes the
//! disconnect and a token reconnect clears it everywhere.

use std::sync::Arc;

use crate::server::ServerState;

/// Runs the reaper loop. Never returns.
pub(crate) async fn run_reaper(state: Arc<ServerState>) {
    let mut ticker = tokio::time::interval(state.config.reap_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // Closed connections are pruned directly.
        {
            let mut connections = state.connections.lock().await;
            let before = connections.len();
            connections.retain(|_, conn| !conn.is_closed());
            let pruned = before - connections.len();
            if pruned > 0 {
                tracing::debug!(pruned, "pruned closed connections");
            }
        }

        let grace = state.config.session.disconnect_grace;
        state.registry.sweep().await;
        state.simple_queue.sweep_disconnected(grace).await;
        state.ranked_queue.sweep_disconnected(grace).await;
    }
}
