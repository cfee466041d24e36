//! The settlement drain.
//!
//! Ticks on an interval, takes every completed contest, reattaches the
//! players' sockets to the reactor, and persists ranked rating changes
//! through the credential repository. Each contest is settled exactly
//! once; a repository write failure is logged and the contest dropped
//! — ranked results can be lost on a write error, by contract.

use std::sync::Arc;

use matchforge_arena::Contest;

use crate::reactor::ReactorCommand;
use crate::server::ServerState;

/// Runs the settlement loop. Never returns.
pub(crate) async fn run_settlement(state: Arc<ServerState>) {
    let mut ticker = tokio::time::interval(state.config.settle_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        for contest in state.pool.take_completed().await {
            settle(&state, contest).await;
        }
    }
}

async fn settle(state: &Arc<ServerState>, contest: Contest) {
    let winner = match contest.winner() {
        Some(winner) => winner.name().to_string(),
        // Defensive: take_completed only yields decided contests.
        None => return,
    };
    tracing::info!(
        %winner,
        ranked = contest.is_ranked(),
        "settling contest"
    );

    for player in contest.players() {
        // `reattach` takes the per-session connection lock, so a
        // concurrent token reconnect can't be overwritten here.
        let conn = player.reattach();
        if conn.is_closed() {
            tracing::debug!(
                player = player.name(),
                "skipping reattach of closed connection"
            );
            continue;
        }
        if state
            .reactor_tx
            .send(ReactorCommand::Attach(conn))
            .is_err()
        {
            tracing::warn!(player = player.name(), "reactor gone, cannot reattach");
        }
    }

    if !contest.is_ranked() {
        return; // unranked contests are simply discarded
    }

    let updates: Vec<(String, i32)> = contest
        .players()
        .iter()
        .map(|p| (p.name().to_string(), p.rating()))
        .collect();
    if let Err(e) = state.store.update_ratings(&updates).await {
        // No retry: the contest is dropped and these rating changes
        // are lost. Known durability gap.
        tracing::error!(error = %e, "failed to persist ranked ratings");
    }
}
