//! The protocol dispatcher: interprets decoded lines.
//!
//! Dispatch order mirrors the wire grammar's ambiguity resolution:
//! a bare line is first tried as a reconnect token; colon-delimited
//! lines are auth commands; bare digits are requeue choices that only
//! mean something on an authenticated connection.

use std::sync::Arc;

use matchforge_protocol::{
    AuthAction, ClientCommand, QueueMode, RequeueChoice, parse_line, reply,
};
use matchforge_session::{Session, UserRecord, password};
use matchforge_transport::Connection;

use crate::server::ServerState;

/// Handles one decoded protocol line from an attached connection.
pub(crate) async fn dispatch_line(
    state: &Arc<ServerState>,
    conn: &Arc<Connection>,
    line: &str,
) {
    match parse_line(line) {
        Ok(ClientCommand::Bare(token)) => {
            handle_token(state, conn, &token).await;
        }
        Ok(ClientCommand::Auth {
            mode,
            action,
            username,
            password,
        }) => {
            handle_auth(state, conn, mode, action, &username, &password).await;
        }
        Ok(ClientCommand::Quit) => {
            tracing::info!(id = %conn.id(), "client quit before authenticating");
            conn.close().await;
        }
        Ok(ClientCommand::Choice(choice)) => {
            handle_choice(state, conn, choice).await;
        }
        Err(e) => {
            // Malformed with a session: inherited silent-ignore.
            // Without one, the client is told its line meant nothing.
            if state.registry.session_for_connection(conn.id()).await.is_some()
            {
                tracing::debug!(
                    id = %conn.id(),
                    error = %e,
                    "ignoring malformed line from authenticated connection"
                );
            } else {
                tracing::debug!(id = %conn.id(), error = %e, "malformed line");
                send_reply(conn, reply::INVALID_TOKEN).await;
            }
        }
    }
}

/// A bare line: try it as a reconnect token.
async fn handle_token(
    state: &Arc<ServerState>,
    conn: &Arc<Connection>,
    token: &str,
) {
    match state.registry.reconnect(token, Arc::clone(conn)).await {
        Ok(session) => {
            tracing::info!(
                player = session.name(),
                id = %conn.id(),
                "player reconnected"
            );
            send_reply(conn, reply::RECONNECTED).await;
        }
        Err(_) => {
            if state.registry.session_for_connection(conn.id()).await.is_some()
            {
                tracing::debug!(
                    id = %conn.id(),
                    "ignoring unrecognized line from authenticated connection"
                );
            } else {
                send_reply(conn, reply::INVALID_TOKEN).await;
            }
        }
    }
}

/// A full auth command: login or register, then session creation and
/// the initial enqueue.
async fn handle_auth(
    state: &Arc<ServerState>,
    conn: &Arc<Connection>,
    mode: QueueMode,
    action: AuthAction,
    username: &str,
    pass: &str,
) {
    let failure = match action {
        AuthAction::Login => reply::LOGIN_FAILED,
        AuthAction::Register => reply::REGISTER_FAILED,
    };

    let rating = match authenticate(state, action, username, pass).await {
        Some(rating) => rating,
        None => {
            send_reply(conn, failure).await;
            return;
        }
    };

    let session = match state
        .registry
        .create(username, rating, Arc::clone(conn))
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(username, error = %e, "session creation denied");
            send_reply(conn, failure).await;
            return;
        }
    };

    // The client must persist this token to reconnect later.
    send_reply(conn, session.reconnect_token()).await;

    enqueue(state, session, mode).await;
}

/// Validates credentials against the repository.
///
/// Returns the player's rating on success: the stored rating for a
/// login, the base rating for a fresh registration (whose row is
/// inserted here). `None` means the caller replies with the action's
/// failure string.
async fn authenticate(
    state: &Arc<ServerState>,
    action: AuthAction,
    username: &str,
    pass: &str,
) -> Option<i32> {
    match action {
        AuthAction::Login => {
            let record = match state.store.find_by_name(username).await {
                Ok(record) => record?,
                Err(e) => {
                    tracing::error!(error = %e, "credential store read failed");
                    return None;
                }
            };
            if !password::verify(pass, &record.credential) {
                return None;
            }
            // One live session per name.
            if state.registry.contains(username).await {
                tracing::debug!(username, "login rejected: session already live");
                return None;
            }
            Some(record.rating)
        }
        AuthAction::Register => {
            match state.store.find_by_name(username).await {
                Ok(Some(_)) => return None, // name taken
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "credential store read failed");
                    return None;
                }
            }
            let record = UserRecord {
                name: username.to_string(),
                credential: password::hash(pass),
                rating: state.config.base_rating,
            };
            if let Err(e) = state.store.insert(&record).await {
                tracing::error!(error = %e, "credential store insert failed");
                return None;
            }
            Some(state.config.base_rating)
        }
    }
}

/// A bare requeue digit from an (expected) authenticated connection.
async fn handle_choice(
    state: &Arc<ServerState>,
    conn: &Arc<Connection>,
    choice: RequeueChoice,
) {
    let session = state.registry.session_for_connection(conn.id()).await;
    let Some(session) = session else {
        send_reply(conn, reply::NOT_AUTHENTICATED).await;
        return;
    };

    match choice {
        RequeueChoice::Simple => {
            enqueue(state, session, QueueMode::Simple).await;
        }
        RequeueChoice::Ranked => {
            enqueue(state, session, QueueMode::Ranked).await;
        }
        RequeueChoice::Quit => {
            tracing::info!(player = session.name(), "client quit");
            state.registry.remove(session.name()).await;
            conn.close().await;
        }
    }
}

/// Enqueues a session, enforcing at-most-one-queue membership.
async fn enqueue(
    state: &Arc<ServerState>,
    session: Arc<Session>,
    mode: QueueMode,
) {
    let name = session.name();
    if state.simple_queue.contains(name).await
        || state.ranked_queue.contains(name).await
    {
        tracing::warn!(player = name, "already queued, ignoring");
        return;
    }
    match mode {
        QueueMode::Simple => state.simple_queue.enqueue(session).await,
        QueueMode::Ranked => state.ranked_queue.enqueue(session).await,
    };
}

/// Best-effort reply; a failed send marks the connection closed and
/// the reaper cleans up.
async fn send_reply(conn: &Arc<Connection>, msg: &str) {
    if let Err(e) = conn.send(msg).await {
        tracing::debug!(id = %conn.id(), error = %e, "reply failed");
    }
}
