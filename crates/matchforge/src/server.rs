//! `Server` builder and bootstrap.
//!
//! This is the entry point for running a Matchforge server. It ties
//! together all the layers: transport → protocol → session → arena.

use std::collections::HashMap;
use std::sync::Arc;

use matchforge_arena::{
    ContestPool, MatchQueue, OutcomeResolver, RandomOutcome,
    run_ranked_matcher, run_simple_matcher,
};
use matchforge_session::{CredentialStore, SessionRegistry};
use matchforge_transport::{Connection, ConnectionId, TcpTransport};
use tokio::sync::{Mutex, mpsc};

use crate::reactor::{ReactorCommand, run_reactor};
use crate::reaper::run_reaper;
use crate::settlement::run_settlement;
use crate::{MatchforgeError, ServerConfig};

/// Shared server state, one per running server.
///
/// Each collection is guarded by its own lock (or is internally
/// synchronized); locks are held for scans and mutations only, never
/// across another component's socket I/O.
pub(crate) struct ServerState {
    pub(crate) config: ServerConfig,
    pub(crate) registry: SessionRegistry,
    pub(crate) store: CredentialStore,
    pub(crate) simple_queue: Arc<MatchQueue>,
    pub(crate) ranked_queue: Arc<MatchQueue>,
    pub(crate) pool: Arc<ContestPool>,
    /// Every live connection, authenticated or not. The reaper prunes
    /// closed entries; the reactor reads it to resolve readiness
    /// events.
    pub(crate) connections: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
    /// Funnel for re-registration requests onto the reactor's own
    /// task. Nothing else mutates the reactor's readiness set.
    pub(crate) reactor_tx: mpsc::UnboundedSender<ReactorCommand>,
}

/// Builder for configuring and starting a Matchforge server.
///
/// # Example
///
/// ```rust,ignore
/// let server = Server::builder()
///     .bind("0.0.0.0:4000")
///     .config(ServerConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct ServerBuilder {
    bind_addr: String,
    config: ServerConfig,
    resolver: Arc<dyn OutcomeResolver>,
}

impl ServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: ServerConfig::default(),
            resolver: Arc::new(RandomOutcome),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the server configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the contest outcome strategy (default: uniformly
    /// random winner).
    pub fn resolver(mut self, resolver: Arc<dyn OutcomeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// # Errors
    /// Fails if the port cannot be bound; callers are expected to
    /// treat that as fatal at startup.
    pub async fn build(self) -> Result<Server, MatchforgeError> {
        let transport = TcpTransport::bind(&self.bind_addr).await?;
        let (reactor_tx, reactor_rx) = mpsc::unbounded_channel();

        let pool = Arc::new(ContestPool::new(
            self.config.workers,
            self.resolver,
            self.config.contest.clone(),
        ));

        let state = Arc::new(ServerState {
            registry: SessionRegistry::new(self.config.session.clone()),
            store: CredentialStore::new(&self.config.db_path),
            simple_queue: Arc::new(MatchQueue::new("simple")),
            ranked_queue: Arc::new(MatchQueue::new("ranked")),
            pool,
            connections: Mutex::new(HashMap::new()),
            reactor_tx,
            config: self.config,
        });

        Ok(Server {
            transport,
            state,
            reactor_rx,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fully assembled Matchforge server.
///
/// Call [`run()`](Self::run) to start every loop.
pub struct Server {
    transport: TcpTransport,
    state: Arc<ServerState>,
    reactor_rx: mpsc::UnboundedReceiver<ReactorCommand>,
}

impl Server {
    /// Creates a new builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server until the process is terminated.
    ///
    /// Spawns the matchers, the reaper, and the settlement drain, then
    /// drives the reactor on the calling task.
    pub async fn run(self) -> Result<(), MatchforgeError> {
        tracing::info!("matchforge server running");

        tokio::spawn(run_simple_matcher(
            Arc::clone(&self.state.simple_queue),
            Arc::clone(&self.state.pool),
            self.state.config.matching.clone(),
        ));
        tokio::spawn(run_ranked_matcher(
            Arc::clone(&self.state.ranked_queue),
            Arc::clone(&self.state.pool),
            self.state.config.matching.clone(),
        ));
        tokio::spawn(run_reaper(Arc::clone(&self.state)));
        tokio::spawn(run_settlement(Arc::clone(&self.state)));

        run_reactor(self.transport, self.state, self.reactor_rx).await;
        Ok(())
    }
}
