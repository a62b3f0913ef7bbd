use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{SessionRegistry, TokenValidator};
use crate::config::Config;
use crate::engine::LobbyEngine;
use crate::hub::EventHub;

/// Top-level wiring: validator → engine → hub, with the event sink
/// installed to close the Engine↔Hub cycle.
pub struct LobbyServer {
    config: Config,
    validator: Arc<dyn TokenValidator>,
    engine: Arc<LobbyEngine>,
    hub: Arc<EventHub>,
    shutdown: CancellationToken,
}

impl LobbyServer {
    /// Build a server with the in-memory session validator seeded from
    /// config.
    pub fn new(config: Config) -> Arc<Self> {
        let validator: Arc<dyn TokenValidator> =
            Arc::new(SessionRegistry::new(config.sessions.clone()));
        Self::with_validator(config, validator)
    }

    /// Build a server around an externally provided token validator.
    pub fn with_validator(config: Config, validator: Arc<dyn TokenValidator>) -> Arc<Self> {
        let engine = Arc::new(LobbyEngine::new(validator.clone()));
        let shutdown = CancellationToken::new();
        let hub = EventHub::new(engine.clone(), shutdown.clone());
        engine.install_sink(hub.clone());

        Arc::new(Self {
            config,
            validator,
            engine,
            hub,
            shutdown,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &Arc<LobbyEngine> {
        &self.engine
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn validator(&self) -> &Arc<dyn TokenValidator> {
        &self.validator
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop background hub loops. Connected sockets drain on their own.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Liveness probe: the service is healthy as long as the process is up;
    /// there is no external dependency to check.
    pub fn health_check(&self) -> bool {
        !self.shutdown.is_cancelled()
    }
}
