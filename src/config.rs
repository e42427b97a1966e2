//! Configuration for respwire servers
//!
//! Centralized configuration with sensible defaults.

use std::sync::Arc;
use std::time::Duration;

use crate::network::{Logger, TracingLogger};
use crate::protocol::DEFAULT_MAX_DEPTH;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (used by the server binary)
    pub listen_addr: String,

    /// Per-request read timeout. Zero disables it.
    pub read_timeout: Duration,

    /// Per-response write timeout. Zero disables it.
    pub write_timeout: Duration,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Maximum array nesting accepted from clients
    pub max_depth: usize,

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------
    /// Sink for server lifecycle messages
    pub logger: Arc<dyn Logger>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:6379".to_string(),
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::ZERO,
            max_depth: DEFAULT_MAX_DEPTH,
            logger: Arc::new(TracingLogger),
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (zero disables)
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the write timeout (zero disables)
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.config.write_timeout = timeout;
        self
    }

    /// Set the maximum array nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the logger
    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.config.logger = Arc::new(logger);
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
