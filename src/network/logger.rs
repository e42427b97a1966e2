//! Server logger capability
//!
//! The server reports lifecycle events (connections, accept errors, handler
//! failures) through a [`Logger`]. The default forwards to `tracing`.

use std::fmt;

/// Formatted-message sink. Must not block indefinitely.
pub trait Logger: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

impl fmt::Debug for dyn Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

/// Forwards messages to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "respwire::server", "{}", args);
    }
}

/// Discards every message
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _args: fmt::Arguments<'_>) {}
}
