//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.
//!
//! ## Shutdown
//! [`Server::close`] drops the shutdown sender (every [`Shutdown`] receiver
//! then observes a disconnected channel), closes the listeners so blocked
//! accepts return, and waits until the live-connection count drops to zero.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use parking_lot::{Condvar, Mutex};

use crate::config::ServerConfig;
use crate::error::{Result, RespError, TransportKind};
use crate::panic::PanicMessage;

use super::connection::Connection;
use super::handler::Handler;
use super::listener::{InterruptListener, IntoListener};

/// Listens for the server's shutdown signal
///
/// The signal is the sender side of a channel being dropped, so checking it
/// never blocks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    notify: Receiver<()>,
}

impl Shutdown {
    /// Returns `true` once the server has been closed
    pub fn is_shutdown(&self) -> bool {
        matches!(self.notify.try_recv(), Err(TryRecvError::Disconnected))
    }
}

/// A shutdown signal and the sender whose drop fires it
pub(crate) fn shutdown_channel() -> (Sender<()>, Shutdown) {
    let (stop, notify) = channel::bounded(0);
    (stop, Shutdown { notify })
}

/// First and longest pause after a temporary accept error
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Counts live connections so `close` can wait for them
#[derive(Debug, Default)]
struct ConnTracker {
    count: Mutex<usize>,
    idle: Condvar,
}

/// Decrements the live-connection count on drop, including during unwinding
struct ConnGuard {
    tracker: Arc<ConnTracker>,
}

impl ConnTracker {
    fn enter(self: &Arc<Self>) -> ConnGuard {
        *self.count.lock() += 1;
        ConnGuard {
            tracker: Arc::clone(self),
        }
    }

    fn wait_idle(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.idle.wait(&mut count);
        }
    }

    fn live(&self) -> usize {
        *self.count.lock()
    }
}

impl Drop for ConnGuard {
    fn drop(&mut self) {
        let mut count = self.tracker.count.lock();
        *count -= 1;
        if *count == 0 {
            self.tracker.idle.notify_all();
        }
    }
}

/// RESP server
///
/// Share it through an `Arc` to call [`close`](Server::close) from another
/// thread while [`serve`](Server::serve) is running.
pub struct Server {
    config: ServerConfig,
    handler: Arc<dyn Handler>,

    /// Dropped (set to `None`) on close
    stop: Mutex<Option<Sender<()>>>,
    shutdown: Shutdown,

    /// Listeners currently being served
    listeners: Mutex<Vec<Arc<InterruptListener>>>,
    conns: Arc<ConnTracker>,
}

impl Server {
    /// Create a server with the default configuration
    pub fn new(handler: impl Handler) -> Self {
        Self::with_config(ServerConfig::default(), handler)
    }

    pub fn with_config(config: ServerConfig, handler: impl Handler) -> Self {
        let (stop, shutdown) = shutdown_channel();
        Self {
            config,
            handler: Arc::new(handler),
            stop: Mutex::new(Some(stop)),
            shutdown,
            listeners: Mutex::new(Vec::new()),
            conns: Arc::new(ConnTracker::default()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// A handle that reports whether this server has been closed
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_shutdown()
    }

    /// Number of connections currently being handled
    pub fn open_connections(&self) -> usize {
        self.conns.live()
    }

    /// Accept connections until the server is closed (blocking)
    ///
    /// Returns `Ok(())` after a clean shutdown, or the accept error if the
    /// listener fails permanently.
    pub fn serve(&self, listener: impl IntoListener) -> Result<()> {
        let listener = listener.into_listener()?;
        let addr = listener.local_addr();

        self.listeners.lock().push(Arc::clone(&listener));
        // close() may have run before the listener was registered
        if self.is_closed() {
            self.close_listener(&listener);
        }

        let result = self.accept_loop(&listener);

        self.listeners.lock().retain(|l| !Arc::ptr_eq(l, &listener));
        match addr {
            Some(addr) => self.log(format_args!("Stopping server listening on {}", addr)),
            None => self.log(format_args!("Stopping server")),
        }
        result
    }

    fn accept_loop(&self, listener: &InterruptListener) -> Result<()> {
        let mut backoff: Option<Duration> = None;
        loop {
            if self.is_closed() {
                return Ok(());
            }

            let (stream, peer) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(RespError::ListenerClosed) => return Ok(()),
                Err(e) => {
                    self.log(format_args!("Error accepting connection: {}", e));
                    match accept_retry(&e, backoff) {
                        Some(delay) => {
                            backoff = Some(delay);
                            thread::sleep(delay);
                            continue;
                        }
                        None => return Err(e),
                    }
                }
            };
            backoff = None;

            // Count the connection before re-checking shutdown so close()
            // either waits for it or it never starts
            let guard = self.conns.enter();
            if self.is_closed() {
                return Ok(());
            }

            let connection = match Connection::new(
                stream,
                Arc::clone(&self.handler),
                self.config.clone(),
                self.shutdown.clone(),
            ) {
                Ok(c) => c,
                Err(e) => {
                    self.log(format_args!("Error setting up connection from {}: {}", peer, e));
                    continue;
                }
            };

            let spawned = thread::Builder::new()
                .name(format!("respwire-conn-{}", peer))
                .spawn(move || run_connection(connection, guard));
            if let Err(e) = spawned {
                self.log(format_args!("Error spawning connection thread: {}", e));
            }
        }
    }

    /// Stop accepting, then wait for every live connection to finish
    ///
    /// Safe to call more than once. Must not be called from inside a handler,
    /// since it waits for that handler's own connection.
    pub fn close(&self) {
        if let Some(stop) = self.stop.lock().take() {
            drop(stop);
            for listener in self.listeners.lock().iter() {
                self.close_listener(listener);
            }
        }
        self.conns.wait_idle();
    }

    fn close_listener(&self, listener: &InterruptListener) {
        if let Err(e) = listener.close() {
            self.log(format_args!("Error closing listener: {}", e));
        }
    }

    fn log(&self, args: std::fmt::Arguments<'_>) {
        self.config.logger.log(args);
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.close();
    }
}

/// How long to wait before accepting again, or `None` if `serve` should
/// give up. Temporary errors (out of descriptors, a peer that reset before
/// accept) back off exponentially.
fn accept_retry(err: &RespError, prev: Option<Duration>) -> Option<Duration> {
    match err.transport_kind() {
        Some(TransportKind::Temporary) | Some(TransportKind::Timeout) => Some(
            prev.map_or(ACCEPT_BACKOFF_MIN, |d| (d * 2).min(ACCEPT_BACKOFF_MAX)),
        ),
        _ => None,
    }
}

/// Connection thread body; a panic is logged and the connection dropped
fn run_connection(mut connection: Connection, guard: ConnGuard) {
    let peer = connection.peer_addr().to_string();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| connection.run()));
    if let Err(panic) = result {
        tracing::error!(panic = %PanicMessage::from(panic), peer_addr = %peer, "connection thread panicked");
    }
    drop(guard);
}
