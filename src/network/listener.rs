//! Interruptible listener
//!
//! A blocking `accept` on a std `TcpListener` cannot be cancelled from
//! another thread. [`InterruptListener`] marks itself closed and then connects
//! to its own address, which wakes the blocked `accept`; the woken accept
//! sees the closed flag and returns [`RespError::ListenerClosed`].

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{RespError, Result};

/// How long `close` waits for its wake-up connection
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP listener whose blocked `accept` can be interrupted by `close`
#[derive(Debug)]
pub struct InterruptListener {
    inner: TcpListener,
    addr: SocketAddr,
    closed: AtomicBool,
}

impl InterruptListener {
    pub fn new(inner: TcpListener) -> Result<Self> {
        let addr = inner.local_addr()?;
        Ok(Self {
            inner,
            addr,
            closed: AtomicBool::new(false),
        })
    }

    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::new(TcpListener::bind(addr)?)
    }

    /// Wait for the next connection
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        if self.is_closed() {
            return Err(RespError::ListenerClosed);
        }
        let accepted = self.inner.accept();
        // The connection that woke us may be the close() wake-up
        if self.is_closed() {
            return Err(RespError::ListenerClosed);
        }
        Ok(accepted?)
    }

    /// Close the listener. Only the first call has any effect.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Wake a blocked accept. Failure only means nobody was waiting.
        if let Err(e) = TcpStream::connect_timeout(&self.wake_addr(), WAKE_TIMEOUT) {
            tracing::debug!("Listener wake-up connect to {} failed: {}", self.addr, e);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Bound address; `None` once closed
    pub fn local_addr(&self) -> Option<SocketAddr> {
        if self.is_closed() {
            None
        } else {
            Some(self.addr)
        }
    }

    /// Unspecified bind addresses are reached through loopback
    fn wake_addr(&self) -> SocketAddr {
        let ip = match self.addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.addr.port())
    }
}

/// Conversion into a shared interruptible listener
///
/// Wrapping is idempotent: an `InterruptListener` is used as-is.
pub trait IntoListener {
    fn into_listener(self) -> Result<Arc<InterruptListener>>;
}

impl IntoListener for TcpListener {
    fn into_listener(self) -> Result<Arc<InterruptListener>> {
        InterruptListener::new(self).map(Arc::new)
    }
}

impl IntoListener for InterruptListener {
    fn into_listener(self) -> Result<Arc<InterruptListener>> {
        Ok(Arc::new(self))
    }
}

impl IntoListener for Arc<InterruptListener> {
    fn into_listener(self) -> Result<Arc<InterruptListener>> {
        Ok(self)
    }
}
