//! Error types for respwire
//!
//! Provides a unified error type for decoding, encoding, scanning and serving.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Result type alias using RespError
pub type Result<T> = std::result::Result<T, RespError>;

/// Error returned by application handlers. Opaque to the protocol engine.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for respwire operations
///
/// Cloneable so that a decoded [`Value`](crate::protocol::Value) can carry its
/// decode error around by value.
#[derive(Debug, Clone, Error)]
pub enum RespError {
    // -------------------------------------------------------------------------
    // Decode Errors
    // -------------------------------------------------------------------------
    #[error("no CRLF found")]
    NoCrlf,

    #[error("integer response is malformed")]
    MalformedInteger,

    #[error("simple string response is malformed: contained CR or LF")]
    MalformedSimpleString,

    #[error("bulk string response is malformed: no trailing CRLF")]
    MalformedBulkString,

    #[error("bulk string response is malformed: size is negative")]
    BadSize,

    #[error("unrecognized type character {:?}", char::from(*.0))]
    BadTypeCharacter(u8),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("array nesting exceeds maximum depth of {max}")]
    NestingTooDeep { max: usize },

    // -------------------------------------------------------------------------
    // Reply Errors
    // -------------------------------------------------------------------------
    /// Text of a well-formed error frame (`-<text>\r\n`)
    #[error("{0}")]
    Reply(String),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(Arc<io::Error>),

    // -------------------------------------------------------------------------
    // Coercion Errors
    // -------------------------------------------------------------------------
    #[error("resp is not of that type")]
    WrongType,

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("Scan: array length is less than response length")]
    ArrayLength,

    #[error("Scan: response length is odd")]
    MapLength,

    #[error("resp string is not valid UTF-8")]
    InvalidUtf8,

    // -------------------------------------------------------------------------
    // Encode Errors
    // -------------------------------------------------------------------------
    #[error("cannot marshal {0} to RESP")]
    UnsupportedType(String),

    #[error("too many recursive to_wire calls")]
    TooManyConversions,

    #[error("unable to encode {type_name} as RESP: {message}")]
    EncodePanic {
        type_name: &'static str,
        message: String,
    },

    // -------------------------------------------------------------------------
    // Server Errors
    // -------------------------------------------------------------------------
    #[error("listener closed")]
    ListenerClosed,

    #[error("response already written")]
    ResponseCommitted,

    #[error("handler error: {0}")]
    Handler(String),
}

impl From<io::Error> for RespError {
    fn from(err: io::Error) -> Self {
        RespError::Io(Arc::new(err))
    }
}

/// How the transport classified an I/O failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// A read or write deadline elapsed
    Timeout,

    /// The operation may succeed if retried
    Temporary,

    /// The connection is unusable
    Fatal,
}

impl RespError {
    /// Classify a transport-level error. Returns `None` for protocol errors.
    pub fn transport_kind(&self) -> Option<TransportKind> {
        match self {
            RespError::Io(err) => Some(classify_io(err)),
            _ => None,
        }
    }

    /// True if this error came from the underlying byte source or sink
    pub fn is_transport(&self) -> bool {
        matches!(self, RespError::Io(_))
    }
}

/// Classify an I/O error the way the server loop needs it
///
/// Temporary covers errors that say nothing about the connection or
/// listener itself: interrupted calls, a peer that gave up mid-handshake or
/// reset, and exhausted descriptors or kernel buffers.
pub fn classify_io(err: &io::Error) -> TransportKind {
    match err.kind() {
        // Unix reports an elapsed socket timeout as WouldBlock, Windows as TimedOut
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportKind::Timeout,
        io::ErrorKind::Interrupted
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => TransportKind::Temporary,
        _ if is_resource_exhaustion(err) => TransportKind::Temporary,
        _ => TransportKind::Fatal,
    }
}

#[cfg(unix)]
fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::OutOfMemory
}

/// A failed coercion between a decoded value and a destination type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    /// Runtime kind of the decoded value
    pub from: &'static str,

    /// Declared type of the destination
    pub to: &'static str,
}

impl TypeError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scan: unable to coerce {} to {}", self.from, self.to)
    }
}

impl std::error::Error for TypeError {}
