//! Connection Handler
//!
//! Runs the read → dispatch → flush loop for one client.

use std::io::Write;
use std::net::{Shutdown as SocketShutdown, TcpStream};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::{RespError, Result, TransportKind};
use crate::protocol::{AsError, ByteReader, Decoder, Kind};

use super::deadline::{DeadlineStream, Direction};
use super::handler::Handler;
use super::server::Shutdown;
use super::writer::ResponseWriter;

/// What the loop does after an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Continue,
    Close,
}

/// Reaction to a request that failed to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadFailure {
    /// Reply with CONNERR and keep the connection
    Retry,

    /// Hang up without a reply
    Close,
}

/// Handles a single client connection
pub(crate) struct Connection {
    /// TCP stream reader (buffered, with pushback)
    reader: ByteReader<DeadlineStream>,

    /// TCP stream writer
    writer: DeadlineStream,

    handler: Arc<dyn Handler>,
    config: ServerConfig,
    decoder: Decoder,
    shutdown: Shutdown,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub(crate) fn new(
        stream: TcpStream,
        handler: Arc<dyn Handler>,
        config: ServerConfig,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: ByteReader::new(DeadlineStream::new(read_stream, Direction::Read)),
            writer: DeadlineStream::new(stream, Direction::Write),
            handler,
            decoder: Decoder::with_max_depth(config.max_depth),
            config,
            shutdown,
            peer_addr,
        })
    }

    /// Get the peer address string
    pub(crate) fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns when the client disconnects, a fatal transport error occurs,
    /// the handler hangs up, or the server shuts down.
    pub(crate) fn run(&mut self) {
        self.log(format_args!("{}: Connection received", self.peer_addr));

        let mut w = ResponseWriter::new();
        loop {
            w.reset();

            if self.shutdown.is_shutdown() {
                break;
            }

            // Both deadlines cover the whole request cycle
            self.reader.get_mut().arm(self.config.read_timeout);
            self.writer.arm(self.config.write_timeout);

            if let Next::Close = self.iterate(&mut w) {
                break;
            }
        }

        if let Err(e) = self.writer.get_ref().shutdown(SocketShutdown::Both) {
            tracing::debug!("Error closing connection to {}: {}", self.peer_addr, e);
        }
        tracing::debug!("Connection to {} closed", self.peer_addr);
    }

    /// One request cycle: read a frame, dispatch it, flush the response
    fn iterate(&mut self, w: &mut ResponseWriter) -> Next {
        let request = self.decoder.decode(&mut self.reader);

        if let Some(err) = request.error() {
            match read_failure(err, request.is(Kind::Invalid)) {
                Some(ReadFailure::Close) => {
                    tracing::debug!("Closing {} after read error: {}", self.peer_addr, err);
                    return Next::Close;
                }
                Some(ReadFailure::Retry) => return self.reply_connerr(w, err),
                None => {}
            }
        }

        tracing::trace!("Received request from {}: {:?}", self.peer_addr, request);

        if let Err(e) = self.handler.serve(w, request) {
            w.reset();
            if let Err(werr) = w.write(&AsError(format!("SERVERERR {}", e))) {
                self.log(format_args!("Error marshaling SERVERERR: {}", werr));
            }
            self.log(format_args!(
                "Error from handler for {} - hanging up connection: {}",
                self.peer_addr, e
            ));
            w.close();
        }

        self.flush(w)
    }

    /// Tell the client about a recoverable read error, then carry on
    fn reply_connerr(&mut self, w: &mut ResponseWriter, err: &RespError) -> Next {
        if let Err(e) = w.write(&AsError(format!("CONNERR {}", err))) {
            tracing::warn!("Error encoding CONNERR for {}: {}", self.peer_addr, e);
        }
        self.flush(w)
    }

    /// Write the buffered response; write errors are classified like read errors
    fn flush(&mut self, w: &ResponseWriter) -> Next {
        let buf = w.buffered();
        if !buf.is_empty() {
            let result = self.writer.write_all(buf).and_then(|()| self.writer.flush());
            if let Err(e) = result {
                let err = RespError::from(e);
                if err.transport_kind() == Some(TransportKind::Timeout) {
                    tracing::debug!("Write timeout for client {}", self.peer_addr);
                } else {
                    self.log(format_args!("Write error: {}", err));
                }
                return write_failure(&err, w.is_closed());
            }
        }

        if w.is_closed() {
            Next::Close
        } else {
            Next::Continue
        }
    }

    fn log(&self, args: std::fmt::Arguments<'_>) {
        self.config.logger.log(args);
    }
}

/// Classify a decode error. `None` means the value goes to the handler.
fn read_failure(err: &RespError, invalid: bool) -> Option<ReadFailure> {
    match err.transport_kind() {
        Some(TransportKind::Temporary) => Some(ReadFailure::Retry),
        Some(TransportKind::Timeout) | Some(TransportKind::Fatal) => Some(ReadFailure::Close),
        None if invalid => Some(ReadFailure::Close),
        None => None,
    }
}

/// Classify a failed flush; a temporary error keeps the connection unless
/// the handler already asked to hang up
fn write_failure(err: &RespError, closed: bool) -> Next {
    match err.transport_kind() {
        Some(TransportKind::Temporary) if !closed => Next::Continue,
        _ => Next::Close,
    }
}
