//! Response writer
//!
//! Handlers answer a request through a [`ResponseWriter`], which buffers the
//! encoded reply in memory until the connection loop flushes it.

use crate::error::{RespError, Result};
use crate::protocol::{Encoder, ToWire, Wire};

/// Whether the current request has been answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// No response written yet
    Open,

    /// A response is buffered; further writes fail
    Committed,
}

/// Single-shot response buffer for one request cycle
#[derive(Debug)]
pub struct ResponseWriter {
    buf: Vec<u8>,
    state: WriteState,

    /// Hang up after the buffered response is flushed
    closed: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: WriteState::Open,
            closed: false,
        }
    }

    /// Encode `value` as the response
    ///
    /// Fails with [`RespError::ResponseCommitted`] once a response has been
    /// written or the writer has been closed. An encode failure leaves the
    /// buffer empty and the writer open.
    pub fn write<T: ToWire + ?Sized>(&mut self, value: &T) -> Result<()> {
        self.ensure_open()?;
        let result = Encoder::new(&mut self.buf).encode(value);
        self.settle(result)
    }

    /// Write an already-built wire representation as the response
    pub fn write_wire(&mut self, wire: Wire) -> Result<()> {
        self.ensure_open()?;
        let result = Encoder::new(&mut self.buf).encode_wire(wire);
        self.settle(result)
    }

    /// Mark the connection for hang-up once the current response is flushed
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn is_committed(&self) -> bool {
        self.state == WriteState::Committed
    }

    /// Encoded response bytes waiting to be flushed
    pub fn buffered(&self) -> &[u8] {
        &self.buf
    }

    /// Drop any buffered response and reopen for writing
    pub(crate) fn reset(&mut self) {
        self.buf.clear();
        self.state = WriteState::Open;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed || self.state == WriteState::Committed {
            return Err(RespError::ResponseCommitted);
        }
        Ok(())
    }

    fn settle(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                if !self.buf.is_empty() {
                    self.state = WriteState::Committed;
                }
                Ok(())
            }
            Err(err) => {
                self.buf.clear();
                Err(err)
            }
        }
    }
}
