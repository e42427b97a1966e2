//! Byte sources for the decoder
//!
//! The decoder needs three primitives from its input: read one byte, push
//! that byte back, and read up to a delimiter. [`ByteReader`] provides them
//! over any [`Read`] implementation.

use std::io::{self, BufRead, BufReader, Read};

/// Input consumed by the decoder
pub trait ByteSource {
    /// Read a single byte. End of input is an `UnexpectedEof` error.
    fn read_byte(&mut self) -> io::Result<u8>;

    /// Push back the byte returned by the immediately preceding `read_byte`
    fn unread_byte(&mut self) -> io::Result<()>;

    /// Append bytes to `buf` up to and including `delim`
    ///
    /// Returns the number of bytes appended; the last byte is not `delim`
    /// only when input ended first.
    fn read_until(&mut self, delim: u8, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Fill `buf` completely or fail with `UnexpectedEof`
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

/// Buffered reader with single-byte pushback
pub struct ByteReader<R> {
    inner: BufReader<R>,

    /// Last byte handed out, available for one `unread_byte`
    last: Option<u8>,

    /// Whether `last` has been pushed back and not yet re-read
    pushed: bool,
}

impl<R: Read> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            last: None,
            pushed: false,
        }
    }

    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
            last: None,
            pushed: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Unwrap the underlying reader. Buffered bytes are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    /// Take the pushed-back byte, if any
    fn take_pushed(&mut self) -> Option<u8> {
        if self.pushed {
            self.pushed = false;
            self.last
        } else {
            None
        }
    }
}

impl<R: Read> ByteSource for ByteReader<R> {
    fn read_byte(&mut self) -> io::Result<u8> {
        if let Some(b) = self.take_pushed() {
            return Ok(b);
        }

        let b = loop {
            match self.inner.fill_buf() {
                Ok([]) => {
                    self.last = None;
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                Ok(buf) => break buf[0],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.last = None;
                    return Err(e);
                }
            }
        };
        self.inner.consume(1);
        self.last = Some(b);
        Ok(b)
    }

    fn unread_byte(&mut self) -> io::Result<()> {
        match self.last {
            Some(_) if !self.pushed => {
                self.pushed = true;
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Other,
                "ByteReader: last operation was not a read",
            )),
        }
    }

    fn read_until(&mut self, delim: u8, buf: &mut Vec<u8>) -> io::Result<usize> {
        let start = buf.len();
        if let Some(b) = self.take_pushed() {
            buf.push(b);
            if b == delim {
                return Ok(1);
            }
        }

        let result = self.inner.read_until(delim, buf);
        self.last = buf[start..].last().copied();
        result.map(|_| buf.len() - start)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;
        if !buf.is_empty() {
            if let Some(b) = self.take_pushed() {
                buf[0] = b;
                filled = 1;
            }
        }

        let result = self.inner.read_exact(&mut buf[filled..]);
        self.last = match result {
            Ok(()) => buf.last().copied(),
            Err(_) => None,
        };
        result
    }
}
