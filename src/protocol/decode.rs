//! Wire decoder
//!
//! Turns a byte stream into [`Value`]s, one frame per call.
//!
//! Arrays are decoded with an explicit stack rather than recursion, so nesting
//! is bounded by [`Decoder::max_depth`] instead of by the call stack.

use std::io;

use bytes::Bytes;

use super::reader::ByteSource;
use super::value::Value;
use crate::error::{RespError, Result};

/// Default maximum array nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Bulk payloads are read in chunks of this size so a hostile size header
/// cannot force one huge allocation up front.
const BULK_CHUNK: usize = 64 * 1024;

/// Initial capacity cap for array element vectors
const ARRAY_PREALLOC: usize = 1024;

/// Decodes frames from a [`ByteSource`]
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Result of reading one frame header
enum Header {
    /// A complete scalar frame (or an error)
    Done(Value),

    /// An array frame announcing this many elements
    Array(usize),
}

/// An array whose elements are still being read
struct Pending {
    items: Vec<Value>,
    len: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Decode exactly one frame
    ///
    /// Never fails outright: malformed input yields an `Invalid` value whose
    /// [`error`](Value::error) explains why. A well-formed error frame yields
    /// an `Error` value that also carries its text as the error.
    pub fn decode<S: ByteSource + ?Sized>(&self, src: &mut S) -> Value {
        let mut stack: Vec<Pending> = Vec::new();

        loop {
            let mut value = match read_header(src) {
                Header::Done(value) => value,
                Header::Array(len) => {
                    if stack.len() >= self.max_depth {
                        return Value::invalid(RespError::NestingTooDeep {
                            max: self.max_depth,
                        });
                    }
                    if len == 0 {
                        Value::array(Vec::new())
                    } else {
                        stack.push(Pending {
                            items: Vec::with_capacity(len.min(ARRAY_PREALLOC)),
                            len,
                        });
                        continue;
                    }
                }
            };

            // A failed element aborts every enclosing array
            if let Some(err) = value.error() {
                if !stack.is_empty() {
                    return Value::invalid(err.clone());
                }
                return value;
            }

            loop {
                let Some(mut top) = stack.pop() else {
                    return value;
                };
                top.items.push(value);
                if top.items.len() < top.len {
                    stack.push(top);
                    break;
                }
                value = Value::array(top.items);
            }
        }
    }
}

/// Decode one frame with the default nesting limit
pub fn decode<S: ByteSource + ?Sized>(src: &mut S) -> Value {
    Decoder::default().decode(src)
}

// =============================================================================
// Frame Readers
// =============================================================================

fn read_header<S: ByteSource + ?Sized>(src: &mut S) -> Header {
    let b = match src.read_byte() {
        Ok(b) => b,
        Err(e) => return Header::Done(Value::invalid(eof_aware(e))),
    };

    let value = match b {
        b'+' => read_simple_string(src).map(|line| Value::simple(Bytes::from(line))),
        b'-' => read_simple_string(src)
            .map(|line| Value::error_reply(String::from_utf8_lossy(&line).into_owned())),
        b':' => read_integer(src).map(Value::integer),
        b'$' => read_bulk(src),
        b'*' => match read_array_len(src) {
            Ok(Some(len)) => return Header::Array(len),
            Ok(None) => Ok(Value::nil()),
            Err(e) => Err(e),
        },
        other => {
            if let Err(e) = src.unread_byte() {
                tracing::warn!("Error unreading byte: {}", e);
            }
            Err(RespError::BadTypeCharacter(other))
        }
    };

    Header::Done(value.unwrap_or_else(Value::invalid))
}

/// Map end-of-input to the protocol's own error; other I/O errors stay transport errors
fn eof_aware(err: io::Error) -> RespError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        RespError::UnexpectedEof
    } else {
        err.into()
    }
}

/// Read a CRLF-terminated line that contains no other CR or LF
fn read_simple_string<S: ByteSource + ?Sized>(src: &mut S) -> Result<Vec<u8>> {
    // read_until keeps reading across short reads until it sees CR or input ends
    let mut line = Vec::new();
    src.read_until(b'\r', &mut line).map_err(eof_aware)?;

    if line.contains(&b'\n') {
        return Err(RespError::MalformedSimpleString);
    }
    if line.last() != Some(&b'\r') {
        return Err(RespError::UnexpectedEof);
    }

    match src.read_byte().map_err(eof_aware)? {
        b'\n' => {
            line.pop();
            Ok(line)
        }
        _ => Err(RespError::MalformedSimpleString),
    }
}

/// Parse a signed decimal line. Accumulation wraps on overflow.
fn read_integer<S: ByteSource + ?Sized>(src: &mut S) -> Result<i64> {
    let line = read_simple_string(src)?;
    parse_integer(&line)
}

pub(crate) fn parse_integer(line: &[u8]) -> Result<i64> {
    let (negative, digits) = match line.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, line),
    };
    if digits.is_empty() {
        return Err(RespError::MalformedInteger);
    }

    let mut n: i64 = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return Err(RespError::MalformedInteger);
        }
        n = n.wrapping_mul(10).wrapping_add(i64::from(d - b'0'));
    }

    Ok(if negative { n.wrapping_neg() } else { n })
}

fn read_bulk<S: ByteSource + ?Sized>(src: &mut S) -> Result<Value> {
    let size = read_integer(src)?;
    if size == -1 {
        return Ok(Value::nil());
    }
    let size = usize::try_from(size).map_err(|_| RespError::BadSize)?;

    let mut buf = Vec::with_capacity(size.min(BULK_CHUNK));
    while buf.len() < size {
        let start = buf.len();
        let chunk = (size - start).min(BULK_CHUNK);
        buf.resize(start + chunk, 0);
        src.read_exact(&mut buf[start..]).map_err(eof_aware)?;
    }

    read_crlf(src)?;
    Ok(Value::bulk(Bytes::from(buf)))
}

/// Consume the CRLF trailing a bulk payload
fn read_crlf<S: ByteSource + ?Sized>(src: &mut S) -> Result<()> {
    if src.read_byte().map_err(eof_aware)? != b'\r' {
        return Err(RespError::MalformedBulkString);
    }
    if src.read_byte().map_err(eof_aware)? != b'\n' {
        return Err(RespError::NoCrlf);
    }
    Ok(())
}

/// Array header: `Some(len)` for a counted array, `None` for the null array
fn read_array_len<S: ByteSource + ?Sized>(src: &mut S) -> Result<Option<usize>> {
    match read_integer(src)? {
        -1 => Ok(None),
        n => usize::try_from(n).map(Some).map_err(|_| RespError::BadSize),
    }
}
