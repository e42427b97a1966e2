//! Wire encoder
//!
//! Application values reach the wire in two steps: the value converts itself
//! into a [`Wire`] through the [`ToWire`] capability, and the [`Encoder`]
//! writes that `Wire` as frames.
//!
//! ```text
//! T: ToWire ──to_wire()──► Wire ──Encoder──► $5\r\nKey 2\r\n
//!                           │
//!                           └─ Wire::Convert(..) ──to_wire()──► Wire  (≤ 32 hops)
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::hash::BuildHasher;
use std::io::Write;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use super::value::{Payload, Value};
use crate::error::{RespError, Result};
use crate::panic::recover;

/// Maximum number of chained `Wire::Convert` hops for one value
pub const MAX_CONVERSIONS: usize = 32;

/// Nanoseconds per second
const NANOS_PER_SEC: i128 = 1_000_000_000;

// =============================================================================
// Wire Representation
// =============================================================================

/// Everything the encoder knows how to put on the wire
pub enum Wire {
    /// `$-1\r\n`
    Nil,

    /// Bulk string
    Bulk(Bytes),

    Integer(i64),

    /// Integer frame for values beyond `i64::MAX`
    Unsigned(u64),

    /// Fixed-point text as a bulk string, trailing zeros stripped
    Float(f64),

    Array(Vec<Wire>),

    /// Error frame; the message may not contain CR or LF
    Error(String),

    /// Canonical duration text as a bulk string
    Duration(Duration),

    /// Two-element array of (seconds, nanoseconds) since the Unix epoch
    Time(SystemTime),

    /// Rendered text as a bulk string
    Text(String),

    /// A decoded value, re-encoded from its payload
    Value(Value),

    /// Flattened into an alternating key, value array
    Map(Vec<(Wire, Wire)>),

    /// Deferred conversion, resolved by calling `to_wire` again
    Convert(Box<dyn ToWire + Send>),
}

impl Wire {
    /// Bulk string holding the `Display` text of `value`
    pub fn text(value: impl fmt::Display) -> Self {
        Wire::Text(value.to_string())
    }

    /// Error frame holding the message of `err`
    pub fn error(err: &(dyn std::error::Error + '_)) -> Self {
        Wire::Error(err.to_string())
    }

    pub fn convert(value: impl ToWire + Send + 'static) -> Self {
        Wire::Convert(Box::new(value))
    }
}

impl fmt::Debug for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wire::Nil => f.write_str("Nil"),
            Wire::Bulk(b) => f.debug_tuple("Bulk").field(b).finish(),
            Wire::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Wire::Unsigned(u) => f.debug_tuple("Unsigned").field(u).finish(),
            Wire::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Wire::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Wire::Error(msg) => f.debug_tuple("Error").field(msg).finish(),
            Wire::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Wire::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Wire::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Wire::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Wire::Map(pairs) => f.debug_tuple("Map").field(pairs).finish(),
            Wire::Convert(c) => f.debug_tuple("Convert").field(&c.type_name()).finish(),
        }
    }
}

// =============================================================================
// ToWire Capability
// =============================================================================

/// Conversion of an application value into its wire representation
pub trait ToWire {
    fn to_wire(&self) -> Result<Wire>;

    /// Name used in error reports
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Representation of a slice of `Self`. Arrays by default; `u8`
    /// overrides this so byte slices become bulk strings.
    #[doc(hidden)]
    fn slice_to_wire(items: &[Self]) -> Result<Wire>
    where
        Self: Sized,
    {
        items.iter().map(ToWire::to_wire).collect::<Result<_>>().map(Wire::Array)
    }
}

impl<T: ToWire + ?Sized> ToWire for &T {
    fn to_wire(&self) -> Result<Wire> {
        (**self).to_wire()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: ToWire + ?Sized> ToWire for Box<T> {
    fn to_wire(&self) -> Result<Wire> {
        (**self).to_wire()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

impl<T: ToWire> ToWire for Option<T> {
    fn to_wire(&self) -> Result<Wire> {
        match self {
            Some(v) => v.to_wire(),
            None => Ok(Wire::Nil),
        }
    }
}

impl ToWire for () {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Nil)
    }
}

impl ToWire for str {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Bulk(Bytes::copy_from_slice(self.as_bytes())))
    }
}

impl ToWire for String {
    fn to_wire(&self) -> Result<Wire> {
        self.as_str().to_wire()
    }
}

impl ToWire for Bytes {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Bulk(self.clone()))
    }
}

impl ToWire for u8 {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Integer(i64::from(*self)))
    }

    fn slice_to_wire(items: &[Self]) -> Result<Wire> {
        Ok(Wire::Bulk(Bytes::copy_from_slice(items)))
    }
}

macro_rules! lossless_to_wire {
    ($($t:ty),*) => {$(
        impl ToWire for $t {
            fn to_wire(&self) -> Result<Wire> {
                Ok(Wire::Integer(i64::from(*self)))
            }
        }
    )*};
}

lossless_to_wire!(i8, i16, i32, i64, u16, u32);

impl ToWire for isize {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Integer(*self as i64))
    }
}

impl ToWire for u64 {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Unsigned(*self))
    }
}

impl ToWire for usize {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Unsigned(*self as u64))
    }
}

impl ToWire for bool {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Integer(i64::from(*self)))
    }
}

impl ToWire for f64 {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Float(*self))
    }
}

impl ToWire for f32 {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Float(f64::from(*self)))
    }
}

impl ToWire for Duration {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Duration(*self))
    }
}

impl ToWire for SystemTime {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Time(*self))
    }
}

impl ToWire for Value {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Value(self.clone()))
    }
}

impl ToWire for RespError {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::error(self))
    }
}

impl<T: ToWire> ToWire for [T] {
    fn to_wire(&self) -> Result<Wire> {
        T::slice_to_wire(self)
    }
}

impl<T: ToWire, const N: usize> ToWire for [T; N] {
    fn to_wire(&self) -> Result<Wire> {
        T::slice_to_wire(self)
    }
}

impl<T: ToWire> ToWire for Vec<T> {
    fn to_wire(&self) -> Result<Wire> {
        T::slice_to_wire(self)
    }
}

impl<T: ToWire> ToWire for VecDeque<T> {
    fn to_wire(&self) -> Result<Wire> {
        self.iter().map(ToWire::to_wire).collect::<Result<_>>().map(Wire::Array)
    }
}

/// Iteration order of a `HashMap` is not stable between encodes
impl<K: ToWire, V: ToWire, S: BuildHasher> ToWire for HashMap<K, V, S> {
    fn to_wire(&self) -> Result<Wire> {
        map_to_wire(self.iter())
    }
}

impl<K: ToWire, V: ToWire> ToWire for BTreeMap<K, V> {
    fn to_wire(&self) -> Result<Wire> {
        map_to_wire(self.iter())
    }
}

fn map_to_wire<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Result<Wire>
where
    K: ToWire + 'a,
    V: ToWire + 'a,
{
    entries
        .map(|(k, v)| -> Result<(Wire, Wire)> { Ok((k.to_wire()?, v.to_wire()?)) })
        .collect::<Result<_>>()
        .map(Wire::Map)
}

/// Encodes the `Display` text of the inner value as a bulk string
#[derive(Debug, Clone)]
pub struct AsText<T>(pub T);

impl<T: fmt::Display> ToWire for AsText<T> {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::text(&self.0))
    }
}

/// Encodes the message of the inner error as an error frame
#[derive(Debug, Clone)]
pub struct AsError<E>(pub E);

impl<E: fmt::Display> ToWire for AsError<E> {
    fn to_wire(&self) -> Result<Wire> {
        Ok(Wire::Error(self.0.to_string()))
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Writes values to a sink as frames
///
/// The first failure is sticky: every later call returns the same error
/// without touching the sink.
pub struct Encoder<W> {
    writer: W,
    err: Option<RespError>,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode one value
    pub fn encode<T: ToWire + ?Sized>(&mut self, value: &T) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let result = call_to_wire(value).and_then(|wire| self.write_wire(wire));
        self.remember(result)
    }

    /// Encode an already-built wire representation
    pub fn encode_wire(&mut self, wire: Wire) -> Result<()> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let result = self.write_wire(wire);
        self.remember(result)
    }

    fn remember(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            self.err = Some(err.clone());
        }
        result
    }

    fn write_wire(&mut self, wire: Wire) -> Result<()> {
        match resolve(wire)? {
            Wire::Nil => self.put(b"$-1\r\n"),
            Wire::Bulk(b) => self.put_bulk(&b),
            Wire::Integer(i) => self.put_fmt(format_args!(":{}\r\n", i)),
            Wire::Unsigned(u) => self.put_fmt(format_args!(":{}\r\n", u)),
            Wire::Float(x) => self.put_bulk(format_float(x).as_bytes()),
            Wire::Array(items) => {
                self.put_fmt(format_args!("*{}\r\n", items.len()))?;
                items.into_iter().try_for_each(|item| self.write_wire(item))
            }
            Wire::Error(msg) => {
                if msg.contains(['\r', '\n']) {
                    return Err(RespError::MalformedSimpleString);
                }
                self.put_fmt(format_args!("-{}\r\n", msg))
            }
            Wire::Duration(d) => self.put_bulk(format!("{:?}", d).as_bytes()),
            Wire::Time(t) => {
                let (secs, nanos) = unix_parts(t);
                self.put_fmt(format_args!("*2\r\n:{}\r\n:{}\r\n", secs, nanos))
            }
            Wire::Text(s) => self.put_bulk(s.as_bytes()),
            Wire::Value(v) => self.write_value(&v),
            Wire::Map(pairs) => {
                self.put_fmt(format_args!("*{}\r\n", pairs.len() * 2))?;
                pairs.into_iter().try_for_each(|(k, v)| {
                    self.write_wire(k)?;
                    self.write_wire(v)
                })
            }
            // resolve() never hands back a Convert
            Wire::Convert(_) => Err(RespError::TooManyConversions),
        }
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value.payload() {
            Payload::Bytes(b) => self.put_bulk(b),
            Payload::Integer(i) => self.write_wire(Wire::Integer(*i)),
            Payload::Error(msg) => self.write_wire(Wire::Error(msg.clone())),
            Payload::Array(items) => {
                self.put_fmt(format_args!("*{}\r\n", items.len()))?;
                items.iter().try_for_each(|item| self.write_value(item))
            }
            Payload::Empty if value.is_nil() => self.put(b"$-1\r\n"),
            Payload::Empty => Err(value
                .error()
                .cloned()
                .unwrap_or_else(|| RespError::UnsupportedType("invalid Value".to_string()))),
        }
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn put_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<()> {
        self.writer.write_fmt(args)?;
        Ok(())
    }

    fn put_bulk(&mut self, bytes: &[u8]) -> Result<()> {
        self.put_fmt(format_args!("${}\r\n", bytes.len()))?;
        self.put(bytes)?;
        self.put(b"\r\n")
    }
}

/// Encode one value into a fresh buffer
pub fn encode_to_vec<T: ToWire + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// Follow `Wire::Convert` hops until a concrete representation appears
fn resolve(mut wire: Wire) -> Result<Wire> {
    let mut hops = 0;
    while let Wire::Convert(inner) = wire {
        hops += 1;
        if hops > MAX_CONVERSIONS {
            return Err(RespError::TooManyConversions);
        }
        wire = call_to_wire(&*inner)?;
    }
    Ok(wire)
}

/// Call application conversion code, turning a panic into an encode error
fn call_to_wire<T: ToWire + ?Sized>(value: &T) -> Result<Wire> {
    recover("ToWire::to_wire", || value.to_wire()).unwrap_or_else(|message| {
        Err(RespError::EncodePanic {
            type_name: value.type_name(),
            message,
        })
    })
}

/// Fixed-point text with trailing zeros and a trailing decimal point removed
pub(crate) fn format_float(x: f64) -> String {
    let mut s = format!("{:.16}", x);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    s
}

/// Seconds and non-negative nanoseconds relative to the Unix epoch
fn unix_parts(t: SystemTime) -> (i64, i64) {
    let total: i128 = match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i128,
        Err(e) => -(e.duration().as_nanos() as i128),
    };
    let secs = total.div_euclid(NANOS_PER_SEC);
    let nanos = total.rem_euclid(NANOS_PER_SEC);
    (secs as i64, nanos as i64)
}
