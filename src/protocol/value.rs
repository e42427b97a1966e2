//! Decoded protocol values
//!
//! A [`Value`] is the in-memory form of one decoded frame: a [`Kind`] tag, a
//! payload matching the tag, and an optional decode error.

use std::fmt;

use bytes::Bytes;

use crate::error::{RespError, Result};

/// Frame kind of a decoded value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    SimpleString,
    BulkString,
    Error,
    Integer,
    Array,
    Nil,
    Invalid,
}

impl Kind {
    /// Simple and bulk strings share the "string" category
    pub fn is_string(self) -> bool {
        matches!(self, Kind::SimpleString | Kind::BulkString)
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::SimpleString => "SimpleString",
            Kind::BulkString => "BulkString",
            Kind::Error => "Error",
            Kind::Integer => "Integer",
            Kind::Array => "Array",
            Kind::Nil => "Nil",
            Kind::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload storage, matched to the kind tag
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Payload {
    Bytes(Bytes),
    Integer(i64),
    Array(Vec<Value>),
    Error(String),
    Empty,
}

/// One decoded frame
///
/// Values are built only by the decoder and are immutable afterwards.
#[derive(Debug, Clone)]
pub struct Value {
    kind: Kind,
    payload: Payload,
    error: Option<RespError>,
}

impl Value {
    // =========================================================================
    // Construction (decoder only)
    // =========================================================================

    pub(crate) fn simple(bytes: Bytes) -> Self {
        Self::new(Kind::SimpleString, Payload::Bytes(bytes))
    }

    pub(crate) fn bulk(bytes: Bytes) -> Self {
        Self::new(Kind::BulkString, Payload::Bytes(bytes))
    }

    pub(crate) fn integer(i: i64) -> Self {
        Self::new(Kind::Integer, Payload::Integer(i))
    }

    pub(crate) fn array(items: Vec<Value>) -> Self {
        Self::new(Kind::Array, Payload::Array(items))
    }

    pub(crate) fn nil() -> Self {
        Self::new(Kind::Nil, Payload::Empty)
    }

    /// A well-formed error frame: the text is both payload and decode error
    pub(crate) fn error_reply(message: String) -> Self {
        Self {
            kind: Kind::Error,
            error: Some(RespError::Reply(message.clone())),
            payload: Payload::Error(message),
        }
    }

    pub(crate) fn invalid(err: RespError) -> Self {
        Self {
            kind: Kind::Invalid,
            payload: Payload::Empty,
            error: Some(err),
        }
    }

    fn new(kind: Kind, payload: Payload) -> Self {
        Self {
            kind,
            payload,
            error: None,
        }
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is(&self, kind: Kind) -> bool {
        self.kind == kind
    }

    pub fn is_string(&self) -> bool {
        self.kind.is_string()
    }

    pub fn is_nil(&self) -> bool {
        self.kind == Kind::Nil
    }

    /// Decode error carried by this value, if any
    ///
    /// Set for every `Invalid` value and for every `Error` value.
    pub fn error(&self) -> Option<&RespError> {
        self.error.as_ref()
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Borrow the raw string payload without copying
    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) if self.kind.is_string() => Some(b),
            _ => None,
        }
    }

    fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Typed Accessors
    // =========================================================================

    /// Copy of the string payload. Nil yields `None`.
    pub fn as_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.check()?;
        if self.is_nil() {
            return Ok(None);
        }
        self.as_slice()
            .map(|b| Some(b.to_vec()))
            .ok_or(RespError::WrongType)
    }

    /// String payload as text. Nil yields an empty string.
    pub fn as_str(&self) -> Result<String> {
        self.check()?;
        if self.is_nil() {
            return Ok(String::new());
        }
        let bytes = self.as_slice().ok_or(RespError::WrongType)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| RespError::InvalidUtf8)
    }

    pub fn as_int(&self) -> Result<i64> {
        self.check()?;
        match self.payload {
            Payload::Integer(i) if self.kind == Kind::Integer => Ok(i),
            _ => Err(RespError::WrongType),
        }
    }

    /// Elements of an array value
    ///
    /// A non-array value is returned as a single-element array so scalar
    /// replies can be consumed the same way as array replies.
    pub fn as_array(&self) -> Result<Vec<Value>> {
        self.check()?;
        match &self.payload {
            Payload::Array(items) if self.kind == Kind::Array => Ok(items.clone()),
            _ => Ok(vec![self.clone()]),
        }
    }

    /// Owned variant of [`as_array`](Self::as_array)
    pub fn into_array(self) -> Result<Vec<Value>> {
        self.check()?;
        match self.payload {
            Payload::Array(items) if self.kind == Kind::Array => Ok(items),
            _ => Ok(vec![self]),
        }
    }

    /// Every element projected with [`as_bytes`](Self::as_bytes); Nil elements become empty
    pub fn as_bytes_list(&self) -> Result<Vec<Vec<u8>>> {
        self.as_array()?
            .iter()
            .map(|v| v.as_bytes().map(Option::unwrap_or_default))
            .collect()
    }

    /// Every element projected with [`as_str`](Self::as_str)
    pub fn as_string_list(&self) -> Result<Vec<String>> {
        self.as_array()?.iter().map(Value::as_str).collect()
    }

    /// Borrowed array elements; `None` for non-array values
    pub fn items(&self) -> Option<&[Value]> {
        match &self.payload {
            Payload::Array(items) if self.kind == Kind::Array => Some(items),
            _ => None,
        }
    }
}

/// The default value is Nil
impl Default for Value {
    fn default() -> Self {
        Value::nil()
    }
}

impl PartialEq for Value {
    /// Two values are equal when kind and payload match. Carried errors are
    /// compared only by presence.
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.payload == other.payload
            && self.error.is_some() == other.error.is_some()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{:?}", s),
                Err(_) => write!(f, "{:?}", b),
            },
            Payload::Integer(i) => write!(f, "(integer) {}", i),
            Payload::Error(msg) => write!(f, "(error) {}", msg),
            Payload::Array(items) if items.is_empty() => f.write_str("(empty array)"),
            Payload::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", i + 1, item)?;
                }
                Ok(())
            }
            Payload::Empty if self.kind == Kind::Nil => f.write_str("(nil)"),
            Payload::Empty => match &self.error {
                Some(err) => write!(f, "(invalid) {}", err),
                None => f.write_str("(invalid)"),
            },
        }
    }
}
