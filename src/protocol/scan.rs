//! Type-directed scanning
//!
//! [`scan`] decodes one frame per destination and fills each destination
//! through the [`FromWire`] capability. Application types implement
//! `FromWire` to take full control of interpreting a [`Value`].
//!
//! ## Coercion Rules
//! | Source            | Numeric / bool destination | Text destination |
//! |-------------------|----------------------------|------------------|
//! | Integer           | widened (range-checked)    | decimal text     |
//! | Simple/Bulk string| parsed from text           | UTF-8 text       |
//! | Error             | carried error returned     | carried error    |
//! | anything else     | `TypeError`                | `TypeError`      |

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::str::FromStr;

use bytes::Bytes;

use super::decode::Decoder;
use super::reader::ByteSource;
use super::value::{Kind, Payload, Value};
use crate::error::{RespError, Result, TypeError};
use crate::panic::recover;

// =============================================================================
// FromWire Capability
// =============================================================================

/// Fill `self` from a decoded value
pub trait FromWire {
    fn from_wire(&mut self, value: &Value) -> Result<()>;

    /// Name used in error reports
    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Fill a vector of `Self`. Element-wise by default; `u8` overrides this
    /// so byte vectors take the string payload directly.
    #[doc(hidden)]
    fn vec_from_wire(dst: &mut Vec<Self>, value: &Value) -> Result<()>
    where
        Self: Sized + Default,
    {
        let items = array_items::<Vec<Self>>(value)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let mut slot = Self::default();
            slot.from_wire(item)?;
            out.push(slot);
        }
        *dst = out;
        Ok(())
    }
}

/// Decode one frame per destination, in order, stopping at the first error
///
/// ```
/// use respwire::protocol::{scan, ByteReader};
///
/// let mut src = ByteReader::new(&b":-12\r\n$3\r\n250\r\n"[..]);
/// let (mut neg, mut pos) = (0i64, 0u16);
/// scan(&mut src, &mut [&mut neg, &mut pos]).unwrap();
/// assert_eq!((neg, pos), (-12, 250));
/// ```
pub fn scan<S: ByteSource + ?Sized>(src: &mut S, dst: &mut [&mut dyn FromWire]) -> Result<()> {
    Decoder::default().scan(src, dst)
}

impl Decoder {
    /// [`scan`] with this decoder's nesting limit
    pub fn scan<S: ByteSource + ?Sized>(
        &self,
        src: &mut S,
        dst: &mut [&mut dyn FromWire],
    ) -> Result<()> {
        for target in dst.iter_mut() {
            let value = self.decode(src);
            if let Some(err) = value.error() {
                return Err(err.clone());
            }
            scan_value(&mut **target, &value)?;
        }
        Ok(())
    }
}

/// Fill one destination from an already decoded value
///
/// A panic inside the destination's conversion is logged and reported as a
/// [`TypeError`].
pub fn scan_value<T: FromWire + ?Sized>(dst: &mut T, value: &Value) -> Result<()> {
    let to = dst.type_name();
    recover("FromWire::from_wire", || dst.from_wire(value))
        .unwrap_or_else(|_| Err(type_error(value, to)))
}

fn type_error(value: &Value, to: &'static str) -> RespError {
    TypeError::new(value.kind().name(), to).into()
}

// =============================================================================
// Source Coercion
// =============================================================================

/// Scalar view of a source value
enum Scalar<'a> {
    Integer(i64),
    Text(&'a [u8]),
}

fn scalar<T: ?Sized>(value: &Value) -> Result<Scalar<'_>> {
    match (value.kind(), value.payload()) {
        (Kind::Integer, Payload::Integer(i)) => Ok(Scalar::Integer(*i)),
        (k, Payload::Bytes(b)) if k.is_string() => Ok(Scalar::Text(b)),
        (Kind::Error, _) | (Kind::Invalid, _) if value.error().is_some() => {
            Err(value.error().cloned().unwrap_or(RespError::WrongType))
        }
        _ => Err(type_error(value, type_name::<T>())),
    }
}

fn array_items<T: ?Sized>(value: &Value) -> Result<&[Value]> {
    value.items().ok_or_else(|| type_error(value, type_name::<T>()))
}

/// Parse a numeric destination from either an integer or its text form
fn parse_text<T: FromStr>(value: &Value, bytes: &[u8]) -> Result<T> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| type_error(value, type_name::<T>()))
}

macro_rules! integer_from_wire {
    ($($t:ty),*) => {$(
        impl FromWire for $t {
            fn from_wire(&mut self, value: &Value) -> Result<()> {
                *self = match scalar::<$t>(value)? {
                    Scalar::Integer(i) => {
                        <$t>::try_from(i).map_err(|_| type_error(value, type_name::<$t>()))?
                    }
                    Scalar::Text(b) => parse_text(value, b)?,
                };
                Ok(())
            }
        }
    )*};
}

integer_from_wire!(i8, i16, i32, i64, i128, isize, u16, u32, u64, u128, usize);

impl FromWire for u8 {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        *self = match scalar::<u8>(value)? {
            Scalar::Integer(i) => u8::try_from(i).map_err(|_| type_error(value, "u8"))?,
            Scalar::Text(b) => parse_text(value, b)?,
        };
        Ok(())
    }

    fn vec_from_wire(dst: &mut Vec<Self>, value: &Value) -> Result<()> {
        *dst = value.as_bytes()?.unwrap_or_default();
        Ok(())
    }
}

impl FromWire for bool {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        let i: i64 = match scalar::<bool>(value)? {
            Scalar::Integer(i) => i,
            Scalar::Text(b) => parse_text::<i64>(value, b).map_err(|_| type_error(value, "bool"))?,
        };
        *self = i != 0;
        Ok(())
    }
}

macro_rules! float_from_wire {
    ($($t:ty),*) => {$(
        impl FromWire for $t {
            fn from_wire(&mut self, value: &Value) -> Result<()> {
                *self = match scalar::<$t>(value)? {
                    Scalar::Integer(i) => i as $t,
                    Scalar::Text(b) => parse_text(value, b)?,
                };
                Ok(())
            }
        }
    )*};
}

float_from_wire!(f32, f64);

impl FromWire for String {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        *self = match scalar::<String>(value)? {
            Scalar::Integer(i) => i.to_string(),
            Scalar::Text(b) => String::from_utf8(b.to_vec()).map_err(|_| RespError::InvalidUtf8)?,
        };
        Ok(())
    }
}

impl FromWire for Bytes {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        *self = value.as_bytes()?.map(Bytes::from).unwrap_or_default();
        Ok(())
    }
}

/// Keeps the decoded value itself
impl FromWire for Value {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        *self = value.clone();
        Ok(())
    }
}

/// Nil scans to `None`; anything else fills a fresh `T`
impl<T: FromWire + Default> FromWire for Option<T> {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        if value.is_nil() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.from_wire(value)?;
        *self = Some(inner);
        Ok(())
    }
}

impl<T: FromWire + ?Sized> FromWire for Box<T> {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        (**self).from_wire(value)
    }
}

// =============================================================================
// Collections
// =============================================================================

impl<T: FromWire + Default> FromWire for Vec<T> {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        T::vec_from_wire(self, value)
    }
}

/// Source may be shorter than `N`; trailing slots are reset to default
impl<T: FromWire + Default, const N: usize> FromWire for [T; N] {
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        let items = array_items::<[T; N]>(value)?;
        if items.len() > N {
            return Err(RespError::ArrayLength);
        }
        for (slot, item) in self.iter_mut().zip(items) {
            let mut fresh = T::default();
            fresh.from_wire(item)?;
            *slot = fresh;
        }
        for slot in self.iter_mut().skip(items.len()) {
            *slot = T::default();
        }
        Ok(())
    }
}

/// Alternating key, value pairs
fn pairs_from_wire<K, V, M>(value: &Value, mut insert: impl FnMut(K, V)) -> Result<()>
where
    K: FromWire + Default,
    V: FromWire + Default,
    M: ?Sized,
{
    let items = array_items::<M>(value)?;
    if items.len() % 2 == 1 {
        return Err(RespError::MapLength);
    }
    for pair in items.chunks_exact(2) {
        let mut k = K::default();
        k.from_wire(&pair[0])?;
        let mut v = V::default();
        v.from_wire(&pair[1])?;
        insert(k, v);
    }
    Ok(())
}

impl<K, V, S> FromWire for HashMap<K, V, S>
where
    K: FromWire + Default + Eq + Hash,
    V: FromWire + Default,
    S: BuildHasher + Default,
{
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        let mut map = HashMap::with_hasher(S::default());
        pairs_from_wire::<K, V, Self>(value, |k, v| {
            map.insert(k, v);
        })?;
        *self = map;
        Ok(())
    }
}

impl<K, V> FromWire for BTreeMap<K, V>
where
    K: FromWire + Default + Ord,
    V: FromWire + Default,
{
    fn from_wire(&mut self, value: &Value) -> Result<()> {
        let mut map = BTreeMap::new();
        pairs_from_wire::<K, V, Self>(value, |k, v| {
            map.insert(k, v);
        })?;
        *self = map;
        Ok(())
    }
}
