//! Protocol Module
//!
//! RESP wire format: decoding, encoding and typed scanning.
//!
//! ## Frame Format
//! ```text
//! ┌──────┬───────────────────────────────┬──────────────────────────────┐
//! │ Type │ Header                        │ Body                         │
//! ├──────┼───────────────────────────────┼──────────────────────────────┤
//! │  +   │ <text>\r\n                    │ -                            │
//! │  -   │ <text>\r\n                    │ -                            │
//! │  :   │ <integer>\r\n                 │ -                            │
//! │  $   │ <len>\r\n                     │ <len bytes>\r\n              │
//! │  *   │ <count>\r\n                   │ <count frames>               │
//! └──────┴───────────────────────────────┴──────────────────────────────┘
//! ```
//!
//! - `$-1\r\n` is Nil; `*0\r\n` is the empty array
//! - Simple strings and errors may not contain CR or LF

mod value;
mod reader;
mod decode;
mod encode;
mod scan;

pub use value::{Kind, Value};
pub use reader::{ByteReader, ByteSource};
pub use decode::{decode, Decoder, DEFAULT_MAX_DEPTH};
pub use encode::{encode_to_vec, AsError, AsText, Encoder, ToWire, Wire, MAX_CONVERSIONS};
pub use scan::{scan, scan_value, FromWire};
