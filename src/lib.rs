//! # respwire
//!
//! The engine and serving substrate for a RESP (Redis serialization
//! protocol) server:
//! - Byte-exact frame decoder with bounded array nesting
//! - Encoder for native and application values
//! - Type-directed scanner filling typed destinations from frames
//! - Blocking connection server with timeouts and graceful shutdown
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │             (accept loop, thread per connection)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Connection Loop                             │
//! │        read frame → dispatch → flush response                │
//! └──────────┬─────────────────────┬──────────────────┬─────────┘
//!            │                     │                  │
//!            ▼                     ▼                  ▼
//!   ┌─────────────┐        ┌─────────────┐    ┌──────────────┐
//!   │   Decoder   │        │   Handler   │    │   Encoder    │
//!   │  (→ Value)  │        │ (app logic) │    │  (ToWire →)  │
//!   └──────┬──────┘        └─────────────┘    └──────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Scanner   │
//!   │ (FromWire)  │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod panic;

pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HandlerError, RespError, Result, TransportKind, TypeError};
pub use config::ServerConfig;
pub use protocol::{decode, encode_to_vec, scan, ByteReader, FromWire, Kind, ToWire, Value, Wire};
pub use network::{Handler, ResponseWriter, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of respwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
