//! Network Module
//!
//! Blocking TCP server that runs an application [`Handler`] behind the RESP
//! codec.
//!
//! ## Architecture
//! - One accept loop per `serve` call
//! - One thread per connection
//! - Per connection: check shutdown → read frame → dispatch → flush, until
//!   shutdown, a fatal transport error, or the handler hangs up

mod server;
mod connection;
mod deadline;
mod listener;
mod writer;
mod handler;
mod logger;

pub use server::{Server, Shutdown};
pub use listener::{InterruptListener, IntoListener};
pub use writer::{ResponseWriter, WriteState};
pub use handler::Handler;
pub use logger::{Logger, NullLogger, TracingLogger};
