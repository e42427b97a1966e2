//! Panic recovery
//!
//! Application conversions (`ToWire`, `FromWire`) and connection threads run
//! under `catch_unwind`. A caught panic is logged with a backtrace and
//! reported to the caller as an ordinary error.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// A caught panic payload
///
/// Displays the `panic!` message when the payload is a string, and the
/// payload's `Debug` output otherwise.
#[derive(Debug)]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// The `panic!` message, if the payload carries one
    pub fn as_str(&self) -> Option<&str> {
        if let Some(msg) = self.0.downcast_ref::<&'static str>() {
            return Some(*msg);
        }
        self.0.downcast_ref::<String>().map(String::as_str)
    }
}

impl From<Box<dyn Any + Send>> for PanicMessage {
    fn from(payload: Box<dyn Any + Send>) -> Self {
        PanicMessage(payload)
    }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(msg) => f.write_str(msg),
            None => write!(f, "{:?}", self.0),
        }
    }
}

/// Run `f`; a panic is logged and comes back as `Err(message)`
pub(crate) fn recover<T>(context: &str, f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = PanicMessage::from(payload).to_string();
        let trace = Backtrace::force_capture();
        tracing::error!("{} panicked: {}\ntrace:\n{}", context, message, trace);
        message
    })
}
