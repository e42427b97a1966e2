//! Request handler capability

use crate::error::HandlerError;
use crate::protocol::Value;

use super::writer::ResponseWriter;

/// Application logic invoked once per decoded request
///
/// The handler may write at most one response. Returning an error discards
/// anything written, replies with `SERVERERR <error>` and hangs up the
/// connection.
pub trait Handler: Send + Sync + 'static {
    fn serve(&self, w: &mut ResponseWriter, request: Value) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, Value) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn serve(&self, w: &mut ResponseWriter, request: Value) -> Result<(), HandlerError> {
        self(w, request)
    }
}
