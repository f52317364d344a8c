//! Recovered panics as error values.
//!
//! The frame loop catches a panic at the boundary of its worker, records it as a
//! [`PanicError`], and then resumes unwinding with the untouched payload. Callers that only
//! observe the loop's stored error can still tell the failure apart from an ordinary one with
//! [`is_panic`].

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Panic payload type whose error is exposed through [`PanicError`]'s `source()`.
///
/// Raise it with `std::panic::panic_any(Arc::new(err) as PanicSource)`.
pub type PanicSource = Arc<dyn Error + Send + Sync + 'static>;

/// A panic that was caught, recorded, and re-raised.
#[derive(Clone, Debug)]
pub struct PanicError {
    location: &'static str,
    message: String,
    source: Option<PanicSource>,
}

impl PanicError {
    /// Describe `payload` without consuming it, so it can still be re-raised.
    pub fn from_payload(location: &'static str, payload: &(dyn Any + Send)) -> Self {
        let (message, source) = if let Some(err) = payload.downcast_ref::<PanicSource>() {
            (err.to_string(), Some(Arc::clone(err)))
        } else if let Some(msg) = payload.downcast_ref::<&'static str>() {
            ((*msg).to_string(), None)
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            (msg.clone(), None)
        } else {
            ("Box<dyn Any>".to_string(), None)
        };
        Self {
            location,
            message,
            source,
        }
    }

    /// Where the panic was caught.
    pub fn location(&self) -> &'static str {
        self.location
    }

    /// Rendered panic payload.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic in {}: {}", self.location, self.message)
    }
}

impl Error for PanicError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Return `true` when `err` or any error in its source chain is a [`PanicError`].
pub fn is_panic(err: &(dyn Error + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if e.is::<PanicError>() {
            return true;
        }
        cur = e.source();
    }
    false
}
