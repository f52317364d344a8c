use std::io;
use std::sync::Arc;

use crate::frameloop::panic_error::PanicError;

/// Why a [`crate::FrameLoop`] terminated.
///
/// A loop that was stopped (or whose parent token fired) without anything going wrong reports
/// no error at all.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FrameLoopError {
    /// Construction was given a frame rate below 1; no worker was started.
    #[error("invalid frame rate {0}, must be above 0")]
    InvalidFrameRate(i64),

    /// The producer dropped its sender before any frame arrived.
    #[error("frame channel closed before first frame")]
    ClosedBeforeFirstFrame,

    /// The sink rejected a write.
    #[error("failed to write frame: {0}")]
    Write(#[source] Arc<io::Error>),

    /// The worker panicked; the panic was re-raised after being recorded.
    #[error("frame loop panicked")]
    Panic(#[source] PanicError),
}

impl FrameLoopError {
    pub(crate) fn write(err: io::Error) -> Self {
        Self::Write(Arc::new(err))
    }

    /// Return `true` for a recovered internal fault.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic(_))
    }

    /// The recovered panic, if this is one.
    pub fn as_panic(&self) -> Option<&PanicError> {
        match self {
            Self::Panic(p) => Some(p),
            _ => None,
        }
    }
}
