use crate::frameloop::FrameLoopError;

pub type VideogenResult<T> = Result<T, VideogenError>;

#[derive(thiserror::Error, Debug)]
pub enum VideogenError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("frame loop error: {0}")]
    FrameLoop(#[from] FrameLoopError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VideogenError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Return `true` when this error (or anything in its source chain) is a recovered panic.
    pub fn is_panic(&self) -> bool {
        crate::frameloop::is_panic(self)
    }
}
