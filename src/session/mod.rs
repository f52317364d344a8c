//! Producer side: drives a [`crate::frameloop::FrameLoop`] with the animated scene.

/// Stream settings and the session runner.
pub mod stream_session;
