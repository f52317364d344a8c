#![forbid(unsafe_code)]
//! Synthetic test-pattern video generator.
//!
//! A [`Scene`] renders an animated grad box into a [`FrameBuffer`]; [`StreamSession`] hands the
//! frames to a [`FrameLoop`], which writes raw RGBA to a sink at a fixed frame rate, repeating
//! the last frame whenever the producer is late. The sink is our stdout or an `ffmpeg` process
//! encoding to AVI or WebM.

mod foundation;

pub mod animation;
pub mod encode;
pub mod frameloop;
pub mod render;
pub mod session;

pub use animation::color_cycle::{Rgba8, color_cycle};
pub use animation::grad_box::GradBox;
pub use encode::ffmpeg::{OutputFormat, PipeCommand};
pub use encode::sink::{InMemorySink, OutputSink};
pub use foundation::core::PixelRect;
pub use foundation::error::{VideogenError, VideogenResult};
pub use frameloop::{
    CancelToken, Emitted, FrameLoop, FrameLoopError, PanicError, PanicSource, frame_channel,
    is_panic, notification_channel,
};
pub use render::frame::{Frame, FrameBuffer};
pub use render::scene::Scene;
pub use session::stream_session::{StreamSession, StreamSettings, StreamStats, parse_duration};
