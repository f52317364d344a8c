//! Pixel buffers and the scene drawn into them.
//!
//! A [`frame::FrameBuffer`] is owned by the producer and redrawn every frame; the
//! [`frame::Frame`] views handed to the frame loop share its storage until the next redraw
//! copies it.

/// Frame views and the backing canvas.
pub mod frame;
/// The animated scene.
pub mod scene;
