//! Output sinks.
//!
//! The frame loop writes raw RGBA rows into any [`std::io::Write`]; this module provides the
//! ones the binary uses.

/// `ffmpeg` argument construction and the subprocess writer.
pub mod ffmpeg;
/// Sink selection and the in-memory sink.
pub mod sink;
