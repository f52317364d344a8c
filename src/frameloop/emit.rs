use std::io::{self, Write};

use crate::render::frame::Frame;

/// Write the packed RGBA rows of `frame` to `sink`.
///
/// A frame whose backing buffer holds exactly its own pixels goes out in one write. A sub-image
/// is written row by row, skipping the bytes between rows, so no copy is made. The first failing
/// write aborts the remaining rows.
pub fn write_frame<W: Write + ?Sized>(sink: &mut W, frame: &Frame) -> io::Result<()> {
    if frame.is_contiguous() {
        return sink.write_all(frame.backing());
    }
    for row in frame.rows() {
        sink.write_all(row)?;
    }
    Ok(())
}
