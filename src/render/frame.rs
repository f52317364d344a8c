use std::sync::Arc;

use crate::foundation::core::PixelRect;
use crate::foundation::error::{VideogenError, VideogenResult};

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A read-only view of RGBA8 (straight alpha) pixels inside a shared backing buffer.
///
/// The view may be a sub-image: rows start `stride` bytes apart, the first row starts at
/// `offset`, and only `width * 4` bytes of each row belong to the frame.
#[derive(Clone, Debug)]
pub struct Frame {
    pix: Arc<Vec<u8>>,
    width: u32,
    height: u32,
    stride: usize,
    offset: usize,
}

impl Frame {
    /// Create a validated view over `pix`.
    pub fn new(
        pix: Arc<Vec<u8>>,
        width: u32,
        height: u32,
        stride: usize,
        offset: usize,
    ) -> VideogenResult<Self> {
        if width == 0 || height == 0 {
            return Err(VideogenError::validation("frame width/height must be non-zero"));
        }
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if stride < row_bytes {
            return Err(VideogenError::validation(format!(
                "frame stride {stride} is smaller than a row of {row_bytes} bytes"
            )));
        }
        let end = stride
            .checked_mul(height as usize - 1)
            .and_then(|v| v.checked_add(offset))
            .and_then(|v| v.checked_add(row_bytes))
            .ok_or_else(|| VideogenError::validation("frame extent overflows usize"))?;
        if end > pix.len() {
            return Err(VideogenError::validation(format!(
                "frame extent {end} exceeds backing buffer of {} bytes",
                pix.len()
            )));
        }
        Ok(Self {
            pix,
            width,
            height,
            stride,
            offset,
        })
    }

    /// Wrap a tightly packed `width * height * 4` buffer.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> VideogenResult<Self> {
        let stride = width as usize * BYTES_PER_PIXEL;
        if data.len() != stride * height as usize {
            return Err(VideogenError::validation(
                "frame data size mismatch with width*height*4",
            ));
        }
        Self::new(Arc::new(data), width, height, stride, 0)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of pixel bytes in one row of the frame (no padding).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Number of bytes the frame occupies on the wire.
    pub fn packed_len(&self) -> usize {
        self.row_bytes() * self.height as usize
    }

    /// The whole backing buffer, including any bytes outside this view.
    pub fn backing(&self) -> &[u8] {
        &self.pix
    }

    /// Return `true` when the backing buffer is exactly this frame with no padding.
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.stride == self.row_bytes() && self.pix.len() == self.packed_len()
    }

    /// Byte span of row `y`.
    ///
    /// Panics when `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {y} out of bounds for height {}", self.height);
        let start = self.offset + self.stride * y as usize;
        &self.pix[start..start + self.row_bytes()]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }

    /// Copy the frame into a tightly packed buffer.
    pub fn to_packed(&self) -> Vec<u8> {
        if self.is_contiguous() {
            return self.pix.as_ref().clone();
        }
        let mut out = Vec::with_capacity(self.packed_len());
        for row in self.rows() {
            out.extend_from_slice(row);
        }
        out
    }

    /// Convert into an owned `image` buffer (e.g. for PNG output).
    pub fn to_rgba_image(&self) -> VideogenResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.to_packed())
            .ok_or_else(|| VideogenError::validation("frame does not fit an RgbaImage"))
    }

    /// Return `true` when both frames view the same backing allocation.
    pub fn shares_backing_with(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.pix, &other.pix)
    }
}

/// Producer-owned, tightly packed RGBA8 canvas that frames are cut from.
///
/// Writes go through [`FrameBuffer::pixels_mut`], which is copy-on-write: frames handed out
/// earlier keep seeing the pixels they were created with.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    pix: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    /// Allocate a transparent black canvas.
    pub fn new(width: u32, height: u32) -> VideogenResult<Self> {
        if width == 0 || height == 0 {
            return Err(VideogenError::validation(
                "frame buffer width/height must be non-zero",
            ));
        }
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| VideogenError::validation("frame buffer size overflows usize"))?;
        Ok(Self {
            pix: Arc::new(vec![0u8; len]),
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pix
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        Arc::make_mut(&mut self.pix).as_mut_slice()
    }

    /// The whole canvas as a contiguous frame.
    pub fn frame(&self) -> Frame {
        Frame {
            pix: Arc::clone(&self.pix),
            width: self.width,
            height: self.height,
            stride: self.stride(),
            offset: 0,
        }
    }

    /// A sub-image view sharing this canvas' current backing storage.
    pub fn sub_frame(&self, rect: PixelRect) -> VideogenResult<Frame> {
        if rect.is_empty() || !self.bounds().contains_rect(rect) {
            return Err(VideogenError::validation(format!(
                "sub-frame {rect:?} is empty or outside {}x{}",
                self.width, self.height
            )));
        }
        let offset = rect.y0 as usize * self.stride() + rect.x0 as usize * BYTES_PER_PIXEL;
        Frame::new(
            Arc::clone(&self.pix),
            rect.width(),
            rect.height(),
            self.stride(),
            offset,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
