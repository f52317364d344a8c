use image::{GrayImage, Luma};

use crate::animation::color_cycle::{Rgba8, color_cycle_n};
use crate::foundation::core::{PixelRect, mul_div255};
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::render::frame::{BYTES_PER_PIXEL, FrameBuffer};

const HALF_OPAQUE: u8 = 128;
const OPAQUE: u8 = 255;
const MAX_BORDER: u32 = 5;

/// A solid colour drawn through an alpha mask: an opaque border around a vertical gradient that
/// can be scrolled.
#[derive(Clone, Debug)]
pub struct GradBox {
    color: Rgba8,
    mask: GrayImage,
    gradient: PixelRect,
    offset: u32,
}

impl GradBox {
    pub fn new(width: u32, height: u32, color: Rgba8) -> VideogenResult<Self> {
        if width < 1 || height < 1 {
            return Err(VideogenError::validation(format!(
                "grad box: invalid size: {width}x{height}"
            )));
        }
        let mut gb = Self {
            color,
            mask: GrayImage::new(width, height),
            gradient: PixelRect::from_size(width, height),
            offset: 0,
        };
        gb.init_mask();
        Ok(gb)
    }

    pub fn color(&self) -> Rgba8 {
        self.color
    }

    pub fn set_color(&mut self, color: Rgba8) {
        self.color = color;
    }

    pub fn cycle_color(&mut self, steps: u32) {
        self.color = color_cycle_n(self.color, steps);
    }

    /// Scroll the gradient down by `steps` rows, wrapping around.
    pub fn cycle_gradient(&mut self, steps: u32) {
        let h = self.gradient.height();
        if h == 0 {
            return;
        }
        self.offset = ((u64::from(self.offset) + u64::from(steps)) % u64::from(h)) as u32;
        self.draw_gradient();
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn bounds(&self) -> PixelRect {
        PixelRect::from_size(self.mask.width(), self.mask.height())
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Region of the mask holding the gradient.
    pub fn gradient_bounds(&self) -> PixelRect {
        self.gradient
    }

    /// Replace the pixels of `dst` inside `r` with the colour masked by this box.
    ///
    /// The mask is aligned with the top-left corner of `r`. Only pixels covered by `r`, the mask
    /// and `dst` are touched; where the mask is 0 they become fully transparent.
    pub fn draw(&self, dst: &mut FrameBuffer, r: PixelRect) {
        let (mw, mh) = self.mask.dimensions();
        let covered = PixelRect {
            x0: r.x0,
            y0: r.y0,
            x1: r.x0.saturating_add(mw),
            y1: r.y0.saturating_add(mh),
        };
        let clip = r.intersect(covered).intersect(dst.bounds());
        if clip.is_empty() {
            return;
        }
        let stride = dst.stride();
        let [cr, cg, cb, ca] = self.color;
        let pix = dst.pixels_mut();

        for y in clip.y0..clip.y1 {
            let row = y as usize * stride;
            for x in clip.x0..clip.x1 {
                let m = self.mask.get_pixel(x - r.x0, y - r.y0).0[0];
                let a = mul_div255(u16::from(ca), u16::from(m)) as u8;
                let px = if a == 0 { [0; 4] } else { [cr, cg, cb, a] };
                let i = row + x as usize * BYTES_PER_PIXEL;
                pix[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
            }
        }
    }

    fn init_mask(&mut self) {
        let (w, h) = self.mask.dimensions();
        if w < 10 || h < 10 {
            self.gradient = PixelRect::from_size(w, h);
            self.draw_gradient();
            return;
        }

        let bw = (w.min(h) / 10).min(MAX_BORDER);
        self.gradient = PixelRect::from_size(w, h).inset(bw);

        // top and bottom edges
        self.fill(PixelRect::from_size(w, bw), OPAQUE);
        self.fill(rect(0, h - bw, w, h), OPAQUE);
        // left and right edges
        self.fill(rect(0, bw, bw, h - bw), OPAQUE);
        self.fill(rect(w - bw, bw, w, h - bw), OPAQUE);

        if bw > 2 {
            self.fill(rect(0, 0, w, 1), HALF_OPAQUE);
            self.fill(rect(0, h - 1, w, h), HALF_OPAQUE);
            self.fill(rect(0, 1, 1, h - 1), HALF_OPAQUE);
            self.fill(rect(w - 1, 1, w, h - 1), HALF_OPAQUE);
        }

        self.draw_gradient();
    }

    fn draw_gradient(&mut self) {
        let g = self.gradient;
        let height = g.height();
        if height == 0 {
            return;
        }
        let start = height - self.offset % height;
        for (i, y) in (g.y0..g.y1).enumerate() {
            let yi = (start + i as u32) % height;
            let alpha = (256 * u64::from(yi) / u64::from(height)) as u8;
            self.fill(rect(g.x0, y, g.x1, y + 1), alpha);
        }
    }

    fn fill(&mut self, r: PixelRect, value: u8) {
        for y in r.y0..r.y1 {
            for x in r.x0..r.x1 {
                self.mask.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

fn rect(x0: u32, y0: u32, x1: u32, y1: u32) -> PixelRect {
    PixelRect { x0, y0, x1, y1 }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/grad_box.rs"]
mod tests;
