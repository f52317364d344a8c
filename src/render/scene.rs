use crate::animation::color_cycle::Rgba8;
use crate::animation::grad_box::GradBox;
use crate::foundation::core::PixelRect;
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::render::frame::{Frame, FrameBuffer};

/// Extra columns on the right of the canvas that the output window slides over.
pub const JIGGLE_MARGIN: u32 = 4;

const START_COLOR: Rgba8 = [0, 255, 0, 255];

/// The test animation: a grad box in the lower right part of a canvas slightly wider than the
/// output, redrawn once per frame.
#[derive(Clone, Debug)]
pub struct Scene {
    width: u32,
    height: u32,
    rate: u32,
    canvas: FrameBuffer,
    grad_box: GradBox,
    region: PixelRect,
    index: u64,
}

impl Scene {
    /// Build the scene for a `width` x `height` output at `rate` frames per second and draw
    /// frame 0.
    pub fn new(width: u32, height: u32, rate: u32) -> VideogenResult<Self> {
        if width == 0 || height == 0 {
            return Err(VideogenError::validation(format!(
                "invalid output size: {width}x{height}"
            )));
        }
        if rate == 0 {
            return Err(VideogenError::validation("invalid frame rate: 0"));
        }
        let canvas_w = width.checked_add(JIGGLE_MARGIN).ok_or_else(|| {
            VideogenError::validation(format!("output width {width} is too large"))
        })?;

        let (box_w, box_h, region) = layout(width, height);
        let mut scene = Self {
            width,
            height,
            rate,
            canvas: FrameBuffer::new(canvas_w, height)?,
            grad_box: GradBox::new(box_w, box_h, START_COLOR)?,
            region,
            index: 0,
        };
        scene.draw();
        Ok(scene)
    }

    /// Build the scene and advance it to frame `index`.
    pub fn at(width: u32, height: u32, rate: u32, index: u64) -> VideogenResult<Self> {
        let mut scene = Self::new(width, height, rate)?;
        for _ in 0..index {
            scene.advance();
        }
        Ok(scene)
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    /// Where the grad box is drawn on the canvas.
    pub fn region(&self) -> PixelRect {
        self.region
    }

    pub fn grad_box(&self) -> &GradBox {
        &self.grad_box
    }

    pub fn canvas(&self) -> &FrameBuffer {
        &self.canvas
    }

    /// Step the animation to the next frame and redraw the canvas.
    ///
    /// Frames still held elsewhere keep the pixels they were created with.
    pub fn advance(&mut self) {
        let box_h = self.grad_box.bounds().height();
        self.grad_box.cycle_color(256 / self.rate);
        self.grad_box.cycle_gradient(box_h / self.rate.saturating_mul(2));
        self.index += 1;
        self.draw();
    }

    /// The output window for the current frame.
    pub fn frame(&self) -> VideogenResult<Frame> {
        let x = jiggle(self.index);
        self.canvas
            .sub_frame(PixelRect::new(x, 0, x + self.width, self.height)?)
    }

    /// Advance, then return the new frame.
    pub fn next_frame(&mut self) -> VideogenResult<Frame> {
        self.advance();
        self.frame()
    }

    fn draw(&mut self) {
        self.grad_box.draw(&mut self.canvas, self.region);
    }
}

/// Horizontal offset of the output window for frame `index`: 0, 1, 2, 3, 3, 2, 1, 0, ...
pub fn jiggle(index: u64) -> u32 {
    let x = (index % 8) as u32;
    if x > 3 { 7 - x } else { x }
}

/// Grad box size and draw region for the given output size.
fn layout(width: u32, height: u32) -> (u32, u32, PixelRect) {
    let (box_w, x0) = axis(width);
    let (box_h, y0) = axis(height);
    let region = PixelRect {
        x0,
        y0,
        x1: width,
        y1: height,
    };
    (box_w, box_h, region)
}

/// Box length and start offset along one axis of length `len`.
fn axis(len: u32) -> (u32, u32) {
    let quarter = len / 4;
    match quarter {
        0..4 => (len, 0),
        4..8 => (len / 2, quarter),
        _ => (quarter, quarter),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scene.rs"]
mod tests;
