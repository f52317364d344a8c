use crate::foundation::error::{VideogenError, VideogenResult};

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PixelRect {
    /// Inclusive left edge.
    pub x0: u32,
    /// Inclusive top edge.
    pub y0: u32,
    /// Exclusive right edge.
    pub x1: u32,
    /// Exclusive bottom edge.
    pub y1: u32,
}

impl PixelRect {
    /// Create a validated rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> VideogenResult<Self> {
        if x0 > x1 || y0 > y1 {
            return Err(VideogenError::validation(format!(
                "invalid rectangle ({x0},{y0})-({x1},{y1})"
            )));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// Rectangle anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    pub fn width(self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(self) -> u32 {
        self.y1 - self.y0
    }

    pub fn is_empty(self) -> bool {
        self.x0 == self.x1 || self.y0 == self.y1
    }

    /// Shrink every edge by `by` pixels.
    ///
    /// Collapses to an empty rectangle at the centre when `by` is too large.
    pub fn inset(self, by: u32) -> Self {
        let x0 = (self.x0 + by).min(self.x1);
        let y0 = (self.y0 + by).min(self.y1);
        Self {
            x0,
            y0,
            x1: self.x1.saturating_sub(by).max(x0),
            y1: self.y1.saturating_sub(by).max(y0),
        }
    }

    /// Overlap of both rectangles; empty when they do not overlap.
    pub fn intersect(self, other: PixelRect) -> Self {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        Self {
            x0,
            y0,
            x1: self.x1.min(other.x1).max(x0),
            y1: self.y1.min(other.y1).max(y0),
        }
    }

    /// Return `true` when `other` lies entirely inside `self`.
    pub fn contains_rect(self, other: PixelRect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }
}

pub(crate) fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
