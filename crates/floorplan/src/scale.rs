use crate::error::{FloorplanError, Result};

/// A 2D grid size in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub height: usize,
    pub width: usize,
}

impl GridShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// `(height, width)` as an ndarray shape.
    #[inline]
    pub fn dim(self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn cells(self) -> usize {
        self.height * self.width
    }

    fn ensure_positive(self) -> Result<Self> {
        if self.height == 0 || self.width == 0 {
            return Err(FloorplanError::EmptyGrid(self.height, self.width));
        }
        Ok(self)
    }
}

/// Per-axis linear map from annotation coordinates to label-grid coordinates.
///
/// The factors are derived from the raw image's size before any resizing,
/// so the label grid follows the original aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub sx: f64,
    pub sy: f64,
}

impl Scale {
    pub fn new(sx: f64, sy: f64) -> Self {
        Self { sx, sy }
    }

    /// `output / original` on each axis.
    pub fn between(original: GridShape, output: GridShape) -> Result<Self> {
        let original = original.ensure_positive()?;
        let output = output.ensure_positive()?;

        Ok(Self {
            sx: output.width as f64 / original.width as f64,
            sy: output.height as f64 / original.height as f64,
        })
    }

    /// Apply `self` first, then `next`.
    pub fn then(self, next: Scale) -> Self {
        Self {
            sx: self.sx * next.sx,
            sy: self.sy * next.sy,
        }
    }

    #[inline]
    pub fn apply(self, x: f64, y: f64) -> (f64, f64) {
        (x * self.sx, y * self.sy)
    }

    /// Scale then truncate toward zero onto the integer grid.
    #[inline]
    pub fn to_cell(self, x: f64, y: f64) -> (i32, i32) {
        let (x, y) = self.apply(x, y);
        (x as i32, y as i32)
    }
}
