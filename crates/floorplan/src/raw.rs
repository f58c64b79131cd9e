//! Raster floorplan loading.

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, Rgb32FImage};
use ndarray::Array3;

use crate::error::{FloorplanError, Result};
use crate::scale::GridShape;

/// A floorplan image resized to the model's input grid.
#[derive(Debug, Clone)]
pub struct RawImage {
    /// Size of the file on disk, before resizing.
    pub original: GridShape,
    /// `(height, width, 3)`, RGB in `[0, 1]`.
    pub pixels: Array3<f32>,
}

impl RawImage {
    pub fn open<P: AsRef<Path>>(path: P, input: GridShape) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| FloorplanError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        if img.width() == 0 || img.height() == 0 {
            return Err(FloorplanError::EmptyImage(path.to_path_buf()));
        }

        Self::from_image(&img, input)
    }

    pub fn from_image(img: &DynamicImage, input: GridShape) -> Result<Self> {
        if input.cells() == 0 {
            return Err(FloorplanError::EmptyGrid(input.height, input.width));
        }

        let original = GridShape::new(img.height() as usize, img.width() as usize);

        // Alpha is dropped; values are normalised to [0, 1] before filtering.
        let rgb: Rgb32FImage = img.to_rgb32f();
        let resized = image::imageops::resize(
            &rgb,
            input.width as u32,
            input.height as u32,
            FilterType::Triangle,
        );

        let pixels = Array3::from_shape_vec((input.height, input.width, 3), resized.into_raw())
            .map_err(|_| FloorplanError::EmptyGrid(input.height, input.width))?;

        Ok(Self { original, pixels })
    }

    pub fn shape(&self) -> GridShape {
        let (height, width, _) = self.pixels.dim();
        GridShape { height, width }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn records_original_size_and_resizes() {
        let img = RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 128]));
        let raw = RawImage::from_image(&DynamicImage::ImageRgba8(img), GridShape::new(8, 16)).unwrap();

        assert_eq!(raw.original, GridShape::new(20, 40));
        assert_eq!(raw.pixels.dim(), (8, 16, 3));
        assert_eq!(raw.shape(), GridShape::new(8, 16));

        assert!((raw.pixels[[3, 5, 0]] - 1.0).abs() < 1e-6);
        assert!(raw.pixels[[3, 5, 1]].abs() < 1e-6);
        assert!(raw.pixels[[3, 5, 2]].abs() < 1e-6);
    }

    #[test]
    fn zero_input_grid_is_rejected() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        assert!(RawImage::from_image(&img, GridShape::new(0, 4)).is_err());
    }
}
