//! Static PNG previews of label grids over their input image.

use std::path::Path;

use image::imageops::FilterType;
use image::{Rgb, Rgb32FImage, RgbImage};

use crate::error::{io_err, FloorplanError, Result};
use crate::raster::{LabelGrid, BACKGROUND};
use crate::sample::FloorplanSample;

/// Opacity of the class tint.
const TINT_ALPHA: f32 = 0.45;

/// Fully saturated colour at `hue` in `[0, 1)`.
fn hsv_to_rgb(hue: f32) -> [f32; 3] {
    let h = (hue.rem_euclid(1.0)) * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    match h as u32 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

/// One colour per class id, hues evenly spaced over `1..=max_class`.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<[f32; 3]>,
}

impl Palette {
    pub fn hsv(max_class: u8) -> Self {
        let n = max_class as usize + 1;
        let colors = (0..n)
            .map(|class| hsv_to_rgb(class as f32 / n as f32))
            .collect();
        Self { colors }
    }

    /// Colour of `class_id`, `None` for background or unknown ids.
    pub fn color(&self, class_id: u8) -> Option<[f32; 3]> {
        if class_id == BACKGROUND {
            return None;
        }
        self.colors.get(class_id as usize).copied()
    }
}

/// Blend `labels` over `image`, both at the label grid's resolution.
pub fn overlay(image: &Rgb32FImage, labels: &LabelGrid, palette: &Palette) -> RgbImage {
    let shape = labels.shape();
    let base = image::imageops::resize(
        image,
        shape.width as u32,
        shape.height as u32,
        FilterType::Triangle,
    );

    RgbImage::from_fn(shape.width as u32, shape.height as u32, |x, y| {
        let Rgb(mut px) = *base.get_pixel(x, y);
        if let Some(tint) = palette.color(labels.get(x as usize, y as usize)) {
            for c in 0..3 {
                px[c] = px[c] * (1.0 - TINT_ALPHA) + tint[c] * TINT_ALPHA;
            }
        }
        Rgb(px.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
    })
}

/// Write a preview PNG of `sample` to `path`.
pub fn write_preview(path: &Path, sample: &FloorplanSample, palette: &Palette) -> Result<()> {
    let (height, width, _) = sample.image.dim();
    let data: Vec<f32> = sample.image.iter().copied().collect();
    let image = Rgb32FImage::from_raw(width as u32, height as u32, data)
        .ok_or(FloorplanError::EmptyGrid(height, width))?;

    overlay(&image, &sample.labels, palette)
        .save(path)
        .map_err(|source| match source {
            image::ImageError::IoError(e) => io_err(path)(e),
            other => FloorplanError::Image {
                path: path.to_path_buf(),
                source: other,
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RoomPolygon;
    use crate::scale::GridShape;

    #[test]
    fn palette_skips_background_and_spaces_hues() {
        let palette = Palette::hsv(3);
        assert_eq!(palette.color(0), None);
        assert_eq!(palette.color(4), None);
        assert_eq!(palette.color(2), Some([0.0, 1.0, 1.0]));
        assert_ne!(palette.color(1), palette.color(3));
    }

    #[test]
    fn overlay_tints_only_labelled_cells() {
        let shape = GridShape::new(4, 4);
        let mut labels = LabelGrid::new(shape);
        labels.fill_polygon(&RoomPolygon::new(vec![(0, 0), (1, 0), (1, 1), (0, 1)]), 1);

        let white = Rgb32FImage::from_pixel(8, 8, Rgb([1.0, 1.0, 1.0]));
        let out = overlay(&white, &labels, &Palette::hsv(1));

        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(3, 3), &Rgb([255, 255, 255]));
        assert_ne!(out.get_pixel(0, 0), &Rgb([255, 255, 255]));
    }
}
