use std::path::{Path, PathBuf};

use log::{debug, warn};
use ndarray::Array3;

use crate::error::Result;
use crate::raster::{rasterize, LabelGrid, RasterStats, Room};
use crate::raw::RawImage;
use crate::rooms::RoomTable;
use crate::scale::{GridShape, Scale};
use crate::svg::{self, RoomShape};

pub const DEFAULT_IMAGE_NAME: &str = "F1_scaled.png";
pub const DEFAULT_SVG_NAME: &str = "model.svg";

/// Fixed grid sizes shared by every sample of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shapes {
    /// Resized image size fed to the model.
    pub input: GridShape,
    /// Label grid size.
    pub output: GridShape,
}

/// File names expected inside each sample folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLayout {
    pub image_name: String,
    pub svg_name: String,
}

impl Default for SampleLayout {
    fn default() -> Self {
        Self {
            image_name: DEFAULT_IMAGE_NAME.to_owned(),
            svg_name: DEFAULT_SVG_NAME.to_owned(),
        }
    }
}

impl SampleLayout {
    pub fn image_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.image_name)
    }

    pub fn svg_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.svg_name)
    }
}

/// Scale native room outlines onto the label grid of a sample whose raw
/// image measured `original` before resizing.
pub fn rooms_on_grid(shapes: &[RoomShape], original: GridShape, output: GridShape) -> Result<Vec<Room>> {
    let scale = Scale::between(original, output)?;

    Ok(shapes
        .iter()
        .map(|shape| Room {
            room_type: shape.room_type.clone(),
            polygon: shape.to_grid(scale),
        })
        .collect())
}

/// One training pair: resized image plus its label grid.
#[derive(Debug, Clone)]
pub struct FloorplanSample {
    pub image: Array3<f32>,
    pub labels: LabelGrid,
    pub original: GridShape,
    pub stats: RasterStats,
}

impl FloorplanSample {
    /// Combine an already loaded image with the sample's room outlines.
    pub fn assemble(raw: RawImage, shapes: &[RoomShape], table: &RoomTable, output: GridShape) -> Result<Self> {
        let rooms = rooms_on_grid(shapes, raw.original, output)?;
        let (labels, stats) = rasterize(output, &rooms, table);

        Ok(Self {
            image: raw.pixels,
            labels,
            original: raw.original,
            stats,
        })
    }

    /// Load the image and annotation from `folder` and rasterize.
    pub fn load(folder: &Path, layout: &SampleLayout, table: &RoomTable, shapes: &Shapes) -> Result<Self> {
        let raw = RawImage::open(layout.image_path(folder), shapes.input)?;
        let rooms = svg::read_rooms(layout.svg_path(folder))?;

        if rooms.is_empty() {
            warn!("{}: annotation has no rooms", folder.display());
        }

        let sample = Self::assemble(raw, &rooms, table, shapes.output)?;
        debug!(
            "{}: original {}x{}, {} rooms, {} matched",
            folder.display(),
            sample.original.width,
            sample.original.height,
            sample.stats.rooms,
            sample.stats.matched
        );

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn labels_follow_original_aspect_not_input_size() {
        // 200x100 raw image, label grid 10x10: x scales by 1/20, y by 1/10
        let raw = RawImage::from_image(
            &DynamicImage::ImageRgb8(RgbImage::new(200, 100)),
            GridShape::new(4, 4),
        )
        .unwrap();
        let shapes = vec![RoomShape {
            room_type: "Bath".to_owned(),
            points: vec![(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)],
        }];
        let table = RoomTable::parse("Bath: 3\n").unwrap();

        let sample = FloorplanSample::assemble(raw, &shapes, &table, GridShape::new(10, 10)).unwrap();

        assert_eq!(sample.image.dim(), (4, 4, 3));
        assert_eq!(sample.labels.shape(), GridShape::new(10, 10));
        assert_eq!(sample.labels.get(5, 5), 3);
        assert_eq!(sample.labels.get(6, 5), 0);
        assert_eq!(sample.labels.get(5, 6), 0);
        assert_eq!(sample.labels.count(3), 36);
    }

    #[test]
    fn layout_joins_default_names() {
        let layout = SampleLayout::default();
        let folder = Path::new("data/high_quality/17");
        assert_eq!(layout.image_path(folder), folder.join("F1_scaled.png"));
        assert_eq!(layout.svg_path(folder), folder.join("model.svg"));
    }
}
