//! Floorplan annotation rasterizer.
//!
//! Turns a floorplan sample (raster image + SVG room annotation) into a
//! resized image tensor and a per-pixel room-class label grid:
//!
//! - [`svg`] extracts `Space <type>` room groups and their outlines.
//! - [`scale`] maps annotation coordinates onto the label grid using the
//!   raw image's original size.
//! - [`raster`] scan-fills each room with its class id from a [`RoomTable`].
//! - [`dataset`] walks split manifests and writes `.npy` arrays.

pub mod dataset;
pub mod error;
pub mod preview;
pub mod raster;
pub mod raw;
pub mod rooms;
pub mod sample;
pub mod scale;
pub mod svg;

pub use dataset::{Converter, OutputMode, SplitReport};
pub use error::{FloorplanError, Result};
pub use raster::{rasterize, LabelGrid, RasterStats, Room, RoomPolygon};
pub use raw::RawImage;
pub use rooms::{RoomTable, RoomTableEntry};
pub use sample::{FloorplanSample, SampleLayout, Shapes};
pub use scale::{GridShape, Scale};
