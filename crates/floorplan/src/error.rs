use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FloorplanError {
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed SVG")]
    Xml(#[from] roxmltree::Error),

    #[error("cannot decode image {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {} has zero width or height", .0.display())]
    EmptyImage(PathBuf),

    #[error("room group {room_type:?} has no child element")]
    MissingChild { room_type: String },

    #[error("room {room_type:?}: first child <{tag}> has no points attribute")]
    MissingPoints { room_type: String, tag: String },

    #[error("room {room_type:?}: bad coordinate pair {token:?}")]
    BadCoordinate { room_type: String, token: String },

    #[error("room table line {line}: {reason}")]
    RoomTable { line: usize, reason: String },

    #[error("grid dimension must be positive, got {0}x{1}")]
    EmptyGrid(usize, usize),

    #[error("failed to convert sample {}", .folder.display())]
    Sample {
        folder: PathBuf,
        #[source]
        source: Box<FloorplanError>,
    },
}

pub type Result<T> = std::result::Result<T, FloorplanError>;

/// Attach a path to an `io::Error`.
pub(crate) fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> FloorplanError {
    let path = path.into();
    move |source| FloorplanError::Io { path, source }
}
