use thiserror::Error;

/// Errors raised when constructing a [`Scale`](crate::tile::Scale).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    /// Scale must be a positive, finite, normal number
    #[error("Invalid scale {0}: must be a positive, finite, normal number")]
    InvalidScale(f64),
}

/// Errors raised when constructing a [`TileGrid`](crate::tile::TileGrid).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Cell dimensions must be positive and finite
    #[error("Invalid tile cell size {width}x{height}: both sides must be positive and finite")]
    InvalidCellSize { width: f64, height: f64 },
}

/// Errors related to the resolution pyramid chain.
///
/// These indicate construction bugs rather than degraded rendering and are
/// never produced by a draw call on a well-formed pyramid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PyramidError {
    /// A node for this scale already exists
    #[error("Duplicate pyramid scale: {0}")]
    DuplicateScale(f64),

    /// No node exists for the requested scale
    #[error("Unknown pyramid scale: {0}")]
    UnknownScale(f64),

    /// The low/high links no longer form a strictly ascending, acyclic chain
    #[error("Broken pyramid chain at scale {scale}: {reason}")]
    BrokenChain { scale: f64, reason: String },
}

/// Errors reported by a [`TileProducer`](crate::producer::TileProducer).
#[derive(Debug, Clone, Error)]
pub enum ProduceError {
    /// The producer could not rasterize the tile
    #[error("Failed to produce tile ({scale}, {x}, {y}): {message}")]
    Failed {
        scale: f64,
        x: i32,
        y: i32,
        message: String,
    },

    /// The producer has been shut down
    #[error("Tile producer is shut down")]
    ShutDown,
}

/// Top-level errors surfaced by the `canvas-tiles` binary.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid scale argument
    #[error(transparent)]
    Scale(#[from] ScaleError),

    /// Invalid grid argument
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Pyramid misuse
    #[error(transparent)]
    Pyramid(#[from] PyramidError),

    /// Failed to write the output image
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to serialize the frame report
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
