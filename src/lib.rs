//! # canvas-tiles
//!
//! A multi-resolution tile cache and viewport renderer for an infinite,
//! zoomable 2D canvas.
//!
//! Content is rasterized into fixed-size square tiles at discrete zoom
//! levels. Drawing a viewport assembles the tiles available right now; where
//! a tile is missing, content is borrowed from neighbouring levels (scaled
//! up or down) while the missing tile is queued for production.
//!
//! ## Features
//!
//! - **Power-of-two pyramid**: canonical levels at `2^k`, plus one "ideal"
//!   level at the exact scale being viewed
//! - **Cross-resolution borrowing**: finer levels are downsampled, coarser
//!   levels upsampled, recursively along the chain
//! - **Priority-driven production**: Low for ordinary misses, Middle/High
//!   when the exact view is waiting on a coarser level
//! - **Bounded caching**: LRU by tile count and pixel bytes, with per-scale
//!   invalidation that discards results still in flight
//!
//! ## Architecture
//!
//! - [`tile`] - Scales, grid geometry, tile keys and the shared [`TileCache`]
//! - [`pyramid`] - The resolution chain, viewport draw and borrowing
//! - [`surface`] - Drawing capability and a software raster implementation
//! - [`producer`] - Async tile production and the worker pool
//! - [`viewer`] - View session tying a cache to a pyramid
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use canvas_tiles::{PatternProducer, ProductionWorker, RasterSurface, Scale, Viewer, ViewerConfig, WorkerConfig};
//! use kurbo::Rect;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut viewer = Viewer::new(ViewerConfig {
//!         content: Some(Rect::new(0.0, 0.0, 4096.0, 4096.0)),
//!         ..ViewerConfig::default()
//!     })
//!     .unwrap();
//!
//!     let worker = ProductionWorker::spawn(
//!         Arc::clone(viewer.cache()),
//!         Arc::new(PatternProducer::default()),
//!         WorkerConfig::default(),
//!     );
//!
//!     let scale = Scale::new(1.5).unwrap();
//!     let viewport = Rect::new(0.0, 0.0, 800.0, 600.0);
//!     let mut surface = RasterSurface::new(800, 600);
//!
//!     viewer.render(scale, viewport, &mut surface).unwrap();
//!     worker.wait_idle().await;
//!     let report = viewer.render(scale, viewport, &mut surface).unwrap();
//!     assert!(report.is_complete());
//!
//!     worker.shutdown().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod producer;
pub mod pyramid;
pub mod surface;
pub mod tile;
pub mod viewer;

// Re-export commonly used types
pub use config::Config;
pub use error::{GridError, ProduceError, PyramidError, RenderError, ScaleError};
pub use producer::{
    PatternConfig, PatternProducer, ProductionWorker, TileProducer, WorkerConfig, WorkerStats,
};
pub use pyramid::{DrawContext, FrameReport, IssuedRequest, Pyramid, ResolutionNode};
pub use surface::{ClipOp, Paint, PaintStyle, RasterSurface, Surface};
pub use tile::{
    floor_pow2, index_range_of, rect_of, Priority, ProductionQueue, Scale, TileCache, TileGrid,
    TileImage, TileIndexRange, TileKey, TileStore,
};
pub use viewer::{Viewer, ViewerConfig};
