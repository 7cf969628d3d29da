//! Tile production.
//!
//! The pyramid only ever *asks* for tiles. This module supplies the other
//! half: a [`TileProducer`] capability that rasterizes one tile, and a
//! [`ProductionWorker`] pool that drains the cache's request queue through
//! it in priority order.
//!
//! - [`TileProducer`]: async trait implemented by content renderers
//! - [`PatternProducer`]: procedural checkerboard content for demos and tests
//! - [`ProductionWorker`]: tokio task pool feeding a [`TileCache`](crate::tile::TileCache)

mod pattern;
mod worker;

use async_trait::async_trait;

use crate::error::ProduceError;
use crate::tile::{TileGrid, TileImage, TileKey};

pub use pattern::{PatternConfig, PatternProducer};
pub use worker::{ProductionWorker, WorkerConfig, WorkerStats, DEFAULT_HEAVY_THRESHOLD};

/// Rasterizes individual tiles.
///
/// Implementations must be thread-safe: a worker pool calls `produce`
/// concurrently from several tasks.
#[async_trait]
pub trait TileProducer: Send + Sync {
    /// Render the tile for `key`, one `grid` cell in size.
    ///
    /// The tile covers content rectangle `grid.rect_of(key.x, key.y) / key.scale`.
    async fn produce(&self, key: TileKey, grid: TileGrid) -> Result<TileImage, ProduceError>;
}
