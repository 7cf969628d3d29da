//! Tile layer.
//!
//! This module holds the value types shared by every pyramid level and the
//! cache the pyramid draws from.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │              Pyramid (draw)                │
//! └──────────────┬───────────────▲─────────────┘
//!   get / has /  │               │ tiles become visible
//!   request      ▼               │
//! ┌────────────────────────────────────────────┐
//! │                 TileCache                  │
//! │  ┌──────────────┐   ┌───────────────────┐  │
//! │  │ LRU of tiles │   │ ProductionQueue   │  │
//! │  │ (scale,x,y)  │   │ (High>Middle>Low) │  │
//! │  └──────────────┘   └───────────────────┘  │
//! └──────────────▲───────────────┬─────────────┘
//!     complete() │               │ next_request()
//!                │               ▼
//! ┌────────────────────────────────────────────┐
//! │        ProductionWorker / TileProducer     │
//! └────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`Scale`]: validated pyramid scale with [`floor_pow2`] and the canonical predicate
//! - [`TileGrid`] / [`TileIndexRange`]: pixel rect to tile-index conversion
//! - [`TileKey`] / [`Priority`]: cache identity and scheduling order
//! - [`TileImage`]: immutable RGBA8 tile content
//! - [`ProductionQueue`]: idempotent priority queue of pending requests
//! - [`TileCache`]: the [`TileStore`] implementation shared with producers

mod cache;
mod grid;
mod image;
mod key;
mod queue;
mod scale;

pub use cache::{
    DebugHints, ProductionTicket, TileCache, TileStore, DEFAULT_MAX_ENTRIES,
    DEFAULT_TILE_CACHE_CAPACITY,
};
pub use grid::{index_range_of, rect_of, TileGrid, TileIndexRange, DEFAULT_TILE_SIZE};
pub use self::image::TileImage;
pub use key::{Priority, TileKey};
pub use queue::{Enqueue, ProductionQueue};
pub use scale::{floor_pow2, Scale};
