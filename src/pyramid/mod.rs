//! Resolution pyramid.
//!
//! A [`Pyramid`] is an ordered chain of [`ResolutionNode`]s, one per scale
//! the view has needed so far. Canonical levels are powers of two; a single
//! non-canonical level may sit between them for the scale the user is
//! actually looking at.
//!
//! Drawing a viewport at one level consults the [`TileStore`] for each
//! covering cell. Cells without a tile are requested and temporarily filled
//! by borrowing from the neighbouring levels:
//!
//! ```text
//!   requested 1.5 ──miss──► high 2.0 (downsample) ──miss──► 4.0 ...
//!                 └─miss──► low  1.0 (upsample)   ──miss──► 0.5 ...
//! ```
//!
//! [`TileStore`]: crate::tile::TileStore

mod chain;
mod debug;
mod draw;
mod frame;
mod node;

pub use chain::Pyramid;
pub use debug::{draw_debug_grid, HEAVY_TILE_COLOR, LOW_GRID_COLOR, TILE_GRID_COLOR};
pub use frame::{DrawContext, FrameReport, IssuedRequest};
pub use node::ResolutionNode;
