//! Debug overlay: tile grid outlines and heavy-tile highlighting.
//!
//! Purely observational; nothing here affects what the pyramid draws or
//! requests.

use kurbo::Rect;

use crate::error::PyramidError;
use crate::surface::{Paint, Surface};
use crate::tile::{Scale, TileKey, TileStore};

use super::chain::Pyramid;

/// Outline colour of tiles the producer flagged as heavy.
pub const HEAVY_TILE_COLOR: [u8; 4] = [255, 0, 0, 128];

/// Outline colour of ordinary tiles.
pub const TILE_GRID_COLOR: [u8; 4] = [0, 0, 255, 128];

/// Outline colour of the coarser neighbour's grid.
pub const LOW_GRID_COLOR: [u8; 4] = [0, 255, 0, 128];

const GRID_INSET: f64 = 2.0;
const GRID_STROKE: f64 = 2.0;

/// Outline every cell covering `viewport` at `scale`.
///
/// With `color` unset, heavy tiles are red and others blue.
pub fn draw_debug_grid(
    store: &dyn TileStore,
    scale: Scale,
    viewport: Rect,
    surface: &mut dyn Surface,
    color: Option<[u8; 4]>,
) {
    let grid = store.grid();
    for (x, y) in grid.index_range(viewport).iter() {
        let color = color.unwrap_or_else(|| {
            if store.is_heavy(&TileKey::new(scale, x, y)) {
                HEAVY_TILE_COLOR
            } else {
                TILE_GRID_COLOR
            }
        });
        let cell = grid.rect_of(x, y).inflate(-GRID_INSET, -GRID_INSET);
        surface.draw_rect(cell, &Paint::stroke(GRID_STROKE, color));
    }
}

impl Pyramid {
    /// Draw the grid of level `scale`, and optionally its coarser
    /// neighbour's grid mapped into the same pixel space.
    pub fn draw_debug_overlay(
        &self,
        scale: Scale,
        viewport: Rect,
        store: &dyn TileStore,
        surface: &mut dyn Surface,
        include_low: bool,
    ) -> Result<(), PyramidError> {
        let node = self.node(scale)?;
        draw_debug_grid(store, scale, viewport, surface, None);

        if let Some(low) = node.low().filter(|_| include_low) {
            let rel = scale.ratio_to(low);
            surface.save();
            surface.scale(rel, rel);
            draw_debug_grid(
                store,
                low,
                viewport.scale_from_origin(1.0 / rel),
                surface,
                Some(LOW_GRID_COLOR),
            );
            surface.restore();
        }
        Ok(())
    }
}
