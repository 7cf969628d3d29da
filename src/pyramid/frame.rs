use kurbo::Rect;
use serde::Serialize;

use crate::surface::Surface;
use crate::tile::{Priority, TileGrid, TileKey, TileStore};

/// A production request issued while drawing one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssuedRequest {
    pub key: TileKey,
    pub priority: Priority,
}

/// What one viewport draw did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    /// Cells drawn from a tile at the exact scale
    pub tiles_drawn: usize,

    /// Cells whose exact tile was missing but a neighbour covered them fully
    pub cells_borrowed: usize,

    /// Cells left partly or fully blank
    pub cells_missing: usize,

    /// Tiles from other scales drawn as substitutes
    pub tiles_borrowed: usize,

    /// Deepest chain of neighbour hops taken by a single borrow
    pub max_borrow_depth: usize,

    /// Every production request issued, in order
    pub requests: Vec<IssuedRequest>,
}

impl FrameReport {
    /// Cells visited in the viewport.
    pub fn cells(&self) -> usize {
        self.tiles_drawn + self.cells_borrowed + self.cells_missing
    }

    /// Number of requests issued at `priority`.
    pub fn requests_at(&self, priority: Priority) -> usize {
        self.requests
            .iter()
            .filter(|r| r.priority == priority)
            .count()
    }

    /// Whether every cell was drawn from exact-scale tiles.
    pub fn is_complete(&self) -> bool {
        self.cells_borrowed == 0 && self.cells_missing == 0 && self.requests.is_empty()
    }
}

/// Everything one draw call needs: the tile store, the output surface and the
/// report being filled in.
pub struct DrawContext<'a> {
    store: &'a dyn TileStore,
    surface: &'a mut dyn Surface,
    grid: TileGrid,
    report: FrameReport,
}

impl<'a> DrawContext<'a> {
    pub fn new(store: &'a dyn TileStore, surface: &'a mut dyn Surface) -> Self {
        Self {
            grid: store.grid(),
            store,
            surface,
            report: FrameReport::default(),
        }
    }

    pub fn grid(&self) -> TileGrid {
        self.grid
    }

    pub fn store(&self) -> &'a dyn TileStore {
        self.store
    }

    pub fn surface(&mut self) -> &mut dyn Surface {
        &mut *self.surface
    }

    pub fn report(&self) -> &FrameReport {
        &self.report
    }

    pub(super) fn report_mut(&mut self) -> &mut FrameReport {
        &mut self.report
    }

    pub fn into_report(self) -> FrameReport {
        self.report
    }

    /// Draw the resident tile for `key` at its cell rectangle.
    ///
    /// Returns `false` without drawing when the tile is absent.
    pub(super) fn draw_tile(&mut self, key: TileKey) -> bool {
        let Some(image) = self.store.get(&key) else {
            return false;
        };
        let src = Rect::new(0.0, 0.0, image.width() as f64, image.height() as f64);
        let dst = self.grid.rect_of(key.x, key.y);
        self.surface.draw_image(&image, src, dst);
        true
    }

    /// Forward a production request to the store and record it.
    pub(super) fn request(&mut self, key: TileKey, priority: Priority) {
        self.store.request_production(key, priority);
        self.report.requests.push(IssuedRequest { key, priority });
    }
}
