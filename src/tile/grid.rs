//! Fixed-size tile grid.
//!
//! Every pyramid level is cut into cells of the same pixel size; only the
//! density of content inside a cell differs between scales. This module
//! converts between pixel rectangles and the half-open tile-index ranges
//! that cover them.

use kurbo::Rect;
use serde::Serialize;

use crate::error::GridError;

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

// =============================================================================
// Tile Index Range
// =============================================================================

/// A half-open rectangle of tile indices: `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TileIndexRange {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TileIndexRange {
    /// The empty range.
    pub const EMPTY: TileIndexRange = TileIndexRange {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Whether the range holds no index at all.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Number of tile indices in the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let columns = (self.right as i64 - self.left as i64) as usize;
        let rows = (self.bottom as i64 - self.top as i64) as usize;
        columns * rows
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    /// The overlap of two ranges; empty ranges normalize to [`Self::EMPTY`].
    pub fn intersect(&self, other: &TileIndexRange) -> TileIndexRange {
        let range = TileIndexRange {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if range.is_empty() {
            Self::EMPTY
        } else {
            range
        }
    }

    /// Iterate over `(x, y)` indices in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32)> {
        let range = if self.is_empty() { Self::EMPTY } else { *self };
        (range.top..range.bottom)
            .flat_map(move |y| (range.left..range.right).map(move |x| (x, y)))
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Minimal index range whose cells of `cell_width x cell_height` cover `rect`.
///
/// Zero-area, inverted or non-finite rectangles map to the empty range.
pub fn index_range_of(rect: Rect, cell_width: f64, cell_height: f64) -> TileIndexRange {
    let finite = rect.x0.is_finite()
        && rect.y0.is_finite()
        && rect.x1.is_finite()
        && rect.y1.is_finite();
    if !finite || rect.x1 <= rect.x0 || rect.y1 <= rect.y0 {
        return TileIndexRange::EMPTY;
    }

    TileIndexRange {
        left: to_index((rect.x0 / cell_width).floor()),
        top: to_index((rect.y0 / cell_height).floor()),
        right: to_index((rect.x1 / cell_width).ceil()),
        bottom: to_index((rect.y1 / cell_height).ceil()),
    }
}

/// Pixel rectangle of cell `(x, y)`.
pub fn rect_of(x: i32, y: i32, cell_width: f64, cell_height: f64) -> Rect {
    let x0 = x as f64 * cell_width;
    let y0 = y as f64 * cell_height;
    Rect::new(x0, y0, x0 + cell_width, y0 + cell_height)
}

fn to_index(value: f64) -> i32 {
    // `as` saturates, which keeps absurdly far rectangles finite.
    value as i32
}

// =============================================================================
// Tile Grid
// =============================================================================

/// The uniform cell size shared by every pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileGrid {
    cell_width: f64,
    cell_height: f64,
}

impl TileGrid {
    /// Create a grid with the given cell dimensions in pixels.
    pub fn new(cell_width: f64, cell_height: f64) -> Result<Self, GridError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(cell_width) || !valid(cell_height) {
            return Err(GridError::InvalidCellSize {
                width: cell_width,
                height: cell_height,
            });
        }
        Ok(Self {
            cell_width,
            cell_height,
        })
    }

    /// Create a grid of square cells.
    pub fn square(size: u32) -> Result<Self, GridError> {
        Self::new(size as f64, size as f64)
    }

    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    /// Cell dimensions rounded to whole pixels, for allocating tile images.
    pub fn cell_pixels(&self) -> (u32, u32) {
        (
            self.cell_width.ceil() as u32,
            self.cell_height.ceil() as u32,
        )
    }

    /// Pixel rectangle of a single cell, anchored at the origin.
    pub fn cell_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.cell_width, self.cell_height)
    }

    /// Minimal index range covering `rect`.
    pub fn index_range(&self, rect: Rect) -> TileIndexRange {
        index_range_of(rect, self.cell_width, self.cell_height)
    }

    /// Pixel rectangle of cell `(x, y)`.
    pub fn rect_of(&self, x: i32, y: i32) -> Rect {
        rect_of(x, y, self.cell_width, self.cell_height)
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            cell_width: DEFAULT_TILE_SIZE as f64,
            cell_height: DEFAULT_TILE_SIZE as f64,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
