use std::fmt;

use serde::Serialize;

use super::scale::Scale;

// =============================================================================
// Tile Key
// =============================================================================

/// Identifies one fixed-size cache cell at one pyramid scale.
///
/// Columns and rows index a uniform grid whose cell size is constant in
/// pixels regardless of scale; negative indices are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileKey {
    /// Pyramid scale
    pub scale: Scale,

    /// Tile column (0 at the content origin, growing right)
    pub x: i32,

    /// Tile row (0 at the content origin, growing down)
    pub y: i32,
}

impl TileKey {
    /// Create a new tile key.
    pub fn new(scale: Scale, x: i32, y: i32) -> Self {
        Self { scale, x, y }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.scale, self.x, self.y)
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Scheduling urgency of a tile production request.
///
/// Priority only orders work; a request issued at any priority is eventually
/// served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// The exact tile for the viewed scale; something else is usually borrowed meanwhile
    Low,
    /// A canonical level backing a non-canonical view, already partly covered
    Middle,
    /// A canonical level backing a non-canonical view with nothing to show
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Middle, Priority::High];
}
