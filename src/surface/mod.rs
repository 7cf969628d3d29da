//! Drawing surfaces.
//!
//! The pyramid never owns pixels; it issues calls against a [`Surface`], a
//! retained 2D canvas abstraction with a save/restore state stack.
//! [`RasterSurface`] is a software implementation over an RGBA image, used
//! by the CLI and by tests that inspect rendered pixels.

mod raster;

use kurbo::Rect;

use crate::tile::TileImage;

pub use raster::RasterSurface;

/// How a clip rectangle combines with the current clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOp {
    /// Keep only the area inside both
    Intersect,
    /// Remove the rectangle from the current clip
    Difference,
}

/// Fill or stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaintStyle {
    Fill,
    Stroke { width: f64 },
}

/// Colour and style used by [`Surface::draw_rect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    /// Straight (non-premultiplied) RGBA
    pub color: [u8; 4],
    pub style: PaintStyle,
}

impl Paint {
    pub fn fill(color: [u8; 4]) -> Self {
        Self {
            color,
            style: PaintStyle::Fill,
        }
    }

    pub fn stroke(width: f64, color: [u8; 4]) -> Self {
        Self {
            color,
            style: PaintStyle::Stroke { width },
        }
    }
}

/// A 2D drawing capability.
///
/// Coordinates passed to drawing calls are in the current user space, which
/// `scale`/`translate` modify and `save`/`restore` bracket.
pub trait Surface {
    /// Push the current transform and clip.
    fn save(&mut self);

    /// Pop the transform and clip pushed by the matching [`Surface::save`].
    fn restore(&mut self);

    /// Combine the clip with `rect` (in user space).
    fn clip_rect(&mut self, rect: Rect, op: ClipOp);

    /// Post-multiply the transform by a scale.
    fn scale(&mut self, sx: f64, sy: f64);

    /// Post-multiply the transform by a translation.
    fn translate(&mut self, dx: f64, dy: f64);

    /// Draw the `src` part of `image` (image pixels) into `dst` (user space).
    fn draw_image(&mut self, image: &TileImage, src: Rect, dst: Rect);

    /// Fill or stroke `rect` (user space).
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);
}
