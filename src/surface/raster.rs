//! Software raster surface.
//!
//! Supports the axis-aligned transforms the pyramid issues (scale and
//! translate), rectangular clips, nearest-neighbour image sampling and
//! source-over blending. A device pixel is covered by a shape when its
//! center lies inside it, so adjacent tiles never double-cover a pixel.

use std::path::Path;

use image::{Rgba, RgbaImage};
use kurbo::{Affine, Rect};

use super::{ClipOp, Paint, PaintStyle, Surface};
use crate::tile::TileImage;

#[derive(Debug, Clone)]
struct DrawState {
    transform: Affine,
    /// Device-space clip
    clip: Rect,
    /// Device-space rectangles removed by `ClipOp::Difference`
    holes: Vec<Rect>,
}

/// A [`Surface`] that rasterizes into an owned RGBA image.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    target: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl RasterSurface {
    /// A transparent surface of `width x height` device pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, [0, 0, 0, 0])
    }

    /// A surface cleared to `background`.
    pub fn with_background(width: u32, height: u32, background: [u8; 4]) -> Self {
        Self {
            target: RgbaImage::from_pixel(width, height, Rgba(background)),
            state: DrawState {
                transform: Affine::IDENTITY,
                clip: Rect::new(0.0, 0.0, width as f64, height as f64),
                holes: Vec::new(),
            },
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    /// Device pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.target.get_pixel(x, y).0
    }

    /// Fill every pixel with `color`, ignoring transform and clip.
    pub fn clear(&mut self, color: [u8; 4]) {
        for px in self.target.pixels_mut() {
            *px = Rgba(color);
        }
    }

    /// Current save depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.target
    }

    pub fn into_image(self) -> RgbaImage {
        self.target
    }

    /// Write the surface as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.target
            .save_with_format(path, image::ImageFormat::Png)
    }

    /// Visible device-space bounds of `device`, or `None` when fully clipped.
    fn visible(&self, device: Rect) -> Option<Rect> {
        let bounds = Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64);
        let visible = device.intersect(self.state.clip).intersect(bounds);
        if visible.width() <= 0.0 || visible.height() <= 0.0 {
            None
        } else {
            Some(visible)
        }
    }

    /// Device pixels whose centers lie in `visible` and outside every hole.
    fn covered_pixels(&self, visible: Rect) -> impl Iterator<Item = (u32, u32, f64, f64)> + '_ {
        let x_start = visible.x0.floor().max(0.0) as u32;
        let y_start = visible.y0.floor().max(0.0) as u32;
        let x_end = visible.x1.ceil() as u32;
        let y_end = visible.y1.ceil() as u32;

        (y_start..y_end)
            .flat_map(move |y| (x_start..x_end).map(move |x| (x, y)))
            .filter_map(move |(x, y)| {
                let cx = x as f64 + 0.5;
                let cy = y as f64 + 0.5;
                let inside = cx >= visible.x0 && cx < visible.x1 && cy >= visible.y0 && cy < visible.y1;
                let in_hole = self
                    .state
                    .holes
                    .iter()
                    .any(|h| cx >= h.x0 && cx < h.x1 && cy >= h.y0 && cy < h.y1);
                (inside && !in_hole).then_some((x, y, cx, cy))
            })
    }

    fn blend(&mut self, x: u32, y: u32, src: [u8; 4]) {
        let alpha = src[3] as f32 / 255.0;
        if alpha <= 0.0 {
            return;
        }
        let dst = self.target.get_pixel_mut(x, y);
        if alpha >= 1.0 {
            *dst = Rgba(src);
            return;
        }
        let inv = 1.0 - alpha;
        for channel in 0..3 {
            let value = src[channel] as f32 * alpha + dst.0[channel] as f32 * inv;
            dst.0[channel] = value.round() as u8;
        }
        let out_alpha = src[3] as f32 + dst.0[3] as f32 * inv;
        dst.0[3] = out_alpha.round().min(255.0) as u8;
    }
}

impl Surface for RasterSurface {
    fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    fn clip_rect(&mut self, rect: Rect, op: ClipOp) {
        let device = self.state.transform.transform_rect_bbox(rect);
        match op {
            ClipOp::Intersect => self.state.clip = self.state.clip.intersect(device),
            ClipOp::Difference => self.state.holes.push(device),
        }
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform = self.state.transform * Affine::scale_non_uniform(sx, sy);
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform = self.state.transform * Affine::translate((dx, dy));
    }

    fn draw_image(&mut self, image: &TileImage, src: Rect, dst: Rect) {
        if src.width() <= 0.0 || src.height() <= 0.0 {
            return;
        }
        let device = self.state.transform.transform_rect_bbox(dst);
        if device.width() <= 0.0 || device.height() <= 0.0 {
            return;
        }
        let Some(visible) = self.visible(device) else {
            return;
        };

        let sx = src.width() / device.width();
        let sy = src.height() / device.height();
        let samples: Vec<(u32, u32, [u8; 4])> = self
            .covered_pixels(visible)
            .map(|(x, y, cx, cy)| {
                let u = (src.x0 + (cx - device.x0) * sx).floor().max(0.0) as u32;
                let v = (src.y0 + (cy - device.y0) * sy).floor().max(0.0) as u32;
                (x, y, image.pixel(u, v))
            })
            .collect();

        for (x, y, color) in samples {
            self.blend(x, y, color);
        }
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        let (outer, inner) = match paint.style {
            PaintStyle::Fill => (rect, None),
            PaintStyle::Stroke { width } => {
                let half = width / 2.0;
                (rect.inflate(half, half), Some(rect.inflate(-half, -half)))
            }
        };
        let outer = self.state.transform.transform_rect_bbox(outer);
        let inner = inner.map(|r| self.state.transform.transform_rect_bbox(r));
        let Some(visible) = self.visible(outer) else {
            return;
        };

        let pixels: Vec<(u32, u32)> = self
            .covered_pixels(visible)
            .filter(|(_, _, cx, cy)| {
                !inner.is_some_and(|r| {
                    r.width() > 0.0
                        && r.height() > 0.0
                        && *cx >= r.x0
                        && *cx < r.x1
                        && *cy >= r.y0
                        && *cy < r.y1
                })
            })
            .map(|(x, y, _, _)| (x, y))
            .collect();

        for (x, y) in pixels {
            self.blend(x, y, paint.color);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
