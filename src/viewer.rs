//! View session.
//!
//! A [`Viewer`] ties one [`TileCache`] to one [`Pyramid`] and decides which
//! levels exist. Every requested scale gets its canonical floor as a
//! permanent level; a non-canonical scale additionally gets an "ideal" level
//! of its own, and at most one such level is kept at a time.
//!
//! # Example
//!
//! ```
//! use canvas_tiles::surface::RasterSurface;
//! use canvas_tiles::tile::Scale;
//! use canvas_tiles::viewer::{Viewer, ViewerConfig};
//! use kurbo::Rect;
//!
//! let mut viewer = Viewer::new(ViewerConfig {
//!     content: Some(Rect::new(0.0, 0.0, 1024.0, 1024.0)),
//!     ..ViewerConfig::default()
//! })
//! .unwrap();
//!
//! let mut surface = RasterSurface::new(512, 512);
//! let report = viewer
//!     .render(Scale::new(1.5).unwrap(), Rect::new(0.0, 0.0, 512.0, 512.0), &mut surface)
//!     .unwrap();
//!
//! // nothing produced yet: every visible tile was requested
//! assert_eq!(report.cells_missing, report.cells());
//! assert!(viewer.cache().pending_requests() > 0);
//! ```

use std::sync::Arc;

use kurbo::Rect;
use tracing::debug;

use crate::error::{GridError, PyramidError};
use crate::pyramid::{DrawContext, FrameReport, Pyramid};
use crate::surface::Surface;
use crate::tile::{
    Scale, TileCache, TileGrid, TileStore, DEFAULT_MAX_ENTRIES, DEFAULT_TILE_CACHE_CAPACITY,
    DEFAULT_TILE_SIZE,
};

/// Library-side viewer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Tile cell side in pixels
    pub tile_size: u32,

    /// Cache capacity in bytes of pixel data
    pub cache_capacity: usize,

    /// Maximum number of cached tiles
    pub max_entries: usize,

    /// Document content extent in content units; `None` means nothing to draw
    pub content: Option<Rect>,

    /// Outline the current level's tiles
    pub debug_grid: bool,

    /// Also outline the coarser neighbour's tiles
    pub debug_low_grid: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            max_entries: DEFAULT_MAX_ENTRIES,
            content: None,
            debug_grid: false,
            debug_low_grid: false,
        }
    }
}

/// One view session over a shared tile cache.
#[derive(Debug)]
pub struct Viewer {
    cache: Arc<TileCache>,
    pyramid: Pyramid,
    ideal: Option<Scale>,
    config: ViewerConfig,
}

impl Viewer {
    /// Create a viewer with a fresh cache.
    pub fn new(config: ViewerConfig) -> Result<Self, GridError> {
        let grid = TileGrid::square(config.tile_size)?;
        let cache = TileCache::with_capacity_and_entries(
            grid,
            config.cache_capacity,
            config.max_entries,
        );
        Ok(Self::with_cache(Arc::new(cache), config))
    }

    /// Create a viewer over an existing cache.
    ///
    /// The cache keeps its own grid; `config.tile_size` and the capacities
    /// are ignored. A configured content extent replaces the cache's.
    pub fn with_cache(cache: Arc<TileCache>, config: ViewerConfig) -> Self {
        if let Some(content) = config.content {
            cache.set_content_extent(content);
        }
        Self {
            cache,
            pyramid: Pyramid::new(),
            ideal: None,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    pub fn pyramid(&self) -> &Pyramid {
        &self.pyramid
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// The non-canonical level currently kept, if any.
    pub fn ideal_scale(&self) -> Option<Scale> {
        self.ideal
    }

    /// Make sure the levels needed to view at `scale` exist.
    ///
    /// Moving away from a non-canonical scale retires its level and drops
    /// its tiles.
    pub fn select_scale(&mut self, scale: Scale) -> Result<(), PyramidError> {
        self.pyramid.ensure(scale.floor_pow2())?;

        if let Some(previous) = self.ideal.filter(|&ideal| ideal != scale) {
            self.pyramid.remove(previous);
            self.cache.invalidate_scale(previous);
            self.ideal = None;
            debug!(scale = %previous, "retired ideal level");
        }

        if !scale.is_canonical() {
            self.pyramid.ensure(scale)?;
            self.ideal = Some(scale);
        }
        Ok(())
    }

    /// Draw `viewport` (pixel space of `scale`) with its top-left corner at
    /// the surface origin.
    pub fn render(
        &mut self,
        scale: Scale,
        viewport: Rect,
        surface: &mut dyn Surface,
    ) -> Result<FrameReport, PyramidError> {
        self.select_scale(scale)?;

        surface.save();
        surface.translate(-viewport.x0, -viewport.y0);

        let mut ctx = DrawContext::new(self.cache.as_ref(), &mut *surface);
        let drawn = self.pyramid.draw_viewport(scale, viewport, &mut ctx);
        let report = ctx.into_report();

        let overlay = match drawn {
            Ok(()) if self.config.debug_grid => self.pyramid.draw_debug_overlay(
                scale,
                viewport,
                self.cache.as_ref(),
                &mut *surface,
                self.config.debug_low_grid,
            ),
            other => other,
        };
        surface.restore();
        overlay?;

        debug!(
            %scale,
            drawn = report.tiles_drawn,
            borrowed = report.cells_borrowed,
            missing = report.cells_missing,
            requests = report.requests.len(),
            "frame rendered"
        );
        Ok(report)
    }

    /// Drop the tiles of one level, e.g. after the content under it changed.
    pub fn invalidate_scale(&self, scale: Scale) -> Result<(), PyramidError> {
        self.pyramid.clear_level(scale, self.cache.as_ref())
    }

    /// Drop the tiles of every level.
    pub fn invalidate_all(&self) {
        for scale in self.pyramid.scales() {
            self.cache.invalidate_scale(scale);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
