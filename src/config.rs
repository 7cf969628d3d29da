//! Configuration management for canvas-tiles.
//!
//! This module provides the render command's configuration:
//! - Command-line arguments via clap
//! - Environment variables with `CANVAS_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use canvas_tiles::config::Config;
//!
//! let config = Config::parse();
//! config.validate()?;
//!
//! let viewer = Viewer::new(config.viewer_config())?;
//! ```
//!
//! # Environment Variables
//!
//! - `CANVAS_TILE_SIZE` - Tile cell side in pixels (default: 256)
//! - `CANVAS_CACHE_BYTES` - Tile cache capacity in bytes (default: 256MB)
//! - `CANVAS_CACHE_ENTRIES` - Maximum cached tiles (default: 10000)
//! - `CANVAS_WORKERS` - Production worker tasks (default: 4)
//! - `CANVAS_SCALE` - Zoom scale to render at (default: 1.0)
//! - `CANVAS_VIEWPORT` - Visible rectangle `x,y,w,h` in pixels of the scale
//! - `CANVAS_CONTENT` - Document extent `x,y,w,h` in content units
//! - `CANVAS_FRAMES` - Maximum frames to render (default: 8)
//! - `CANVAS_FRAME_INTERVAL_MS` - Delay between frames (default: 16)
//! - `CANVAS_OUTPUT` - PNG output path (default: frame.png)
//! - `CANVAS_LATENCY_MS` - Artificial per-tile production delay (default: 0)

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use kurbo::Rect;

use crate::error::ScaleError;
use crate::producer::{WorkerConfig, DEFAULT_HEAVY_THRESHOLD};
use crate::tile::{Scale, DEFAULT_MAX_ENTRIES, DEFAULT_TILE_CACHE_CAPACITY, DEFAULT_TILE_SIZE};
use crate::viewer::ViewerConfig;

// =============================================================================
// Default Values
// =============================================================================

/// Default number of production workers.
pub const DEFAULT_WORKERS: usize = 4;

/// Default number of frames rendered before giving up on completeness.
pub const DEFAULT_FRAMES: u32 = 8;

/// Default delay between frames in milliseconds.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Largest accepted output surface side in pixels.
pub const MAX_SURFACE_SIDE: f64 = 16384.0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// canvas-tiles - Render a zoomable canvas viewport from multi-resolution tiles.
///
/// Renders the viewport repeatedly while background workers produce tiles,
/// so early frames show content borrowed from neighbouring zoom levels and
/// later frames converge on the exact scale.
#[derive(Parser, Debug, Clone)]
#[command(name = "canvas-tiles")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Tile Configuration
    // =========================================================================
    /// Tile cell side in pixels.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "CANVAS_TILE_SIZE")]
    pub tile_size: u32,

    /// Tile cache capacity in bytes of pixel data.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "CANVAS_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// Maximum number of cached tiles.
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES, env = "CANVAS_CACHE_ENTRIES")]
    pub cache_entries: usize,

    /// Number of concurrent tile production tasks.
    #[arg(long, default_value_t = DEFAULT_WORKERS, env = "CANVAS_WORKERS")]
    pub workers: usize,

    // =========================================================================
    // View Configuration
    // =========================================================================
    /// Zoom scale (device pixels per content unit).
    #[arg(short, long, default_value_t = 1.0, env = "CANVAS_SCALE")]
    pub scale: f64,

    /// Visible rectangle as `x,y,w,h`, in pixels at the chosen scale.
    #[arg(long, default_value = "0,0,1024,768", value_parser = parse_rect, env = "CANVAS_VIEWPORT")]
    pub viewport: Rect,

    /// Document content extent as `x,y,w,h`, in content units.
    #[arg(long, default_value = "0,0,4096,4096", value_parser = parse_rect, env = "CANVAS_CONTENT")]
    pub content: Rect,

    // =========================================================================
    // Render Loop Configuration
    // =========================================================================
    /// Maximum number of frames to render.
    ///
    /// Rendering stops early once a frame is drawn entirely from exact tiles.
    #[arg(long, default_value_t = DEFAULT_FRAMES, env = "CANVAS_FRAMES")]
    pub frames: u32,

    /// Delay between frames in milliseconds.
    #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL_MS, env = "CANVAS_FRAME_INTERVAL_MS")]
    pub frame_interval_ms: u64,

    /// Path of the PNG written with the last frame.
    #[arg(short, long, default_value = "frame.png", env = "CANVAS_OUTPUT")]
    pub output: PathBuf,

    /// Artificial delay added to every tile production, in milliseconds.
    #[arg(long, default_value_t = 0, env = "CANVAS_LATENCY_MS")]
    pub latency_ms: u64,

    /// Tint tiles by pyramid level so borrowed content stands out.
    #[arg(long, default_value_t = false)]
    pub tint: bool,

    // =========================================================================
    // Debug Configuration
    // =========================================================================
    /// Outline tiles of the current level (heavy tiles in red).
    #[arg(long, default_value_t = false)]
    pub debug_grid: bool,

    /// Also outline tiles of the next coarser level (implies --debug-grid).
    #[arg(long, default_value_t = false)]
    pub debug_low_grid: bool,

    /// Print a JSON report of every frame to stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.cache_bytes == 0 {
            return Err("cache_bytes must be greater than 0".to_string());
        }
        if self.cache_entries == 0 {
            return Err("cache_entries must be greater than 0".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }
        if self.frames == 0 {
            return Err("frames must be greater than 0".to_string());
        }

        self.scale().map_err(|e| e.to_string())?;

        let (width, height) = (self.viewport.width(), self.viewport.height());
        if width < 1.0 || height < 1.0 {
            return Err("viewport must be at least 1x1 pixels".to_string());
        }
        if width > MAX_SURFACE_SIDE || height > MAX_SURFACE_SIDE {
            return Err(format!(
                "viewport must be at most {MAX_SURFACE_SIDE}x{MAX_SURFACE_SIDE} pixels"
            ));
        }
        if self.content.area() <= 0.0 {
            return Err("content extent must have a positive area".to_string());
        }

        Ok(())
    }

    /// The validated zoom scale.
    pub fn scale(&self) -> Result<Scale, ScaleError> {
        Scale::new(self.scale)
    }

    /// Output surface size in whole pixels.
    pub fn surface_size(&self) -> (u32, u32) {
        (
            self.viewport.width().ceil() as u32,
            self.viewport.height().ceil() as u32,
        )
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Settings for the library-side viewer.
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            tile_size: self.tile_size,
            cache_capacity: self.cache_bytes,
            max_entries: self.cache_entries,
            content: Some(self.content),
            debug_grid: self.debug_grid || self.debug_low_grid,
            debug_low_grid: self.debug_low_grid,
        }
    }

    /// Settings for the production worker pool.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            workers: self.workers,
            heavy_threshold: DEFAULT_HEAVY_THRESHOLD,
        }
    }
}

/// Parse `x,y,w,h` into a rectangle.
pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;

    match parts.as_slice() {
        &[x, y, w, h] if [x, y, w, h].iter().all(|v| v.is_finite()) && w >= 0.0 && h >= 0.0 => {
            Ok(Rect::new(x, y, x + w, y + h))
        }
        &[_, _, _, _] => Err(format!(
            "invalid rectangle '{s}': values must be finite and sizes non-negative"
        )),
        _ => Err(format!("invalid rectangle '{s}': expected x,y,w,h")),
    }
}

// =============================================================================
// Tests
// =============================================================================
