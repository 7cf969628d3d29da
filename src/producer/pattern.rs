use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::error::ProduceError;
use crate::tile::{TileGrid, TileImage, TileKey};

use super::TileProducer;

/// Appearance of the procedural content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternConfig {
    /// Checker square side in content units
    pub cell: f64,

    /// Colour of even squares
    pub light: [u8; 4],

    /// Colour of odd squares
    pub dark: [u8; 4],

    /// Shift the hue by pyramid level so borrowed content is visible
    pub tint_by_scale: bool,

    /// Artificial delay before each tile
    pub latency: Duration,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cell: 64.0,
            light: [235, 235, 225, 255],
            dark: [60, 70, 90, 255],
            tint_by_scale: false,
            latency: Duration::ZERO,
        }
    }
}

/// Produces a checkerboard laid out in content space.
///
/// The same content point lands on the same square at every scale, so
/// borrowed tiles line up with exact ones.
#[derive(Debug, Clone, Default)]
pub struct PatternProducer {
    config: PatternConfig,
}

impl PatternProducer {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// Rasterize one tile synchronously.
    pub fn render(&self, key: TileKey, grid: TileGrid) -> TileImage {
        let (width, height) = grid.cell_pixels();
        let origin = grid.rect_of(key.x, key.y).origin();
        let scale = key.scale.get();
        let cell = self.config.cell.max(f64::MIN_POSITIVE);
        let tint = self.tint(key);

        let image = RgbaImage::from_fn(width, height, |px, py| {
            // content coordinates of the pixel center
            let cx = (origin.x + px as f64 + 0.5) / scale;
            let cy = (origin.y + py as f64 + 0.5) / scale;
            let parity = ((cx / cell).floor() as i64 + (cy / cell).floor() as i64).rem_euclid(2);
            let base = if parity == 0 {
                self.config.light
            } else {
                self.config.dark
            };
            Rgba(tinted(base, tint))
        });
        TileImage::from(image)
    }

    fn tint(&self, key: TileKey) -> Option<[u8; 4]> {
        if !self.config.tint_by_scale {
            return None;
        }
        let level = key.scale.get().log2().floor() as i64;
        const PALETTE: [[u8; 4]; 4] = [
            [255, 80, 80, 255],
            [80, 200, 80, 255],
            [80, 120, 255, 255],
            [230, 180, 40, 255],
        ];
        Some(PALETTE[level.rem_euclid(PALETTE.len() as i64) as usize])
    }
}

fn tinted(base: [u8; 4], tint: Option<[u8; 4]>) -> [u8; 4] {
    match tint {
        None => base,
        Some(t) => [
            ((base[0] as u16 * 3 + t[0] as u16) / 4) as u8,
            ((base[1] as u16 * 3 + t[1] as u16) / 4) as u8,
            ((base[2] as u16 * 3 + t[2] as u16) / 4) as u8,
            base[3],
        ],
    }
}

#[async_trait]
impl TileProducer for PatternProducer {
    async fn produce(&self, key: TileKey, grid: TileGrid) -> Result<TileImage, ProduceError> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        let producer = self.clone();
        tokio::task::spawn_blocking(move || producer.render(key, grid))
            .await
            .map_err(|e| ProduceError::Failed {
                scale: key.scale.get(),
                x: key.x,
                y: key.y,
                message: e.to_string(),
            })
    }
}
