//! Viewer session integration tests.
//!
//! Tests verify:
//! - Moving between non-canonical scales retires the previous ideal level
//! - The debug overlay draws on top of tiles without affecting requests
//! - Rendered frames can be written out as PNG

use std::sync::Arc;
use std::time::Duration;

use kurbo::Rect;

use canvas_tiles::producer::{PatternConfig, PatternProducer, ProductionWorker, WorkerConfig};
use canvas_tiles::pyramid::{HEAVY_TILE_COLOR, TILE_GRID_COLOR};
use canvas_tiles::surface::RasterSurface;
use canvas_tiles::tile::{Priority, Scale, TileKey, TileStore};
use canvas_tiles::viewer::{Viewer, ViewerConfig};

use super::test_utils::{scale, solid_tile};

fn viewer(debug_grid: bool) -> Viewer {
    Viewer::new(ViewerConfig {
        tile_size: 16,
        content: Some(Rect::new(0.0, 0.0, 64.0, 64.0)),
        debug_grid,
        ..ViewerConfig::default()
    })
    .unwrap()
}

#[test]
fn test_zoom_sequence_retires_ideal_levels() {
    let mut viewer = viewer(false);
    let viewport = Rect::new(0.0, 0.0, 32.0, 32.0);
    let mut surface = RasterSurface::new(32, 32);

    viewer.render(scale(1.5), viewport, &mut surface).unwrap();
    assert!(viewer.cache().pending_snapshot().iter().any(|(k, _)| k.scale == scale(1.5)));

    viewer.render(scale(2.5), viewport, &mut surface).unwrap();
    let scales: Vec<f64> = viewer.pyramid().scales().map(Scale::get).collect();
    assert_eq!(scales, vec![1.0, 2.0, 2.5]);
    assert_eq!(viewer.ideal_scale(), Some(scale(2.5)));

    // requests for the retired level were dropped with it
    assert!(viewer
        .cache()
        .pending_snapshot()
        .iter()
        .all(|(k, _)| k.scale != scale(1.5)));

    viewer.render(scale(4.0), viewport, &mut surface).unwrap();
    let scales: Vec<f64> = viewer.pyramid().scales().map(Scale::get).collect();
    assert_eq!(scales, vec![1.0, 2.0, 4.0]);
    assert_eq!(viewer.ideal_scale(), None);
    assert!(viewer.pyramid().check_chain().is_ok());
}

#[test]
fn test_debug_grid_overlay() {
    let mut viewer = viewer(true);
    let s = scale(1.0);
    viewer.cache().insert(TileKey::new(s, 0, 0), solid_tile(viewer.cache().grid(), s));
    viewer.cache().mark_heavy(TileKey::new(s, 1, 0));

    let mut surface = RasterSurface::new(32, 16);
    let report = viewer
        .render(s, Rect::new(0.0, 0.0, 32.0, 16.0), &mut surface)
        .unwrap();

    assert_eq!(report.tiles_drawn, 1);
    assert_eq!(report.requests_at(Priority::Low), 1);

    // half-transparent outlines blended over the content
    let tile_edge = surface.pixel(2, 8);
    let heavy_edge = surface.pixel(18, 8);
    assert!(tile_edge[2] > heavy_edge[2]);
    assert!(heavy_edge[0] > 0);
    assert_eq!(TILE_GRID_COLOR[0], 0);
    assert_eq!(HEAVY_TILE_COLOR[2], 0);
}

#[tokio::test]
async fn test_rendered_frame_written_as_png() {
    let mut viewer = viewer(false);
    let worker = ProductionWorker::spawn(
        Arc::clone(viewer.cache()),
        Arc::new(PatternProducer::new(PatternConfig {
            cell: 8.0,
            ..PatternConfig::default()
        })),
        WorkerConfig::default(),
    );

    let s = scale(2.0);
    let viewport = Rect::new(16.0, 16.0, 80.0, 64.0);
    let mut surface = RasterSurface::new(64, 48);
    viewer.render(s, viewport, &mut surface).unwrap();
    tokio::time::timeout(Duration::from_secs(5), worker.wait_idle())
        .await
        .unwrap();
    let report = viewer.render(s, viewport, &mut surface).unwrap();
    assert!(report.is_complete());
    worker.shutdown().await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    surface.save_png(&path).unwrap();

    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (64, 48));
    assert_eq!(decoded.get_pixel(0, 0).0, surface.pixel(0, 0));
    assert_eq!(decoded.get_pixel(0, 0).0[3], 255);
}
