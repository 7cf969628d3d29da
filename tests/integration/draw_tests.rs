//! Viewport draw integration tests.
//!
//! Tests verify:
//! - Fully cached viewports issue no production requests
//! - Missing tiles are requested once each at Low priority
//! - Every covered cell receives content when a coarser level is complete
//! - Invalidation forces every tile to be requested again

use std::collections::HashSet;

use kurbo::Rect;

use canvas_tiles::pyramid::{DrawContext, Pyramid};
use canvas_tiles::surface::RasterSurface;
use canvas_tiles::tile::{Priority, TileCache, TileGrid, TileKey, TileStore};

use super::test_utils::{color_for, scale, solid_tile, RecordingStore, RecordingSurface};

const CELL: u32 = 16;

fn grid() -> TileGrid {
    TileGrid::square(CELL).unwrap()
}

// =============================================================================
// Exact Tiles
// =============================================================================

#[test]
fn test_fully_cached_viewport_issues_no_requests() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 64.0, 64.0));
    store.fill_scale(scale(1.0));
    let pyramid = Pyramid::from_scales([scale(0.5), scale(1.0), scale(2.0)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(1.0), Rect::new(0.0, 0.0, 64.0, 64.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert!(store.requests().is_empty());
    assert_eq!(report.tiles_drawn, 16);
    assert!(report.is_complete());
    assert_eq!(surface.images().len(), 16);
}

#[test]
fn test_viewport_clipped_to_content_bounds() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 32.0, 32.0));
    let pyramid = Pyramid::from_scales([scale(1.0)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(1.0), Rect::new(-100.0, -100.0, 100.0, 100.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert_eq!(report.cells(), 4);
    let requested: HashSet<(i32, i32)> = store.requests().iter().map(|(k, _)| (k.x, k.y)).collect();
    assert_eq!(requested, HashSet::from([(0, 0), (1, 0), (0, 1), (1, 1)]));
}

// =============================================================================
// Coarser Coverage
// =============================================================================

#[test]
fn test_coarser_coverage_draws_every_cell() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 64.0, 64.0));
    store.fill_scale(scale(1.0));
    let pyramid = Pyramid::from_scales([scale(1.0), scale(2.0)]).unwrap();

    let mut surface = RasterSurface::new(128, 128);
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(2.0), Rect::new(0.0, 0.0, 128.0, 128.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    // 8x8 cells at scale 2, none cached
    assert_eq!(report.cells(), 64);
    assert_eq!(report.cells_borrowed, 64);

    let low = store.requests_at(Priority::Low);
    assert_eq!(low.len(), 64);
    let unique: HashSet<TileKey> = low.iter().copied().collect();
    assert_eq!(unique.len(), 64, "duplicate requests in one draw");
    assert!(low.iter().all(|k| k.scale == scale(2.0)));
    assert_eq!(store.requests().len(), 64);

    let expected = color_for(scale(1.0));
    for y in 0..128 {
        for x in 0..128 {
            assert_eq!(surface.pixel(x, y), expected, "blank pixel at ({x}, {y})");
        }
    }
}

#[test]
fn test_canonical_requester_never_escalates() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 32.0, 32.0));
    store.fill_scale(scale(0.5));
    let pyramid =
        Pyramid::from_scales([scale(0.5), scale(1.0), scale(2.0), scale(4.0), scale(8.0)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(8.0), Rect::new(0.0, 0.0, 64.0, 64.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert_eq!(report.cells_borrowed, 16);
    assert!(store.requests_at(Priority::High).is_empty());
    assert!(store.requests_at(Priority::Middle).is_empty());
    assert_eq!(store.requests_at(Priority::Low).len(), 16);
}

// =============================================================================
// Invalidation
// =============================================================================

#[test]
fn test_invalidate_then_redraw_requests_everything() {
    let cache = TileCache::new(grid());
    cache.set_content_extent(Rect::new(0.0, 0.0, 24.0, 24.0));
    let s2 = scale(2.0);
    let pyramid = Pyramid::from_scales([s2]).unwrap();

    let bounds = cache.content_bounds(s2);
    assert_eq!(bounds.len(), 9);
    for (x, y) in bounds.iter() {
        cache.insert(TileKey::new(s2, x, y), solid_tile(grid(), s2));
    }

    // a producer took a request before the invalidation
    cache.request_production(TileKey::new(s2, 5, 5), Priority::Low);
    let stale_ticket = cache.try_next_request().unwrap();

    pyramid.clear_level(s2, &cache).unwrap();
    assert!(!cache.complete(stale_ticket, solid_tile(grid(), s2)));

    let mut surface = RasterSurface::new(48, 48);
    let mut ctx = DrawContext::new(&cache, &mut surface);
    pyramid
        .draw_viewport(s2, Rect::new(0.0, 0.0, 48.0, 48.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert_eq!(report.tiles_drawn, 0);
    assert_eq!(report.cells_missing, 9);

    let pending: HashSet<TileKey> = cache.pending_snapshot().into_iter().map(|(k, _)| k).collect();
    let expected: HashSet<TileKey> = bounds.iter().map(|(x, y)| TileKey::new(s2, x, y)).collect();
    assert_eq!(pending, expected);

    for y in 0..48 {
        for x in 0..48 {
            assert_eq!(surface.pixel(x, y), [0, 0, 0, 0]);
        }
    }
}

#[test]
fn test_invalidation_keeps_other_levels() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 32.0, 32.0));
    store.fill_scale(scale(1.0));
    store.fill_scale(scale(2.0));
    let pyramid = Pyramid::from_scales([scale(1.0), scale(2.0)]).unwrap();

    pyramid.clear_level(scale(2.0), &store).unwrap();
    assert_eq!(store.invalidated(), vec![scale(2.0)]);
    assert!(store.has(&TileKey::new(scale(1.0), 0, 0)));
    assert!(!store.has(&TileKey::new(scale(2.0), 0, 0)));
    assert_eq!(pyramid.len(), 2);
}
