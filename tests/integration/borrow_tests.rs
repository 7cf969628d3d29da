//! Cross-resolution borrow integration tests.
//!
//! Tests verify:
//! - The two-level downsampling scenario draws four quarter-size tiles
//! - Non-canonical requesters escalate coarser-level requests
//! - Recursion depth is bounded by the chain length
//! - Surface state is balanced after every borrow

use kurbo::Rect;

use canvas_tiles::pyramid::{DrawContext, Pyramid};
use canvas_tiles::surface::ClipOp;
use canvas_tiles::tile::{Priority, TileGrid, TileKey};

use super::test_utils::{scale, DrawOp, RecordingStore, RecordingSurface};

fn grid() -> TileGrid {
    TileGrid::square(16).unwrap()
}

#[test]
fn test_downsample_from_finer_level() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 16.0, 16.0));
    for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        store.insert(TileKey::new(scale(2.0), x, y));
    }
    let pyramid = Pyramid::from_scales([scale(1.0), scale(2.0)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(1.0), grid().rect_of(0, 0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert_eq!(
        store.requests(),
        vec![(TileKey::new(scale(1.0), 0, 0), Priority::Low)]
    );
    assert!(store.requests_at(Priority::High).is_empty());
    assert_eq!(report.cells_borrowed, 1);
    assert_eq!(report.tiles_borrowed, 4);

    let mut images = surface.images();
    images.sort_by(|a, b| (a.y0, a.x0).partial_cmp(&(b.y0, b.x0)).unwrap());
    assert_eq!(
        images,
        vec![
            Rect::new(0.0, 0.0, 8.0, 8.0),
            Rect::new(8.0, 0.0, 16.0, 8.0),
            Rect::new(0.0, 8.0, 8.0, 16.0),
            Rect::new(8.0, 8.0, 16.0, 16.0),
        ]
    );

    // clipped to the requester's cell, then scaled down by half
    assert_eq!(
        &surface.ops[..3],
        &[
            DrawOp::Save,
            DrawOp::Clip(Rect::new(0.0, 0.0, 16.0, 16.0), ClipOp::Intersect),
            DrawOp::Scale(0.5, 0.5),
        ]
    );
    assert_eq!(surface.depth(), 0);
}

#[test]
fn test_non_canonical_requester_escalates() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 16.0, 16.0));
    store.fill_scale(scale(0.5));
    let pyramid = Pyramid::from_scales([scale(0.5), scale(1.0), scale(1.5)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(1.5), Rect::new(0.0, 0.0, 24.0, 24.0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    // 1.0 tiles are missing but 0.5 covers them: wanted, not urgently
    assert!(store.requests_at(Priority::High).is_empty());
    let middle = store.requests_at(Priority::Middle);
    assert!(!middle.is_empty());
    assert!(middle.iter().all(|k| k.scale == scale(1.0)));
    assert_eq!(report.cells_borrowed, report.cells());
}

#[test]
fn test_non_canonical_requester_with_nothing_cached() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 16.0, 16.0));
    let pyramid = Pyramid::from_scales([scale(1.0), scale(1.5)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(1.5), Rect::new(0.0, 0.0, 24.0, 24.0), &mut ctx)
        .unwrap();

    let high = store.requests_at(Priority::High);
    assert!(!high.is_empty());
    assert!(high.iter().all(|k| k.scale == scale(1.0)));
    assert!(store
        .requests_at(Priority::Low)
        .iter()
        .all(|k| k.scale == scale(1.5)));
}

#[test]
fn test_recursion_bounded_by_chain_length() {
    let scales: Vec<_> = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0].map(scale).to_vec();
    let n = scales.len();
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 16.0, 16.0));
    let pyramid = Pyramid::from_scales(scales).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(32.0), grid().rect_of(3, 5), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    assert_eq!(report.cells_missing, 1);
    assert_eq!(report.max_borrow_depth, n - 1);
    assert_eq!(surface.max_depth(), n - 1);
    assert_eq!(surface.depth(), 0);

    let saves = surface.ops.iter().filter(|op| **op == DrawOp::Save).count();
    assert_eq!(saves, n - 1);
}

#[test]
fn test_finer_then_coarser_order() {
    let store = RecordingStore::new(grid(), Rect::new(0.0, 0.0, 16.0, 16.0));
    store.fill_scale(scale(1.0));
    store.fill_scale(scale(4.0));
    let pyramid = Pyramid::from_scales([scale(1.0), scale(2.0), scale(4.0)]).unwrap();

    let mut surface = RecordingSurface::new();
    let mut ctx = DrawContext::new(&store, &mut surface);
    pyramid
        .draw_viewport(scale(2.0), grid().rect_of(0, 0), &mut ctx)
        .unwrap();
    let report = ctx.into_report();

    // the finer level covers the cell completely, so the coarser one is never consulted
    assert_eq!(report.tiles_borrowed, 4);
    assert_eq!(surface.ops[2], DrawOp::Scale(0.5, 0.5));
    assert_eq!(
        surface.ops.iter().filter(|op| **op == DrawOp::Save).count(),
        1
    );
}
