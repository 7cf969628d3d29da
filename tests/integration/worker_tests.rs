//! Production worker integration tests.
//!
//! Tests verify:
//! - Workers fill the cache so a later frame needs no borrowing
//! - Results for an invalidated scale are discarded
//! - Requests raised to High are served before the Low backlog

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kurbo::Rect;
use tokio::sync::Semaphore;

use canvas_tiles::error::ProduceError;
use canvas_tiles::producer::{ProductionWorker, TileProducer, WorkerConfig};
use canvas_tiles::surface::RasterSurface;
use canvas_tiles::tile::{Priority, TileCache, TileGrid, TileImage, TileKey, TileStore};
use canvas_tiles::viewer::{Viewer, ViewerConfig};

use super::test_utils::{color_for, scale, solid_tile, SolidProducer};

/// Blocks every production until a permit is released.
struct GatedProducer {
    gate: Semaphore,
}

#[async_trait]
impl TileProducer for GatedProducer {
    async fn produce(&self, key: TileKey, grid: TileGrid) -> Result<TileImage, ProduceError> {
        let permit = self.gate.acquire().await.map_err(|_| ProduceError::ShutDown)?;
        permit.forget();
        Ok(solid_tile(grid, key.scale))
    }
}

fn single_worker() -> WorkerConfig {
    WorkerConfig {
        workers: 1,
        ..WorkerConfig::default()
    }
}

async fn wait_for_in_flight(cache: &TileCache, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while cache.in_flight_requests() < count {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("request never taken");
}

#[tokio::test]
async fn test_worker_completes_later_frame() {
    let mut viewer = Viewer::new(ViewerConfig {
        tile_size: 16,
        content: Some(Rect::new(0.0, 0.0, 64.0, 64.0)),
        ..ViewerConfig::default()
    })
    .unwrap();
    let producer = Arc::new(SolidProducer::new());
    let worker = ProductionWorker::spawn(
        Arc::clone(viewer.cache()),
        producer.clone(),
        WorkerConfig::default(),
    );

    let s = scale(1.5);
    let viewport = Rect::new(0.0, 0.0, 96.0, 96.0);
    let mut surface = RasterSurface::new(96, 96);

    let first = viewer.render(s, viewport, &mut surface).unwrap();
    assert!(!first.is_complete());
    assert_eq!(first.cells(), 36);

    tokio::time::timeout(Duration::from_secs(5), worker.wait_idle())
        .await
        .unwrap();

    let second = viewer.render(s, viewport, &mut surface).unwrap();
    assert!(second.is_complete(), "{second:?}");
    assert_eq!(second.tiles_drawn, 36);
    assert_eq!(surface.pixel(95, 95), color_for(s));

    let stats = worker.shutdown().await;
    assert_eq!(stats.produced, producer.produced());
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_stale_result_discarded() {
    let grid = TileGrid::square(8).unwrap();
    let cache = Arc::new(TileCache::new(grid));
    let producer = Arc::new(GatedProducer {
        gate: Semaphore::new(0),
    });
    let worker = ProductionWorker::spawn(Arc::clone(&cache), producer.clone(), single_worker());

    let key = TileKey::new(scale(2.0), 0, 0);
    cache.request_production(key, Priority::Low);
    wait_for_in_flight(&cache, 1).await;

    cache.invalidate_scale(scale(2.0));
    producer.gate.add_permits(1);

    tokio::time::timeout(Duration::from_secs(5), async {
        while worker.stats().discarded == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();

    assert!(!cache.has(&key));
    assert!(cache.is_empty());

    // the tile can be requested and produced again
    producer.gate.add_permits(1);
    cache.request_production(key, Priority::Low);
    worker.wait_idle().await;
    assert!(cache.has(&key));

    let stats = worker.shutdown().await;
    assert_eq!(stats.discarded, 1);
    assert_eq!(stats.produced, 1);
}

#[tokio::test]
async fn test_raised_request_overtakes_backlog() {
    let grid = TileGrid::square(8).unwrap();
    let cache = Arc::new(TileCache::new(grid));
    let producer = Arc::new(GatedProducer {
        gate: Semaphore::new(0),
    });

    // occupy the only worker so the queue builds up behind it
    let worker = ProductionWorker::spawn(Arc::clone(&cache), producer.clone(), single_worker());
    let blocker = TileKey::new(scale(1.0), 100, 100);
    cache.request_production(blocker, Priority::Low);
    wait_for_in_flight(&cache, 1).await;

    for x in 0..4 {
        cache.request_production(TileKey::new(scale(1.0), x, 0), Priority::Low);
    }
    let urgent = TileKey::new(scale(1.0), 3, 0);
    cache.request_production(urgent, Priority::High);
    assert_eq!(cache.pending_requests(), 4);
    assert_eq!(cache.pending_priority(&urgent), Some(Priority::High));

    // finish the blocker; the next tile taken must be the urgent one
    producer.gate.add_permits(1);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cache.has(&blocker) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    wait_for_in_flight(&cache, 1).await;
    assert_eq!(cache.pending_priority(&urgent), None);
    assert_eq!(cache.pending_requests(), 3);

    producer.gate.add_permits(4);
    worker.wait_idle().await;
    assert!(cache.has(&urgent));
    assert_eq!(worker.shutdown().await.produced, 5);
}
