//! Production worker pool.
//!
//! Each worker task waits on [`TileCache::next_request`], produces the tile
//! and hands it back. Requests are taken strictly in priority order, so a
//! burst of High requests from a non-canonical frame overtakes the Low
//! backlog already queued.
//!
//! ```text
//!   TileCache ──next_request()──► worker 0 ──produce()──► TileProducer
//!       ▲                         worker 1                     │
//!       └───────complete()/fail()─────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::ProduceError;
use crate::tile::{TileCache, TileStore};

use super::TileProducer;

/// Tiles slower than this are flagged heavy for the debug overlay.
pub const DEFAULT_HEAVY_THRESHOLD: Duration = Duration::from_millis(50);

/// Worker pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of concurrent production tasks (at least one is spawned)
    pub workers: usize,

    /// Production time above which a tile is marked heavy
    pub heavy_threshold: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            heavy_threshold: DEFAULT_HEAVY_THRESHOLD,
        }
    }
}

/// Counters accumulated by a worker pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Tiles inserted into the cache
    pub produced: usize,

    /// Producer errors
    pub failed: usize,

    /// Tiles produced for a scale invalidated meanwhile
    pub discarded: usize,
}

#[derive(Debug, Default)]
struct Counters {
    produced: AtomicUsize,
    failed: AtomicUsize,
    discarded: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> WorkerStats {
        WorkerStats {
            produced: self.produced.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            discarded: self.discarded.load(Ordering::SeqCst),
        }
    }
}

/// A pool of tokio tasks producing tiles for one cache.
///
/// Dropping the pool without [`ProductionWorker::shutdown`] aborts the tasks.
pub struct ProductionWorker {
    cache: Arc<TileCache>,
    handles: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl ProductionWorker {
    /// Spawn `config.workers` tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        cache: Arc<TileCache>,
        producer: Arc<dyn TileProducer>,
        config: WorkerConfig,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let handles = (0..config.workers.max(1))
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    Arc::clone(&cache),
                    Arc::clone(&producer),
                    Arc::clone(&counters),
                    config.heavy_threshold,
                ))
            })
            .collect::<Vec<_>>();

        debug!(workers = handles.len(), "production workers started");
        Self {
            cache,
            handles,
            counters,
        }
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    pub fn stats(&self) -> WorkerStats {
        self.counters.snapshot()
    }

    /// Wait until no request is queued or being produced.
    ///
    /// Returns immediately if the cache has been closed.
    pub async fn wait_idle(&self) {
        self.cache.wait_idle().await;
    }

    /// Close the cache's request queue and wait for every task to exit.
    ///
    /// Tiles being produced are finished; queued requests are abandoned.
    pub async fn shutdown(mut self) -> WorkerStats {
        self.cache.close();
        for handle in std::mem::take(&mut self.handles) {
            if let Err(e) = handle.await {
                warn!(error = %e, "production worker panicked");
            }
        }

        let stats = self.counters.snapshot();
        debug!(
            produced = stats.produced,
            failed = stats.failed,
            discarded = stats.discarded,
            "production workers stopped"
        );
        stats
    }
}

impl Drop for ProductionWorker {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ProductionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductionWorker")
            .field("workers", &self.handles.len())
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}

async fn run_worker(
    id: usize,
    cache: Arc<TileCache>,
    producer: Arc<dyn TileProducer>,
    counters: Arc<Counters>,
    heavy_threshold: Duration,
) {
    let grid = cache.grid();
    while let Some(ticket) = cache.next_request().await {
        let started = Instant::now();
        match producer.produce(ticket.key, grid).await {
            Ok(image) => {
                let elapsed = started.elapsed();
                let accepted = if elapsed >= heavy_threshold {
                    cache.complete_heavy(ticket, image)
                } else {
                    cache.complete(ticket, image)
                };
                if accepted {
                    counters.produced.fetch_add(1, Ordering::SeqCst);
                    trace!(worker = id, tile = %ticket.key, ?elapsed, "tile accepted");
                } else {
                    counters.discarded.fetch_add(1, Ordering::SeqCst);
                }
            }
            Err(ProduceError::ShutDown) => {
                cache.fail(ticket);
                break;
            }
            Err(e) => {
                warn!(worker = id, tile = %ticket.key, error = %e, "tile production failed");
                counters.failed.fetch_add(1, Ordering::SeqCst);
                cache.fail(ticket);
            }
        }
    }
    debug!(worker = id, "production worker exiting");
}

// =============================================================================
// Tests
// =============================================================================
