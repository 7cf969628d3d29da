//! Multi-scale tile cache.
//!
//! This module provides the store the pyramid draws from and the queue that
//! tile producers drain. One [`TileCache`] lives for one view session and is
//! shared via `Arc` between the (synchronous) draw path and any number of
//! (asynchronous) production tasks.
//!
//! # Contents
//!
//! - Produced tiles, keyed by `(scale, x, y)`, in an LRU bounded both by
//!   entry count and by total pixel bytes
//! - The document content extent, from which each scale's tile bounds derive
//! - Pending production requests ([`ProductionQueue`])
//! - Debug hints (the "heavy" tile set) for the grid overlay
//!
//! # Invalidation
//!
//! [`TileStore::invalidate_scale`] drops every tile, queued request and
//! in-flight marker for a scale and bumps that scale's generation. A producer
//! that took a request before the invalidation hands back a ticket from the
//! old generation; [`TileCache::complete`] discards it, so stale content is
//! never drawn.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::pin::pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kurbo::Rect;
use lru::LruCache;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use super::grid::{TileGrid, TileIndexRange};
use super::image::TileImage;
use super::key::{Priority, TileKey};
use super::queue::{Enqueue, ProductionQueue};
use super::scale::Scale;

/// Default cache capacity: 256MB of pixel data
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 256 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Tile Store Contract
// =============================================================================

/// The cache operations the resolution pyramid consumes while drawing.
///
/// Implementations own their synchronization: tiles inserted concurrently by
/// producers must become visible to later reads without the caller's help.
pub trait TileStore {
    /// The cell geometry shared by every scale.
    fn grid(&self) -> TileGrid;

    /// Whether a produced tile is resident.
    fn has(&self, key: &TileKey) -> bool;

    /// Fetch a resident tile.
    fn get(&self, key: &TileKey) -> Option<TileImage>;

    /// Drop every entry for `scale`.
    fn invalidate_scale(&self, scale: Scale);

    /// Ask for `key` to be produced. Never blocks and is idempotent.
    fn request_production(&self, key: TileKey, priority: Priority);

    /// Tile indices within which content exists at `scale`.
    fn content_bounds(&self, scale: Scale) -> TileIndexRange;

    /// Producer hint that a tile is expensive; only used by the debug overlay.
    fn is_heavy(&self, _key: &TileKey) -> bool {
        false
    }
}

// =============================================================================
// Production Ticket
// =============================================================================

/// A production request handed to a producer.
///
/// Must be returned through [`TileCache::complete`] or [`TileCache::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductionTicket {
    /// The tile to produce
    pub key: TileKey,

    /// Priority at which the request was taken
    pub priority: Priority,

    /// Scale generation at the time the request was taken
    generation: u64,
}

// =============================================================================
// Debug Hints
// =============================================================================

/// Observational hints supplied by producers.
///
/// Lives and dies with the cache it belongs to.
#[derive(Debug, Default)]
pub struct DebugHints {
    heavy: HashSet<TileKey>,
}

impl DebugHints {
    pub fn is_heavy(&self, key: &TileKey) -> bool {
        self.heavy.contains(key)
    }

    pub fn heavy_count(&self) -> usize {
        self.heavy.len()
    }
}

// =============================================================================
// Tile Cache
// =============================================================================

struct CacheState {
    tiles: LruCache<TileKey, TileImage>,
    current_size: usize,
    queue: ProductionQueue,
    generations: HashMap<Scale, u64>,
    /// Bumped by a full clear; part of every scale's generation.
    epoch: u64,
    content_extent: Option<Rect>,
    hints: DebugHints,
    closed: bool,
}

impl CacheState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.queue.in_flight_len() == 0
    }

    fn generation(&self, scale: Scale) -> u64 {
        self.epoch + self.generations.get(&scale).copied().unwrap_or(0)
    }

    fn insert(&mut self, key: TileKey, image: TileImage, max_size: usize) {
        self.current_size += image.byte_len();
        if let Some((_, old)) = self.tiles.push(key, image) {
            // Either the previous value for `key` or the LRU victim.
            self.current_size = self.current_size.saturating_sub(old.byte_len());
        }

        while self.current_size > max_size && self.tiles.len() > 1 {
            match self.tiles.pop_lru() {
                Some((evicted_key, evicted)) => {
                    trace!(tile = %evicted_key, "evicted tile");
                    self.current_size = self.current_size.saturating_sub(evicted.byte_len());
                }
                None => break,
            }
        }
    }
}

/// Shared cache of produced tiles and pending production requests.
///
/// # Example
///
/// ```
/// use canvas_tiles::tile::{Priority, Scale, TileCache, TileGrid, TileImage, TileKey, TileStore};
///
/// let cache = TileCache::new(TileGrid::square(256).unwrap());
/// let key = TileKey::new(Scale::ONE, 0, 0);
///
/// cache.request_production(key, Priority::Low);
/// let ticket = cache.try_next_request().unwrap();
/// assert_eq!(ticket.key, key);
///
/// cache.complete(ticket, TileImage::solid(256, 256, [255, 0, 0, 255]));
/// assert!(cache.has(&key));
/// ```
pub struct TileCache {
    grid: TileGrid,
    state: Mutex<CacheState>,
    notify: Notify,
    /// Signalled whenever the queue drains with nothing in flight.
    idle: Notify,
    max_size: usize,
}

impl TileCache {
    /// Create a cache with default capacity.
    pub fn new(grid: TileGrid) -> Self {
        Self::with_capacity(grid, DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes of pixel data.
    pub fn with_capacity(grid: TileGrid, max_size: usize) -> Self {
        Self::with_capacity_and_entries(grid, max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with a byte capacity and a maximum entry count.
    pub fn with_capacity_and_entries(grid: TileGrid, max_size: usize, max_entries: usize) -> Self {
        let entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            grid,
            state: Mutex::new(CacheState {
                tiles: LruCache::new(entries),
                current_size: 0,
                queue: ProductionQueue::new(),
                generations: HashMap::new(),
                epoch: 0,
                content_extent: None,
                hints: DebugHints::default(),
                closed: false,
            }),
            notify: Notify::new(),
            idle: Notify::new(),
            max_size,
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_if_idle(&self, state: &CacheState) {
        if state.is_idle() {
            self.idle.notify_waiters();
        }
    }

    // -------------------------------------------------------------------------
    // Content extent
    // -------------------------------------------------------------------------

    /// Set the document content extent, in content units (scale 1).
    pub fn set_content_extent(&self, extent: Rect) {
        debug!(?extent, "content extent updated");
        self.state().content_extent = Some(extent);
    }

    pub fn clear_content_extent(&self) {
        self.state().content_extent = None;
    }

    pub fn content_extent(&self) -> Option<Rect> {
        self.state().content_extent
    }

    // -------------------------------------------------------------------------
    // Tiles
    // -------------------------------------------------------------------------

    /// Insert a tile directly, bypassing the request queue.
    ///
    /// Any pending or in-flight request for the key is settled.
    pub fn insert(&self, key: TileKey, image: TileImage) {
        let mut state = self.state();
        state.queue.finish(&key);
        state.insert(key, image, self.max_size);
        self.notify_if_idle(&state);
    }

    /// Remove every tile, request and hint. Scale generations advance so
    /// outstanding tickets are discarded on completion.
    pub fn clear(&self) {
        let mut state = self.state();
        state.tiles.clear();
        state.current_size = 0;
        state.queue = ProductionQueue::new();
        state.epoch += 1;
        state.hints = DebugHints::default();
        self.idle.notify_waiters();
        debug!("tile cache cleared");
    }

    /// Number of resident tiles.
    pub fn len(&self) -> usize {
        self.state().tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().tiles.is_empty()
    }

    /// Current pixel bytes held.
    pub fn size(&self) -> usize {
        self.state().current_size
    }

    /// Maximum pixel bytes held.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Number of resident tiles at `scale`.
    pub fn scale_len(&self, scale: Scale) -> usize {
        self.state()
            .tiles
            .iter()
            .filter(|(key, _)| key.scale == scale)
            .count()
    }

    /// Current invalidation generation of `scale`.
    pub fn generation(&self, scale: Scale) -> u64 {
        self.state().generation(scale)
    }

    // -------------------------------------------------------------------------
    // Production queue
    // -------------------------------------------------------------------------

    /// Number of requests waiting for a producer.
    pub fn pending_requests(&self) -> usize {
        self.state().queue.len()
    }

    /// Number of requests taken by producers and not yet returned.
    pub fn in_flight_requests(&self) -> usize {
        self.state().queue.in_flight_len()
    }

    /// Priority of a pending request, if queued.
    pub fn pending_priority(&self, key: &TileKey) -> Option<Priority> {
        self.state().queue.priority_of(key)
    }

    /// Pending requests in service order.
    pub fn pending_snapshot(&self) -> Vec<(TileKey, Priority)> {
        self.state().queue.snapshot()
    }

    /// Take the most urgent request without waiting.
    pub fn try_next_request(&self) -> Option<ProductionTicket> {
        let mut state = self.state();
        if state.closed {
            return None;
        }
        let (key, priority) = state.queue.pop()?;
        let generation = state.generation(key.scale);
        Some(ProductionTicket {
            key,
            priority,
            generation,
        })
    }

    /// Whether no request is queued or being produced.
    pub fn is_idle(&self) -> bool {
        self.state().is_idle()
    }

    /// Wait until no request is queued or being produced.
    ///
    /// Returns immediately if the cache is closed.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();

            {
                let state = self.state();
                if state.closed || state.is_idle() {
                    return;
                }
            }

            notified.await;
        }
    }

    /// Wait for the most urgent request. Returns `None` once the cache is closed.
    pub async fn next_request(&self) -> Option<ProductionTicket> {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();

            if self.is_closed() {
                return None;
            }
            if let Some(ticket) = self.try_next_request() {
                return Some(ticket);
            }

            notified.await;
        }
    }

    /// Hand back a produced tile.
    ///
    /// Returns `false` if the tile's scale was invalidated after the ticket
    /// was taken; the stale image is dropped.
    pub fn complete(&self, ticket: ProductionTicket, image: TileImage) -> bool {
        self.accept(ticket, image, false)
    }

    /// Like [`Self::complete`], also flagging the tile as heavy.
    pub fn complete_heavy(&self, ticket: ProductionTicket, image: TileImage) -> bool {
        self.accept(ticket, image, true)
    }

    fn accept(&self, ticket: ProductionTicket, image: TileImage, heavy: bool) -> bool {
        let mut state = self.state();
        if state.generation(ticket.key.scale) != ticket.generation {
            warn!(tile = %ticket.key, "discarding tile produced before invalidation");
            return false;
        }
        state.queue.finish(&ticket.key);
        state.insert(ticket.key, image, self.max_size);
        if heavy {
            state.hints.heavy.insert(ticket.key);
        }
        self.notify_if_idle(&state);
        trace!(tile = %ticket.key, priority = ?ticket.priority, heavy, "tile produced");
        true
    }

    /// Give up on a ticket so the tile can be requested again.
    pub fn fail(&self, ticket: ProductionTicket) {
        let mut state = self.state();
        if state.generation(ticket.key.scale) == ticket.generation {
            state.queue.finish(&ticket.key);
        }
        self.notify_if_idle(&state);
    }

    /// Stop handing out requests and wake every waiting producer.
    pub fn close(&self) {
        self.state().closed = true;
        self.notify.notify_waiters();
        self.idle.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    // -------------------------------------------------------------------------
    // Debug hints
    // -------------------------------------------------------------------------

    /// Flag a tile as expensive to produce.
    pub fn mark_heavy(&self, key: TileKey) {
        self.state().hints.heavy.insert(key);
    }

    pub fn clear_debug_hints(&self) {
        self.state().hints = DebugHints::default();
    }

    pub fn heavy_count(&self) -> usize {
        self.state().hints.heavy_count()
    }
}

impl TileStore for TileCache {
    fn grid(&self) -> TileGrid {
        self.grid
    }

    fn has(&self, key: &TileKey) -> bool {
        self.state().tiles.contains(key)
    }

    fn get(&self, key: &TileKey) -> Option<TileImage> {
        self.state().tiles.get(key).cloned()
    }

    fn invalidate_scale(&self, scale: Scale) {
        let mut state = self.state();

        let stale: Vec<TileKey> = state
            .tiles
            .iter()
            .map(|(key, _)| *key)
            .filter(|key| key.scale == scale)
            .collect();
        for key in &stale {
            if let Some(image) = state.tiles.pop(key) {
                state.current_size = state.current_size.saturating_sub(image.byte_len());
            }
        }

        let dropped_requests = state.queue.remove_scale(scale);
        *state.generations.entry(scale).or_insert(0) += 1;
        state.hints.heavy.retain(|key| key.scale != scale);
        self.notify_if_idle(&state);

        debug!(
            %scale,
            tiles = stale.len(),
            requests = dropped_requests,
            "invalidated scale"
        );
    }

    fn request_production(&self, key: TileKey, priority: Priority) {
        let outcome = {
            let mut state = self.state();
            if state.tiles.contains(&key) {
                return;
            }
            state.queue.push(key, priority)
        };

        if outcome == Enqueue::Queued {
            trace!(tile = %key, ?priority, "tile requested");
            self.notify.notify_one();
        }
    }

    fn content_bounds(&self, scale: Scale) -> TileIndexRange {
        match self.state().content_extent {
            Some(extent) => self
                .grid
                .index_range(extent.scale_from_origin(scale.get())),
            None => TileIndexRange::EMPTY,
        }
    }

    fn is_heavy(&self, key: &TileKey) -> bool {
        self.state().hints.is_heavy(key)
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("TileCache")
            .field("grid", &self.grid)
            .field("tiles", &state.tiles.len())
            .field("size", &state.current_size)
            .field("max_size", &self.max_size)
            .field("pending", &state.queue.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
