//! Priority queue of pending tile production requests.
//!
//! Requests are keyed by [`TileKey`] so that issuing the same request every
//! frame never duplicates work:
//!
//! - a key already queued at the same or higher priority is left alone;
//! - a key queued at a lower priority is raised in place;
//! - a key that a producer is currently working on is ignored.
//!
//! Requests pop highest priority first and first-in-first-out within a
//! priority. Superseded heap entries are skipped lazily on pop.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::key::{Priority, TileKey};
use super::scale::Scale;

/// Rebuild the heap once stale entries outnumber live ones by this much.
const COMPACT_SLACK: usize = 64;

/// Outcome of [`ProductionQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// The key was not pending and is now queued
    Queued,
    /// The key was queued at a lower priority and has been raised
    Raised,
    /// The key was already queued at this priority or higher
    AlreadyQueued,
    /// A producer is already working on this key
    InFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    priority: Priority,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    priority: Priority,
    seq: u64,
    key: TileKey,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            // Older requests first within a priority.
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Production Queue
// =============================================================================

/// Pending and in-flight production requests.
#[derive(Debug, Default)]
pub struct ProductionQueue {
    pending: HashMap<TileKey, Pending>,
    heap: BinaryHeap<HeapEntry>,
    in_flight: HashSet<TileKey>,
    next_seq: u64,
}

impl ProductionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `key` at `priority`, deduplicating against pending and in-flight work.
    pub fn push(&mut self, key: TileKey, priority: Priority) -> Enqueue {
        if self.in_flight.contains(&key) {
            return Enqueue::InFlight;
        }

        let outcome = match self.pending.get(&key) {
            Some(pending) if pending.priority >= priority => return Enqueue::AlreadyQueued,
            Some(_) => Enqueue::Raised,
            None => Enqueue::Queued,
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(key, Pending { priority, seq });
        self.heap.push(HeapEntry { priority, seq, key });
        self.compact_if_needed();
        outcome
    }

    /// Take the most urgent request and mark it in flight.
    pub fn pop(&mut self) -> Option<(TileKey, Priority)> {
        while let Some(entry) = self.heap.pop() {
            let live = self
                .pending
                .get(&entry.key)
                .is_some_and(|p| p.seq == entry.seq);
            if !live {
                continue;
            }
            self.pending.remove(&entry.key);
            self.in_flight.insert(entry.key);
            return Some((entry.key, entry.priority));
        }
        None
    }

    /// Release the in-flight marker for `key`. Returns whether it was in flight.
    pub fn finish(&mut self, key: &TileKey) -> bool {
        self.in_flight.remove(key)
    }

    /// Drop every pending and in-flight request for `scale`.
    ///
    /// Returns the number of pending requests removed.
    pub fn remove_scale(&mut self, scale: Scale) -> usize {
        let before = self.pending.len();
        self.pending.retain(|key, _| key.scale != scale);
        self.in_flight.retain(|key| key.scale != scale);
        let removed = before - self.pending.len();
        self.compact_if_needed();
        removed
    }

    /// Priority of a pending request, if queued.
    pub fn priority_of(&self, key: &TileKey) -> Option<Priority> {
        self.pending.get(key).map(|p| p.priority)
    }

    pub fn is_in_flight(&self, key: &TileKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Number of pending (not yet taken) requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Pending keys in the order they would be popped.
    pub fn snapshot(&self) -> Vec<(TileKey, Priority)> {
        let mut entries: Vec<HeapEntry> = self
            .pending
            .iter()
            .map(|(key, p)| HeapEntry {
                priority: p.priority,
                seq: p.seq,
                key: *key,
            })
            .collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|e| (e.key, e.priority)).collect()
    }

    fn compact_if_needed(&mut self) {
        if self.heap.len() <= self.pending.len() * 2 + COMPACT_SLACK {
            return;
        }
        let pending = &self.pending;
        self.heap
            .retain(|entry| pending.get(&entry.key).is_some_and(|p| p.seq == entry.seq));
    }
}

// =============================================================================
// Tests
// =============================================================================
