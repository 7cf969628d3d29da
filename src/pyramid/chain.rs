//! Pyramid registry.
//!
//! The registry owns every [`ResolutionNode`] in a map keyed by scale. Nodes
//! link to their neighbours by key, so the chain is rewired in place as
//! levels come and go:
//!
//! ```text
//!   low ◄──── 0.5 ────► 1.0 ────► 1.5 (ideal) ────► 2.0 ────► high
//! ```
//!
//! Links are derived from the map order on every insertion and removal,
//! which makes duplicates and cycles impossible to construct; the chain is
//! still re-checked after each mutation so a broken invariant fails loudly
//! instead of letting a borrow recurse forever.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::PyramidError;
use crate::tile::{Scale, TileStore};

use super::node::ResolutionNode;

/// An ordered chain of resolution levels.
#[derive(Debug, Clone, Default)]
pub struct Pyramid {
    pub(super) nodes: BTreeMap<Scale, ResolutionNode>,
}

impl Pyramid {
    /// An empty pyramid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pyramid from distinct scales.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::DuplicateScale`] if a scale appears twice.
    pub fn from_scales(scales: impl IntoIterator<Item = Scale>) -> Result<Self, PyramidError> {
        let mut pyramid = Self::new();
        for scale in scales {
            pyramid.insert(scale)?;
        }
        Ok(pyramid)
    }

    /// Add a level and link it between its neighbours.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::DuplicateScale`] if the level already exists.
    pub fn insert(&mut self, scale: Scale) -> Result<&ResolutionNode, PyramidError> {
        if self.nodes.contains_key(&scale) {
            return Err(PyramidError::DuplicateScale(scale.get()));
        }

        let low = self.nodes.range(..scale).next_back().map(|(s, _)| *s);
        let high = self.nodes.range(scale..).next().map(|(s, _)| *s);

        let mut node = ResolutionNode::new(scale);
        node.set_low(low);
        node.set_high(high);

        if let Some(low) = low.and_then(|s| self.nodes.get_mut(&s)) {
            low.set_high(Some(scale));
        }
        if let Some(high) = high.and_then(|s| self.nodes.get_mut(&s)) {
            high.set_low(Some(scale));
        }
        self.nodes.insert(scale, node);

        debug!(
            %scale,
            low = ?low.map(Scale::get),
            high = ?high.map(Scale::get),
            "pyramid level added"
        );

        self.check_chain()?;
        self.node(scale)
    }

    /// Get the level for `scale`, creating it on first need.
    pub fn ensure(&mut self, scale: Scale) -> Result<&ResolutionNode, PyramidError> {
        if self.nodes.contains_key(&scale) {
            return self.node(scale);
        }
        self.insert(scale)
    }

    /// Remove a level and join its neighbours to each other.
    pub fn remove(&mut self, scale: Scale) -> Option<ResolutionNode> {
        let node = self.nodes.remove(&scale)?;

        if let Some(low) = node.low().and_then(|s| self.nodes.get_mut(&s)) {
            low.set_high(node.high());
        }
        if let Some(high) = node.high().and_then(|s| self.nodes.get_mut(&s)) {
            high.set_low(node.low());
        }

        debug!(%scale, "pyramid level removed");
        Some(node)
    }

    /// Drop the cached tiles of one level; the chain itself is untouched.
    pub fn clear_level(&self, scale: Scale, store: &dyn TileStore) -> Result<(), PyramidError> {
        self.node(scale)?;
        store.invalidate_scale(scale);
        Ok(())
    }

    pub fn get(&self, scale: Scale) -> Option<&ResolutionNode> {
        self.nodes.get(&scale)
    }

    /// Like [`Self::get`], but a missing level is an error.
    pub fn node(&self, scale: Scale) -> Result<&ResolutionNode, PyramidError> {
        self.nodes
            .get(&scale)
            .ok_or(PyramidError::UnknownScale(scale.get()))
    }

    pub fn contains(&self, scale: Scale) -> bool {
        self.nodes.contains_key(&scale)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Scales in ascending order.
    pub fn scales(&self) -> impl Iterator<Item = Scale> + '_ {
        self.nodes.keys().copied()
    }

    /// Nodes in ascending scale order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolutionNode> {
        self.nodes.values()
    }

    /// The coarsest level.
    pub fn lowest(&self) -> Option<&ResolutionNode> {
        self.nodes.values().next()
    }

    /// The finest level.
    pub fn highest(&self) -> Option<&ResolutionNode> {
        self.nodes.values().next_back()
    }

    /// Verify the links form one strictly ascending, acyclic chain that
    /// visits every node exactly once in both directions.
    pub fn check_chain(&self) -> Result<(), PyramidError> {
        let broken = |scale: Scale, reason: String| PyramidError::BrokenChain {
            scale: scale.get(),
            reason,
        };

        let Some(first) = self.lowest() else {
            return Ok(());
        };
        if first.low().is_some() {
            return Err(broken(first.scale(), "coarsest level has a low link".into()));
        }

        let mut visited = 1;
        let mut current = first;
        while let Some(next_scale) = current.high() {
            if visited >= self.nodes.len() {
                return Err(broken(current.scale(), "high links form a cycle".into()));
            }
            let next = self
                .nodes
                .get(&next_scale)
                .ok_or_else(|| broken(current.scale(), format!("dangling high link {next_scale}")))?;
            if next.scale() <= current.scale() {
                return Err(broken(
                    current.scale(),
                    format!("high link {next_scale} is not finer"),
                ));
            }
            if next.low() != Some(current.scale()) {
                return Err(broken(
                    next.scale(),
                    format!("low link does not point back to {}", current.scale()),
                ));
            }
            visited += 1;
            current = next;
        }

        if visited != self.nodes.len() {
            return Err(broken(
                current.scale(),
                format!("chain reaches {visited} of {} levels", self.nodes.len()),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
