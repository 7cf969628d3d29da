use crate::tile::Scale;

/// One pyramid level.
///
/// Nodes are owned by a [`Pyramid`](super::Pyramid); `low` and `high` are
/// non-owning links to the neighbouring levels, stored as their scales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionNode {
    scale: Scale,
    canonical: bool,
    low: Option<Scale>,
    high: Option<Scale>,
}

impl ResolutionNode {
    pub(super) fn new(scale: Scale) -> Self {
        Self {
            scale,
            canonical: scale.is_canonical(),
            low: None,
            high: None,
        }
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Whether this is a power-of-two ("stair") level.
    pub fn is_canonical(&self) -> bool {
        self.canonical
    }

    /// The next coarser level.
    pub fn low(&self) -> Option<Scale> {
        self.low
    }

    /// The next finer level.
    pub fn high(&self) -> Option<Scale> {
        self.high
    }

    pub(super) fn set_low(&mut self, low: Option<Scale>) {
        self.low = low;
    }

    pub(super) fn set_high(&mut self, high: Option<Scale>) {
        self.high = high;
    }
}
