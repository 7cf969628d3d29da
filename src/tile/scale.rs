//! Pyramid scales.
//!
//! A [`Scale`] is the number of device pixels per content unit at one
//! pyramid level. Power-of-two scales are *canonical* ("stair" levels):
//! they are the stable levels every other scale falls back to.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::ScaleError;

/// Mask keeping the sign and exponent bits of an IEEE-754 double.
const EXPONENT_MASK: u64 = 0xFFF0_0000_0000_0000;

/// Largest power of two (2^k, k possibly negative) that is `<= value`.
///
/// Exact for every normal positive input: the mantissa bits are cleared, so a
/// value that already is a power of two comes back bit-for-bit unchanged.
/// Returns `None` for zero, negative, non-finite and subnormal inputs.
pub fn floor_pow2(value: f64) -> Option<f64> {
    Scale::new(value).ok().map(|scale| scale.floor_pow2().get())
}

// =============================================================================
// Scale
// =============================================================================

/// A validated pyramid scale.
///
/// Always positive, finite and normal, which makes the bit pattern totally
/// ordered; `Eq`, `Ord` and `Hash` are derived from it so scales can key
/// maps directly.
#[derive(Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct Scale(f64);

impl Scale {
    /// The identity scale (one device pixel per content unit).
    pub const ONE: Scale = Scale(1.0);

    /// Create a scale, rejecting zero, negative, non-finite and subnormal values.
    pub fn new(value: f64) -> Result<Self, ScaleError> {
        if value.is_normal() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ScaleError::InvalidScale(value))
        }
    }

    /// The raw scale factor.
    pub fn get(self) -> f64 {
        self.0
    }

    /// The canonical scale at or below this one.
    pub fn floor_pow2(self) -> Scale {
        Scale(f64::from_bits(self.0.to_bits() & EXPONENT_MASK))
    }

    /// Whether this scale is a canonical ("stair") pyramid level.
    pub fn is_canonical(self) -> bool {
        self.floor_pow2() == self
    }

    /// Ratio `self / other`.
    pub fn ratio_to(self, other: Scale) -> f64 {
        self.0 / other.0
    }
}

impl TryFrom<f64> for Scale {
    type Error = ScaleError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq for Scale {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Scale {}

impl PartialOrd for Scale {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scale {
    fn cmp(&self, other: &Self) -> Ordering {
        // Positive finite doubles sort like their bit patterns.
        self.0.to_bits().cmp(&other.0.to_bits())
    }
}

impl Hash for Scale {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Debug for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scale({})", self.0)
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Tests
// =============================================================================
