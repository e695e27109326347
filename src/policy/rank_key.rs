//! Processing-order keys for the conflict resolver.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::PointFeature;

/// Sort key attached to each feature before resolution.
///
/// Ordering (ascending = processed earlier):
///
/// ```text
/// frequency ASC, conflict_count DESC, density ASC
/// ```
///
/// Rare types are handled first so they are preserved preferentially; among
/// equally rare types the most contested points go next, since resolving
/// them removes the most downstream conflicts; sparse neighbourhoods break
/// the remaining ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankKey {
    /// Number of input features sharing this feature's type.
    pub frequency: usize,
    /// Size of the conflict set against the full input (0 when unconflicted).
    pub conflict_count: usize,
    /// Number of other features within the density radius.
    pub density: usize,
}

impl RankKey {
    /// Create a new rank key.
    pub fn new(frequency: usize, conflict_count: usize, density: usize) -> Self {
        Self {
            frequency,
            conflict_count,
            density,
        }
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.conflict_count.cmp(&self.conflict_count))
            .then_with(|| self.density.cmp(&other.density))
    }
}

/// A feature paired with its frozen rank key.
///
/// Equal keys are deliberately *not* broken by id: the ranker relies on a
/// stable sort so ties keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFeature {
    /// The feature.
    pub feature: PointFeature,
    /// Its processing-order key.
    pub key: RankKey,
}

impl RankedFeature {
    /// Pair a feature with its key.
    pub fn new(feature: PointFeature, key: RankKey) -> Self {
        Self { feature, key }
    }
}
