//! Resolver output and the finalized point set.

use geo::{Distance, Euclidean, Point};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::feature::{FeatureId, FeatureStatus, PointFeature};
use crate::canonical::{canonical_hash_hex, quantize_point};
use crate::policy::RankKey;

/// How a generalized point came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// No conflicts: the focal point is copied unchanged.
    PassThrough,
    /// The focal point represents a cluster; the other members were removed.
    Representative {
        /// Cluster members removed alongside the focal point.
        cleared: Vec<FeatureId>,
    },
    /// The focal point and its single conflicting neighbour became a centroid.
    Merged {
        /// The two features that were averaged.
        members: [FeatureId; 2],
    },
}

/// A single entry of the generalized output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizedPoint {
    /// Focal feature that produced this point.
    pub source: FeatureId,
    /// Category, inherited from the focal feature.
    pub feature_type: String,
    /// Current location (moves during dispersion).
    pub location: Point<f64>,
    /// Location as emitted by the resolver.
    pub anchor: Point<f64>,
    /// Focal feature's rank key.
    pub rank: RankKey,
    /// Conflict set size observed when the focal point was processed.
    pub matched: usize,
    /// What the resolver did.
    pub resolution: Resolution,
}

impl GeneralizedPoint {
    /// Copy a feature unchanged.
    pub fn pass_through(feature: &PointFeature, rank: RankKey, matched: usize) -> Self {
        Self {
            source: feature.id,
            feature_type: feature.feature_type.clone(),
            location: feature.location,
            anchor: feature.location,
            rank,
            matched,
            resolution: Resolution::PassThrough,
        }
    }

    /// Keep a feature as the representative of a cluster.
    pub fn representative(
        feature: &PointFeature,
        rank: RankKey,
        matched: usize,
        cleared: Vec<FeatureId>,
    ) -> Self {
        Self {
            resolution: Resolution::Representative { cleared },
            ..Self::pass_through(feature, rank, matched)
        }
    }

    /// Synthesize a merged point at `centroid`, typed after the focal feature.
    pub fn merged(
        focal: &PointFeature,
        neighbour: FeatureId,
        centroid: Point<f64>,
        rank: RankKey,
    ) -> Self {
        Self {
            source: focal.id,
            feature_type: focal.feature_type.clone(),
            location: centroid,
            anchor: centroid,
            rank,
            matched: 2,
            resolution: Resolution::Merged {
                members: [focal.id, neighbour],
            },
        }
    }

    /// How far dispersion moved this point.
    pub fn offset(&self) -> f64 {
        Euclidean::distance(self.anchor, self.location)
    }
}

/// Accumulator filled by the resolver, in processing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralizedOutput {
    /// Output points.
    pub points: Vec<GeneralizedPoint>,
    /// Final status of every feature that entered the working set.
    pub ledger: BTreeMap<FeatureId, FeatureStatus>,
}

impl GeneralizedOutput {
    /// Number of output points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the output is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Count ledger entries with the given status.
    pub fn count_status(&self, status: FeatureStatus) -> usize {
        self.ledger.values().filter(|s| **s == status).count()
    }
}

/// Content fingerprint of a final set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputFingerprint(String);

impl OutputFingerprint {
    /// Fingerprint a list of points (order-sensitive).
    pub fn compute(points: &[GeneralizedPoint]) -> Self {
        let canonical: Vec<(&str, (i64, i64))> = points
            .iter()
            .map(|p| (p.feature_type.as_str(), quantize_point(&p.location)))
            .collect();
        Self(canonical_hash_hex(&canonical))
    }

    /// Get the fingerprint as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OutputFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The deduplicated, dispersed result of a generalization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalSet {
    /// Final points.
    pub points: Vec<GeneralizedPoint>,
    /// Coincident points dropped before dispersion.
    pub duplicates_removed: usize,
    /// Relaxation rounds that moved at least one point.
    pub dispersion_iterations: usize,
    /// Content fingerprint of `points`.
    pub fingerprint: OutputFingerprint,
}

impl FinalSet {
    /// Assemble a final set and fingerprint it.
    pub fn new(
        points: Vec<GeneralizedPoint>,
        duplicates_removed: usize,
        dispersion_iterations: usize,
    ) -> Self {
        let fingerprint = OutputFingerprint::compute(&points);
        Self {
            points,
            duplicates_removed,
            dispersion_iterations,
            fingerprint,
        }
    }

    /// Number of final points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Final locations, in output order.
    pub fn locations(&self) -> Vec<Point<f64>> {
        self.points.iter().map(|p| p.location).collect()
    }

    /// Smallest pairwise distance, `None` for fewer than two points.
    pub fn closest_pair_distance(&self) -> Option<f64> {
        closest_pair_distance(&self.locations())
    }
}

/// Smallest pairwise distance among `points`, `None` for fewer than two.
pub fn closest_pair_distance(points: &[Point<f64>]) -> Option<f64> {
    let mut best: Option<f64> = None;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = Euclidean::distance(points[i], points[j]);
            best = Some(best.map_or(d, |b| b.min(d)));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, x: f64, y: f64) -> GeneralizedPoint {
        GeneralizedPoint::pass_through(
            &PointFeature::new(id, "a", x, y),
            RankKey::new(1, 0, 0),
            0,
        )
    }

    #[test]
    fn test_merged_point_carries_focal_type() {
        let focal = PointFeature::new(1, "pharmacy", 0.0, 0.0);
        let merged =
            GeneralizedPoint::merged(&focal, FeatureId::new(2), Point::new(1.0, 1.0), RankKey::new(1, 2, 0));
        assert_eq!(merged.feature_type, "pharmacy");
        assert_eq!(merged.matched, 2);
        assert_eq!(
            merged.resolution,
            Resolution::Merged { members: [FeatureId::new(1), FeatureId::new(2)] }
        );
    }

    #[test]
    fn test_fingerprint_tracks_geometry() {
        let a = FinalSet::new(vec![point(1, 0.0, 0.0), point(2, 5.0, 0.0)], 0, 0);
        let b = FinalSet::new(vec![point(7, 0.0, 0.0), point(8, 5.0, 0.0)], 0, 0);
        let c = FinalSet::new(vec![point(1, 0.0, 0.0), point(2, 5.5, 0.0)], 0, 0);

        // Ids do not take part; geometry and type do.
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_closest_pair() {
        let set = FinalSet::new(
            vec![point(1, 0.0, 0.0), point(2, 3.0, 4.0), point(3, 10.0, 0.0)],
            0,
            0,
        );
        assert_eq!(set.closest_pair_distance(), Some(5.0));
        assert_eq!(closest_pair_distance(&[Point::new(0.0, 0.0)]), None);
    }

    #[test]
    fn test_offset() {
        let mut p = point(1, 0.0, 0.0);
        p.location = Point::new(0.0, 2.0);
        assert_eq!(p.offset(), 2.0);
    }
}
