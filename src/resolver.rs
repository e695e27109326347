//! Sequential conflict resolver.
//!
//! The resolver walks the ranked features in order and, for each focal point
//! still present, queries its conflicts against the *current* working set and
//! mutates that set. Every decision changes the input of every later query,
//! so the loop is strictly single-threaded and the iteration order is part
//! of the result.

use std::sync::Arc;

use crate::error::{ensure_positive, fmt_point, GeneralizationError, Result};
use crate::policy::RankedFeature;
use crate::provider::{GeometryProvider, SpatialPredicate};
use crate::types::{
    FeatureId, FeatureStatus, GeneralizationMetrics, GeneralizedOutput, GeneralizedPoint,
    NoOpMetrics, PointFeature, ResolutionAction, SkipReason, SkippedFeatureWarning, WorkingSet,
};

/// Conflict set of `focal` among `candidates`, as feature ids.
///
/// The set counts every symbol involved in the overlap, the focal one
/// included: it is empty when no other footprint touches the focal
/// footprint, otherwise `[focal, neighbours...]` with neighbours in
/// candidate order.
pub fn conflict_ids<P: GeometryProvider + ?Sized>(
    provider: &P,
    focal: &PointFeature,
    candidates: &[PointFeature],
    footprint_radius: f64,
) -> Result<Vec<FeatureId>> {
    let neighbours: Vec<FeatureId> = provider
        .spatial_query(
            &focal.location,
            candidates,
            SpatialPredicate::Intersects { footprint_radius },
        )
        .map_err(GeneralizationError::from_provider)?
        .into_iter()
        .filter(|id| *id != focal.id)
        .collect();

    if neighbours.is_empty() {
        return Ok(Vec::new());
    }

    let mut ids = Vec::with_capacity(neighbours.len() + 1);
    ids.push(focal.id);
    ids.extend(neighbours);
    Ok(ids)
}

/// Conflict resolver.
///
/// ## Algorithm
///
/// For each ranked feature still in the working set:
///
/// 1. Query its conflict set (footprints of radius `displacement`)
/// 2. Classify by size `k`:
///    - `k > 2`: keep the focal point as representative, remove all `k`
///    - `k == 2`: emit the centroid of the pair typed after the focal point,
///      remove both
///    - `k <= 1`: copy the focal point, remove nothing
/// 3. Move on; features removed by an earlier step are never processed
pub struct ConflictResolver<P: GeometryProvider> {
    provider: Arc<P>,
    displacement: f64,
    metrics: Arc<dyn GeneralizationMetrics>,
}

impl<P: GeometryProvider> ConflictResolver<P> {
    /// Create a resolver with footprints of radius `displacement`.
    pub fn new(provider: Arc<P>, displacement: f64) -> Self {
        Self {
            provider,
            displacement,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Attach a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn GeneralizationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Footprint radius used for conflict queries.
    pub fn displacement(&self) -> f64 {
        self.displacement
    }

    /// Resolve conflicts in rank order.
    ///
    /// Consumes the working set: if any query fails the set is dropped with
    /// the error and no partial output escapes.
    pub fn resolve(
        &self,
        ranked: &[RankedFeature],
        mut working_set: WorkingSet,
    ) -> Result<(GeneralizedOutput, Vec<SkippedFeatureWarning>)> {
        ensure_positive("displacement", self.displacement)?;

        let mut points: Vec<GeneralizedPoint> = Vec::new();
        let mut warnings: Vec<SkippedFeatureWarning> = Vec::new();

        for ranked_feature in ranked {
            let focal = &ranked_feature.feature;
            let key = ranked_feature.key;

            if working_set.status(&focal.id) != Some(FeatureStatus::Active) {
                tracing::trace!(feature_id = %focal.id, "Skipping feature no longer pending");
                continue;
            }

            if focal.is_degenerate() {
                let warning = SkippedFeatureWarning::new(focal.id, SkipReason::DegenerateGeometry);
                warning.log();
                warnings.push(warning);
                working_set.remove(&[focal.id], FeatureStatus::Skipped);
                self.metrics.record(ResolutionAction::Skipped, 1);
                continue;
            }

            let conflicts =
                conflict_ids(self.provider.as_ref(), focal, working_set.members(), self.displacement)?;
            let matched = conflicts.len();

            tracing::debug!(
                feature_id = %focal.id,
                matched,
                conflict_count = key.conflict_count,
                remaining = working_set.len(),
                "Resolving focal point"
            );

            match matched {
                k if k > 2 => {
                    let cleared: Vec<FeatureId> = conflicts[1..].to_vec();
                    working_set.remove(&[focal.id], FeatureStatus::Representative);
                    let removed = working_set.remove(&cleared, FeatureStatus::Cleared);

                    self.metrics.record(ResolutionAction::Representative, 1);
                    self.metrics.record(ResolutionAction::Cleared, removed);
                    points.push(GeneralizedPoint::representative(focal, key, k, cleared));
                }
                2 => {
                    let neighbour_id = conflicts[1];
                    let neighbour = working_set
                        .members()
                        .iter()
                        .find(|f| f.id == neighbour_id)
                        .cloned()
                        .ok_or_else(|| {
                            GeneralizationError::QueryProvider(format!(
                                "provider returned feature {} which is not in the working set",
                                neighbour_id
                            ))
                        })?;

                    let pair = [focal.clone(), neighbour];
                    let centroid = self
                        .provider
                        .compute_centroid(&pair)
                        .map_err(GeneralizationError::from_provider)?;
                    working_set.remove(&conflicts, FeatureStatus::Merged);

                    tracing::debug!(
                        feature_id = %focal.id,
                        neighbour = %neighbour_id,
                        centroid = %fmt_point(&centroid),
                        "Merged conflicting pair"
                    );

                    self.metrics.record(ResolutionAction::Merged, 1);
                    points.push(GeneralizedPoint::merged(focal, neighbour_id, centroid, key));
                }
                _ => {
                    working_set.mark_passed_through(&focal.id);
                    self.metrics.record(ResolutionAction::PassThrough, 1);
                    points.push(GeneralizedPoint::pass_through(focal, key, matched));
                }
            }
        }

        let output = GeneralizedOutput {
            points,
            ledger: working_set.into_ledger(),
        };

        tracing::info!(
            output = output.len(),
            passed_through = output.count_status(FeatureStatus::PassedThrough),
            representatives = output.count_status(FeatureStatus::Representative),
            cleared = output.count_status(FeatureStatus::Cleared),
            merged = output.count_status(FeatureStatus::Merged),
            "Resolution complete"
        );

        Ok((output, warnings))
    }
}
