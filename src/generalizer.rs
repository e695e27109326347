//! Pipeline orchestration: intake → rank → resolve → finalize.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GeneralizationError, Result};
use crate::manifest::{RunManifest, RunStats};
use crate::policy::{GeneralizationPolicyV1, RankedFeature};
use crate::postprocess::finalize;
use crate::provider::{GeometryProvider, PlanarGeometryProvider};
use crate::ranker::{type_frequencies, PriorityRanker};
use crate::resolver::ConflictResolver;
use crate::types::{
    FinalSet, GeneralizationMetrics, NoOpMetrics, PointFeature, ResolutionAction, SkipReason,
    SkippedFeatureWarning, SourceFeature, WorkingSet,
};

/// Everything a run produced besides the final points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralizationReport {
    /// Deduplicated, dispersed output.
    pub final_set: FinalSet,
    /// Processing order with the frozen rank keys.
    pub ranked: Vec<RankedFeature>,
    /// Features per type over the valid input.
    pub frequencies: BTreeMap<String, usize>,
    /// Records excluded during intake or resolution.
    pub warnings: Vec<SkippedFeatureWarning>,
    /// Reproducibility record.
    pub manifest: RunManifest,
}

/// Validate raw records into point features.
///
/// Malformed records are skipped with a warning. The call fails only when
/// nothing usable is left or the type field is unknown to the whole set.
pub fn intake(
    sources: &[SourceFeature],
    type_field: &str,
) -> Result<(Vec<PointFeature>, Vec<SkippedFeatureWarning>)> {
    if sources.is_empty() {
        return Err(GeneralizationError::invalid("features", 0, "input set is empty"));
    }
    if !sources.iter().any(|s| s.properties.contains_key(type_field)) {
        return Err(GeneralizationError::invalid(
            "type_field",
            format!("{:?}", type_field),
            "no feature carries this attribute",
        ));
    }

    let mut seen = HashSet::with_capacity(sources.len());
    let mut features = Vec::with_capacity(sources.len());
    let mut warnings = Vec::new();

    for source in sources {
        let checked = if seen.contains(&source.id) {
            Err(SkipReason::DuplicateId)
        } else {
            PointFeature::from_source(source, type_field)
        };
        match checked {
            Ok(feature) => {
                seen.insert(feature.id);
                features.push(feature);
            }
            Err(reason) => {
                let warning = SkippedFeatureWarning::new(source.id, reason);
                warning.log();
                warnings.push(warning);
            }
        }
    }

    if features.is_empty() {
        return Err(GeneralizationError::invalid(
            "features",
            sources.len(),
            "no valid features after intake",
        ));
    }

    Ok((features, warnings))
}

/// Point generalizer.
///
/// Owns a geometry provider and a policy; every run is independent and
/// deterministic given the same input and provider responses.
pub struct Generalizer<P: GeometryProvider> {
    provider: Arc<P>,
    policy: GeneralizationPolicyV1,
    metrics: Arc<dyn GeneralizationMetrics>,
}

impl<P: GeometryProvider> Generalizer<P> {
    /// Create a generalizer.
    pub fn new(provider: Arc<P>, policy: GeneralizationPolicyV1) -> Self {
        Self {
            provider,
            policy,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Attach a metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn GeneralizationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &GeneralizationPolicyV1 {
        &self.policy
    }

    /// Run the pipeline and return the final set.
    pub fn generalize(&self, sources: &[SourceFeature]) -> Result<FinalSet> {
        self.generalize_with_report(sources).map(|report| report.final_set)
    }

    /// Run the pipeline and return the final set with its diagnostics.
    #[tracing::instrument(
        skip(self, sources),
        fields(policy = %self.policy.policy_id(), input = sources.len())
    )]
    pub fn generalize_with_report(&self, sources: &[SourceFeature]) -> Result<GeneralizationReport> {
        let policy = &self.policy;
        policy.validate()?;

        let (features, mut warnings) = intake(sources, &policy.type_field)?;
        self.metrics.record(ResolutionAction::Skipped, warnings.len());

        tracing::info!(
            valid = features.len(),
            skipped = warnings.len(),
            search_distance = policy.search_distance(),
            displacement = policy.displacement(),
            min_distance = policy.min_distance,
            "Intake complete"
        );

        let frequencies = type_frequencies(&features);
        let ranked = PriorityRanker::new(self.provider.clone())
            .rank(&features, policy.search_distance())?;

        let resolver = ConflictResolver::new(self.provider.clone(), policy.displacement())
            .with_metrics(self.metrics.clone());
        let (output, resolve_warnings) = resolver.resolve(&ranked, WorkingSet::new(features.clone()))?;
        warnings.extend(resolve_warnings);

        let stats = RunStats {
            input_features: sources.len(),
            valid_features: features.len(),
            skipped_features: warnings.len(),
            ..RunStats::default()
        }
        .with_ledger(&output);

        let final_set = match finalize(output, policy) {
            Ok(set) => set,
            Err(e) => {
                if let Some(best_effort) = e.best_effort() {
                    self.metrics
                        .record(ResolutionAction::DuplicateRemoved, best_effort.duplicates_removed);
                }
                return Err(e);
            }
        };
        self.metrics
            .record(ResolutionAction::DuplicateRemoved, final_set.duplicates_removed);

        let stats = stats.with_final_set(&final_set);
        let manifest = RunManifest::new(policy, &features, &final_set, stats);

        tracing::info!(
            run_id = %manifest.run_id,
            output = final_set.len(),
            fingerprint = %final_set.fingerprint,
            "Generalization complete"
        );

        Ok(GeneralizationReport {
            final_set,
            ranked,
            frequencies,
            warnings,
            manifest,
        })
    }
}

/// Generalize `features` with the in-memory planar provider.
///
/// `min_distance` is in ground units; use
/// [`GeneralizationPolicyV1::page_to_ground`] to convert page millimetres.
pub fn generalize(
    features: &[SourceFeature],
    type_field: &str,
    reference_scale: f64,
    symbol_size: f64,
    min_distance: f64,
) -> Result<FinalSet> {
    let policy = GeneralizationPolicyV1::new(type_field, reference_scale, symbol_size, min_distance);
    let provider = Arc::new(PlanarGeometryProvider::new(policy.footprint_segments));
    Generalizer::new(provider, policy).generalize(features)
}
