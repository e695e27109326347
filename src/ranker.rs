//! Priority ranking of point features.
//!
//! Every key component is a query against the *full input* feature set, so
//! the keys are independent of each other and computed in parallel. They
//! are frozen before resolution starts and never recomputed.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ensure_positive, GeneralizationError, Result};
use crate::maybe_rayon::*;
use crate::policy::{RankKey, RankedFeature};
use crate::provider::{GeometryProvider, SpatialPredicate};
use crate::resolver::conflict_ids;
use crate::types::PointFeature;

/// Count features per type over the full input.
pub fn type_frequencies(features: &[PointFeature]) -> BTreeMap<String, usize> {
    let mut frequencies = BTreeMap::new();
    for feature in features {
        *frequencies.entry(feature.feature_type.clone()).or_insert(0) += 1;
    }
    frequencies
}

/// Computes rank keys and the processing order.
pub struct PriorityRanker<P: GeometryProvider> {
    provider: Arc<P>,
}

impl<P: GeometryProvider> PriorityRanker<P> {
    /// Create a ranker backed by a geometry provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Rank features for resolution.
    ///
    /// Returns the features stably sorted ascending by
    /// `(frequency, -conflict_count, density)`; ties keep input order.
    ///
    /// - `frequency`: features sharing the type, over the full input
    /// - `conflict_count`: conflict set size with footprints of radius
    ///   `search_distance / 2`
    /// - `density`: other features within `2 * search_distance`
    pub fn rank(&self, features: &[PointFeature], search_distance: f64) -> Result<Vec<RankedFeature>> {
        ensure_positive("search_distance", search_distance)?;

        let frequencies = type_frequencies(features);
        let footprint_radius = search_distance / 2.0;
        let density_radius = search_distance * 2.0;

        let keys: Vec<RankKey> = features
            .into_par_iter()
            .map(|feature| -> Result<RankKey> {
                let frequency = frequencies.get(&feature.feature_type).copied().unwrap_or(0);
                let conflict_count =
                    conflict_ids(self.provider.as_ref(), feature, features, footprint_radius)?.len();
                let density = self
                    .provider
                    .spatial_query(
                        &feature.location,
                        features,
                        SpatialPredicate::WithinDistance { distance: density_radius },
                    )
                    .map_err(GeneralizationError::from_provider)?
                    .into_iter()
                    .filter(|id| *id != feature.id)
                    .count();
                Ok(RankKey::new(frequency, conflict_count, density))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut ranked: Vec<RankedFeature> = features
            .iter()
            .cloned()
            .zip(keys)
            .map(|(feature, key)| RankedFeature::new(feature, key))
            .collect();
        // Vec::sort_by is stable: equal keys keep input order.
        ranked.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::info!(
            features = ranked.len(),
            types = frequencies.len(),
            conflicted = ranked.iter().filter(|r| r.key.conflict_count > 0).count(),
            "Ranking complete"
        );

        Ok(ranked)
    }
}
