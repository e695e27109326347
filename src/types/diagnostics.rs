//! Run diagnostics: skipped-feature warnings and metrics counters.
//!
//! ## Metrics Integration
//!
//! Every resolver decision and every locally recovered problem maps to a
//! counter name. The `GeneralizationMetrics` trait is the interface for
//! observability backends; `NoOpMetrics` is the default.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::feature::{FeatureId, SkipReason};

/// A source record excluded from ranking and resolution.
///
/// Non-fatal: other features are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFeatureWarning {
    /// Host id of the skipped record.
    pub feature_id: FeatureId,
    /// Why it was skipped.
    pub reason: SkipReason,
}

impl SkippedFeatureWarning {
    /// Create a new warning.
    pub fn new(feature_id: FeatureId, reason: SkipReason) -> Self {
        Self { feature_id, reason }
    }

    /// Log this warning as a structured event.
    pub fn log(&self) {
        tracing::warn!(
            feature_id = %self.feature_id,
            reason = %self.reason,
            "Skipping malformed feature"
        );
    }
}

impl std::fmt::Display for SkippedFeatureWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature {} skipped: {}", self.feature_id, self.reason)
    }
}

/// Countable events of a generalization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Focal point had no conflicts.
    PassThrough,
    /// Focal point kept for a cluster of more than two.
    Representative,
    /// Cluster member removed by a representative.
    Cleared,
    /// Two features replaced by their centroid.
    Merged,
    /// Source record excluded during intake.
    Skipped,
    /// Coincident output point dropped.
    DuplicateRemoved,
}

impl ResolutionAction {
    /// Get the metric name for this action.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::PassThrough => "point_generalization_pass_through_total",
            Self::Representative => "point_generalization_representative_total",
            Self::Cleared => "point_generalization_cleared_total",
            Self::Merged => "point_generalization_merged_total",
            Self::Skipped => "point_generalization_skipped_features_total",
            Self::DuplicateRemoved => "point_generalization_duplicates_removed_total",
        }
    }
}

impl std::fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassThrough => write!(f, "pass_through"),
            Self::Representative => write!(f, "representative"),
            Self::Cleared => write!(f, "cleared"),
            Self::Merged => write!(f, "merged"),
            Self::Skipped => write!(f, "skipped"),
            Self::DuplicateRemoved => write!(f, "duplicate_removed"),
        }
    }
}

/// Metrics counter interface.
pub trait GeneralizationMetrics: Send + Sync {
    /// Increment a counter by `by`.
    fn increment(&self, metric_name: &str, by: u64);

    /// Record `count` occurrences of an action.
    fn record(&self, action: ResolutionAction, count: usize) {
        if count > 0 {
            self.increment(action.metric_name(), count as u64);
        }
    }
}

/// No-op metrics implementation.
#[derive(Debug, Default)]
pub struct NoOpMetrics;

impl GeneralizationMetrics for NoOpMetrics {
    fn increment(&self, _metric_name: &str, _by: u64) {}
}

/// In-memory metrics for testing.
#[derive(Debug, Default)]
pub struct TestMetrics {
    counters: Mutex<HashMap<String, u64>>,
}

impl GeneralizationMetrics for TestMetrics {
    fn increment(&self, metric_name: &str, by: u64) {
        *self.counters.lock().entry(metric_name.to_string()).or_insert(0) += by;
    }
}

impl TestMetrics {
    /// Get the count for a metric.
    pub fn get_count(&self, metric_name: &str) -> u64 {
        self.counters.lock().get(metric_name).copied().unwrap_or(0)
    }

    /// Get the count for an action.
    pub fn count(&self, action: ResolutionAction) -> u64 {
        self.get_count(action.metric_name())
    }
}
