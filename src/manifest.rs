//! Run manifest for reproducible generalization runs.
//!
//! A `RunManifest` ties a final set to the exact input and parameters that
//! produced it. The `run_id` and `computed_at` fields identify the run
//! itself and are kept out of every hash, so two runs over the same data
//! agree on `input_hash`, `params_hash` and `output_fingerprint`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::{canonical_hash_hex, quantize_point, to_canonical_bytes};
use crate::policy::GeneralizationPolicyV1;
use crate::types::{FeatureStatus, FinalSet, GeneralizedOutput, PointFeature};
use crate::GENERALIZATION_SCHEMA_VERSION;

/// Counts describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Source records handed in.
    pub input_features: usize,
    /// Records that survived intake.
    pub valid_features: usize,
    /// Records skipped during intake or resolution.
    pub skipped_features: usize,
    /// Focal points copied unchanged.
    pub passed_through: usize,
    /// Focal points kept as cluster representatives.
    pub representatives: usize,
    /// Cluster members removed by a representative.
    pub cleared: usize,
    /// Features consumed by pairwise merges.
    pub merged: usize,
    /// Coincident points dropped before dispersion.
    pub duplicates_removed: usize,
    /// Dispersion rounds.
    pub dispersion_iterations: usize,
    /// Points in the final set.
    pub output_points: usize,
}

impl RunStats {
    /// Fill resolution counts from the resolver ledger.
    pub fn with_ledger(mut self, output: &GeneralizedOutput) -> Self {
        self.passed_through = output.count_status(FeatureStatus::PassedThrough);
        self.representatives = output.count_status(FeatureStatus::Representative);
        self.cleared = output.count_status(FeatureStatus::Cleared);
        self.merged = output.count_status(FeatureStatus::Merged);
        self
    }

    /// Fill post-processing counts from a final set.
    pub fn with_final_set(mut self, final_set: &FinalSet) -> Self {
        self.duplicates_removed = final_set.duplicates_removed;
        self.dispersion_iterations = final_set.dispersion_iterations;
        self.output_points = final_set.len();
        self
    }
}

/// Reproducibility record of a generalization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// When the run finished.
    pub computed_at: DateTime<Utc>,
    /// Schema version of the output types.
    pub schema_version: String,
    /// Policy version used.
    pub policy_version: String,
    /// Hash of the quantized policy parameters.
    pub params_hash: String,
    /// Hash of the validated input (ids, types, quantized coordinates).
    pub input_hash: String,
    /// Fingerprint of the final set.
    pub output_fingerprint: String,
    /// Run counts.
    pub stats: RunStats,
}

/// Hashed identity of a validated input set, in input order.
pub fn input_hash(features: &[PointFeature]) -> String {
    let canonical: Vec<(u64, &str, (i64, i64))> = features
        .iter()
        .map(|f| (f.id.as_u64(), f.feature_type.as_str(), quantize_point(&f.location)))
        .collect();
    canonical_hash_hex(&canonical)
}

impl RunManifest {
    /// Record a finished run.
    pub fn new(
        policy: &GeneralizationPolicyV1,
        features: &[PointFeature],
        final_set: &FinalSet,
        stats: RunStats,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            schema_version: GENERALIZATION_SCHEMA_VERSION.to_string(),
            policy_version: policy.policy_id().to_string(),
            params_hash: policy.params_hash(),
            input_hash: input_hash(features),
            output_fingerprint: final_set.fingerprint.to_string(),
            stats,
        }
    }

    /// Run-independent identity: every hash plus the schema version.
    pub fn content_id(&self) -> String {
        canonical_hash_hex(&ManifestIdInput {
            schema_version: &self.schema_version,
            policy_version: &self.policy_version,
            params_hash: &self.params_hash,
            input_hash: &self.input_hash,
            output_fingerprint: &self.output_fingerprint,
        })
    }

    /// Whether two manifests describe the same computation.
    pub fn same_content(&self, other: &RunManifest) -> bool {
        self.content_id() == other.content_id()
    }

    /// Serialize to canonical JSON bytes.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        to_canonical_bytes(self)
    }
}

/// Internal struct for computing the content id.
#[derive(Serialize)]
struct ManifestIdInput<'a> {
    schema_version: &'a str,
    policy_version: &'a str,
    params_hash: &'a str,
    input_hash: &'a str,
    output_fingerprint: &'a str,
}
