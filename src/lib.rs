//! # point-generalizer
//!
//! Deterministic cartographic point generalization.
//!
//! The generalizer answers one question:
//!
//! > Given a dense point layer and a target map scale, which symbols can be
//! > drawn **without overlapping**, and where?
//!
//! ## Core Contract
//!
//! 1. Rank every point by type rarity, local conflict count and neighbourhood density
//! 2. Walk the ranking once, keeping, merging or clearing points against the shrinking working set
//! 3. Deduplicate and disperse the survivors until every pair is `min_distance` apart
//! 4. Produce an **output fingerprint** and run manifest for downstream provenance
//!
//! ## Architecture
//!
//! ```text
//! SourceFeature → intake → PriorityRanker → ConflictResolver → finalize → FinalSet
//!                               ↓                  ↓
//!                      GeometryProvider (planar or host engine)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same input + same policy + same provider responses → identical fingerprint
//! - Rank keys are frozen before resolution; ties keep input order
//! - Dispersion moves all points from one snapshot per round

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod provider;
pub mod ranker;
pub mod resolver;
pub mod postprocess;
pub mod generalizer;
pub mod manifest;
pub mod canonical;
pub mod error;

mod maybe_rayon;

// Re-exports
pub use types::{
    FeatureId, AttributeValue, SourceFeature, PointFeature, FeatureStatus, SkipReason,
    WorkingSet, Resolution, GeneralizedPoint, GeneralizedOutput, FinalSet, OutputFingerprint,
    SkippedFeatureWarning, ResolutionAction, GeneralizationMetrics, NoOpMetrics, TestMetrics,
};
pub use policy::{GeneralizationPolicyV1, RankKey, RankedFeature};
pub use provider::{GeometryProvider, SpatialPredicate, PlanarGeometryProvider, PlanarError};
pub use ranker::{PriorityRanker, type_frequencies};
pub use resolver::{ConflictResolver, conflict_ids};
pub use postprocess::{deduplicate, disperse, finalize, DispersionOutcome};
pub use generalizer::{Generalizer, GeneralizationReport, generalize, intake};
pub use manifest::{RunManifest, RunStats};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use error::{GeneralizationError, Result};

/// Schema version for output and manifest types.
pub const GENERALIZATION_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version.
pub const DEFAULT_POLICY_VERSION: &str = "generalization_policy_v1";
