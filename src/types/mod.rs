//! Core types for point generalization.

pub mod feature;
pub mod working_set;
pub mod output;
pub mod diagnostics;

pub use feature::{FeatureId, AttributeValue, SourceFeature, PointFeature, FeatureStatus, SkipReason};
pub use working_set::WorkingSet;
pub use output::{
    Resolution, GeneralizedPoint, GeneralizedOutput, FinalSet, OutputFingerprint,
    closest_pair_distance,
};
pub use diagnostics::{
    SkippedFeatureWarning, ResolutionAction,
    GeneralizationMetrics, NoOpMetrics, TestMetrics,
};
