//! Generalization policies and processing-order keys.

pub mod v1;
pub mod rank_key;

pub use v1::GeneralizationPolicyV1;
pub use rank_key::{RankKey, RankedFeature};
