//! The mutable working set consumed by the conflict resolver.

use std::collections::BTreeMap;

use super::feature::{FeatureId, FeatureStatus, PointFeature};

/// Current state of generalization.
///
/// Starts as a copy of the full valid input and only ever shrinks. Members
/// are kept in input order so spatial queries see a stable candidate list;
/// the status ledger is keyed by [`FeatureId`] and survives removal, so a
/// removed feature can never be re-admitted.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    members: Vec<PointFeature>,
    status: BTreeMap<FeatureId, FeatureStatus>,
}

impl WorkingSet {
    /// Create a working set from validated features.
    ///
    /// Callers are expected to have de-duplicated ids during intake; a
    /// repeated id keeps only its first occurrence.
    pub fn new(features: impl IntoIterator<Item = PointFeature>) -> Self {
        let mut set = Self::default();
        for feature in features {
            if set.status.contains_key(&feature.id) {
                continue;
            }
            set.status.insert(feature.id, FeatureStatus::Active);
            set.members.push(feature);
        }
        set
    }

    /// Features currently present, in input order.
    pub fn members(&self) -> &[PointFeature] {
        &self.members
    }

    /// Number of features still present.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether no features are present.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the feature is still present.
    pub fn contains(&self, id: &FeatureId) -> bool {
        self.status.get(id).map(|s| s.is_present()).unwrap_or(false)
    }

    /// Current status of a feature, `None` if it was never admitted.
    pub fn status(&self, id: &FeatureId) -> Option<FeatureStatus> {
        self.status.get(id).copied()
    }

    /// Mark a present feature as processed without removing it.
    pub fn mark_passed_through(&mut self, id: &FeatureId) {
        if let Some(status) = self.status.get_mut(id) {
            if *status == FeatureStatus::Active {
                *status = FeatureStatus::PassedThrough;
            }
        }
    }

    /// Remove features, recording why. Returns how many were actually removed.
    ///
    /// Ids that are absent (never admitted or already removed) are ignored.
    pub fn remove(&mut self, ids: &[FeatureId], status: FeatureStatus) -> usize {
        debug_assert!(!status.is_present(), "removal status must be terminal");

        let mut removed = 0;
        for id in ids {
            if let Some(current) = self.status.get_mut(id) {
                if current.is_present() {
                    *current = status;
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            let status = &self.status;
            self.members
                .retain(|f| status.get(&f.id).map(|s| s.is_present()).unwrap_or(false));
        }
        removed
    }

    /// Final status of every admitted feature.
    pub fn into_ledger(self) -> BTreeMap<FeatureId, FeatureStatus> {
        self.status
    }
}
