//! GeneralizationPolicyV1: explicit scale-dependent configuration.
//!
//! Every threshold the algorithm uses is derived from the map scale and the
//! rendered symbol size carried here, instead of from ambient workspace state.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Floats are quantized to integers before hashing (multiply by 1e6 and
//! round to i64) so `params_hash` does not depend on float formatting.

use serde::{Deserialize, Serialize};

use crate::canonical::{canonical_hash_hex, quantize};
use crate::error::{ensure_positive, GeneralizationError, Result};
use crate::DEFAULT_POLICY_VERSION;

/// Quantized policy parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QuantizedPolicyParams {
    version: String,
    type_field: String,
    reference_scale: i64,
    symbol_size: i64,
    min_distance: i64,
    max_dispersion_iterations: usize,
    dispersion_margin: Option<i64>,
    footprint_segments: usize,
}

/// Generalization policy version 1.
///
/// ## Parameters
///
/// - `type_field`: Attribute naming the feature category
/// - `reference_scale`: Map scale denominator (25 000 for 1:25 000)
/// - `symbol_size`: Rendered symbol size in page millimetres
/// - `min_distance`: Required separation of final points, in ground units
/// - `max_dispersion_iterations`: Iteration cap for marker dispersion
/// - `dispersion_margin`: How far dispersion may push points beyond the
///   bounding box of the set (ground units, defaults to 0)
/// - `footprint_segments`: Vertices used when a footprint is materialized
///
/// ## Derived thresholds
///
/// ```text
/// search_distance = symbol_size * reference_scale / 1000
/// displacement    = search_distance / 2
/// density_radius  = search_distance * 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralizationPolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Attribute holding the feature category.
    pub type_field: String,
    /// Map scale denominator.
    pub reference_scale: f64,
    /// Rendered symbol size (page millimetres).
    pub symbol_size: f64,
    /// Minimum separation between final points (ground units).
    pub min_distance: f64,
    /// Maximum dispersion relaxation rounds.
    pub max_dispersion_iterations: usize,
    /// Dispersion envelope margin; `None` keeps points inside the set's bounding box.
    #[serde(default)]
    pub dispersion_margin: Option<f64>,
    /// Vertex count for materialized footprints.
    pub footprint_segments: usize,
}

impl GeneralizationPolicyV1 {
    /// Create a policy for a map scale and symbol size.
    pub fn new(
        type_field: impl Into<String>,
        reference_scale: f64,
        symbol_size: f64,
        min_distance: f64,
    ) -> Self {
        Self {
            type_field: type_field.into(),
            reference_scale,
            symbol_size,
            min_distance,
            ..Self::default()
        }
    }

    /// Set the dispersion iteration bound.
    pub fn with_max_dispersion_iterations(mut self, iterations: usize) -> Self {
        self.max_dispersion_iterations = iterations;
        self
    }

    /// Set the dispersion envelope margin.
    pub fn with_dispersion_margin(mut self, margin: f64) -> Self {
        self.dispersion_margin = Some(margin);
        self
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Symbol diameter in ground units; footprints closer than this conflict.
    pub fn search_distance(&self) -> f64 {
        self.page_to_ground(self.symbol_size)
    }

    /// Footprint radius in ground units.
    pub fn displacement(&self) -> f64 {
        self.search_distance() / 2.0
    }

    /// Neighbourhood radius used for the density rank key.
    pub fn density_radius(&self) -> f64 {
        self.search_distance() * 2.0
    }

    /// Effective dispersion envelope margin.
    ///
    /// With no explicit margin the envelope is the bounding box itself, so
    /// no two points can end further apart than its diagonal.
    pub fn effective_dispersion_margin(&self) -> f64 {
        self.dispersion_margin.unwrap_or(0.0)
    }

    /// Convert a page distance (millimetres) to ground units at the reference scale.
    pub fn page_to_ground(&self, millimetres: f64) -> f64 {
        millimetres * self.reference_scale / 1000.0
    }

    /// Check every parameter before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.type_field.trim().is_empty() {
            return Err(GeneralizationError::invalid(
                "type_field",
                format!("{:?}", self.type_field),
                "must name an attribute",
            ));
        }
        ensure_positive("reference_scale", self.reference_scale)?;
        ensure_positive("symbol_size", self.symbol_size)?;
        ensure_positive("min_distance", self.min_distance)?;
        ensure_positive("search_distance", self.search_distance())?;
        if self.max_dispersion_iterations == 0 {
            return Err(GeneralizationError::invalid(
                "max_dispersion_iterations",
                0,
                "must allow at least one round",
            ));
        }
        if let Some(margin) = self.dispersion_margin {
            if !margin.is_finite() || margin < 0.0 {
                return Err(GeneralizationError::invalid(
                    "dispersion_margin",
                    margin,
                    "must be a finite, non-negative number",
                ));
            }
        }
        if self.footprint_segments < 4 {
            return Err(GeneralizationError::invalid(
                "footprint_segments",
                self.footprint_segments,
                "need at least 4 vertices",
            ));
        }
        Ok(())
    }

    /// Compute a hash of the policy parameters.
    ///
    /// Uses the quantized representation so identical parameters hash
    /// identically across platforms and serde_json versions.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(&self.to_quantized())
    }

    fn to_quantized(&self) -> QuantizedPolicyParams {
        QuantizedPolicyParams {
            version: self.version.clone(),
            type_field: self.type_field.clone(),
            reference_scale: quantize(self.reference_scale),
            symbol_size: quantize(self.symbol_size),
            min_distance: quantize(self.min_distance),
            max_dispersion_iterations: self.max_dispersion_iterations,
            dispersion_margin: self.dispersion_margin.map(quantize),
            footprint_segments: self.footprint_segments,
        }
    }
}

impl Default for GeneralizationPolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            type_field: "Type".to_string(),
            reference_scale: 25_000.0,
            symbol_size: 2.0,
            min_distance: 10.0,
            max_dispersion_iterations: 200,
            dispersion_margin: None,
            footprint_segments: 16,
        }
    }
}
