//! Error types for point generalization.

use geo::Point;

use crate::types::FinalSet;

/// Main error type for generalization runs.
///
/// Any error aborts the whole run: the resolver's decisions depend on every
/// earlier decision, so no partial output is returned except the diagnostic
/// best-effort set carried by [`GeneralizationError::DispersionNonConvergence`].
#[derive(Debug, thiserror::Error)]
pub enum GeneralizationError {
    /// A caller-supplied parameter or the input set itself is unusable.
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value, rendered for display.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The geometry provider failed mid-query.
    #[error("Query provider error: {0}")]
    QueryProvider(String),

    /// Marker dispersion could not reach `min_distance` within the iteration bound.
    #[error(
        "Dispersion did not converge after {iterations} iterations \
         (min_distance = {min_distance}, closest pair = {closest_pair})"
    )]
    DispersionNonConvergence {
        /// Iterations performed before giving up.
        iterations: usize,
        /// Separation that was requested.
        min_distance: f64,
        /// Smallest pairwise distance in the best-effort set.
        closest_pair: f64,
        /// Last best-effort (still over-dense) set, for diagnostics.
        best_effort: Box<FinalSet>,
    },
}

impl GeneralizationError {
    /// Create a provider error from any error type.
    pub fn from_provider<E: std::error::Error>(e: E) -> Self {
        Self::QueryProvider(e.to_string())
    }

    /// Create an invalid-parameter error.
    pub fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Best-effort set attached to a non-convergence error, if any.
    pub fn best_effort(&self) -> Option<&FinalSet> {
        match self {
            Self::DispersionNonConvergence { best_effort, .. } => Some(best_effort),
            _ => None,
        }
    }
}

/// Reject a distance-like value that is not strictly positive and finite.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeneralizationError::invalid(name, value, "must be a positive, finite number"))
    }
}

/// Render a point for error messages and logs.
pub(crate) fn fmt_point(p: &Point<f64>) -> String {
    format!("({}, {})", p.x(), p.y())
}

/// Result type alias for generalization operations.
pub type Result<T> = std::result::Result<T, GeneralizationError>;
