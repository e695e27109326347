//! Geometry/query providers.
//!
//! The resolver never evaluates spatial predicates itself: every proximity
//! test, centroid and footprint goes through a [`GeometryProvider`], so a host
//! platform can substitute its own geometry engine.

pub mod planar;

use geo::{Point, Polygon};

use crate::types::{FeatureId, PointFeature};

/// Spatial predicate evaluated by [`GeometryProvider::spatial_query`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialPredicate {
    /// The candidate's footprint intersects the reference footprint; both
    /// footprints are discs of `footprint_radius`.
    Intersects {
        /// Footprint radius in ground units.
        footprint_radius: f64,
    },
    /// The candidate lies within `distance` of the reference point.
    WithinDistance {
        /// Search distance in ground units.
        distance: f64,
    },
}

/// Trait for geometry backends.
///
/// Implementations must be deterministic: identical arguments give identical
/// results, and query results preserve candidate order. Each call is
/// stateless; no connection state is carried between queries.
pub trait GeometryProvider: Send + Sync {
    /// Error type for provider operations.
    type Error: std::error::Error + Send + Sync;

    /// Ids of the candidates that satisfy `predicate` against `reference`,
    /// in candidate order. A candidate located at `reference` itself matches.
    fn spatial_query(
        &self,
        reference: &Point<f64>,
        candidates: &[PointFeature],
        predicate: SpatialPredicate,
    ) -> Result<Vec<FeatureId>, Self::Error>;

    /// Mean centre of a non-empty set of features.
    fn compute_centroid(&self, features: &[PointFeature]) -> Result<Point<f64>, Self::Error>;

    /// Symbol footprint of a point: a polygon covering the disc of `radius`.
    fn buffer_footprint(&self, point: &Point<f64>, radius: f64) -> Result<Polygon<f64>, Self::Error>;
}

pub use planar::{PlanarGeometryProvider, PlanarError};
