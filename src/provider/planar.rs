//! In-memory Euclidean geometry provider.

use geo::{BoundingRect, Centroid, Coord, Distance, Euclidean, LineString, MultiPoint, Point, Polygon, Rect};
use std::f64::consts::PI;

use super::{GeometryProvider, SpatialPredicate};
use crate::types::{FeatureId, PointFeature};

/// Error type for the planar provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanarError {
    /// A radius or distance was negative or not finite.
    #[error("Invalid distance: {0}")]
    InvalidDistance(f64),
    /// Centroid of an empty feature set was requested.
    #[error("Centroid of an empty feature set")]
    EmptyCentroid,
}

/// Geometry provider for planar (projected) coordinates.
///
/// Footprints are regular polygons circumscribing the symbol disc, so a
/// footprint never under-covers the symbol it stands for. Intersection
/// queries prefilter on the footprint envelope and then test the exact
/// centre distance.
#[derive(Debug, Clone)]
pub struct PlanarGeometryProvider {
    /// Number of vertices used to approximate a footprint.
    segments: usize,
}

impl PlanarGeometryProvider {
    /// Create a provider with the given footprint resolution (at least 4).
    pub fn new(segments: usize) -> Self {
        Self {
            segments: segments.max(4),
        }
    }

    fn check_distance(value: f64) -> Result<f64, PlanarError> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(PlanarError::InvalidDistance(value))
        }
    }
}

impl Default for PlanarGeometryProvider {
    fn default() -> Self {
        Self::new(16)
    }
}

fn expand(rect: Rect<f64>, by: f64) -> Rect<f64> {
    Rect::new(
        Coord { x: rect.min().x - by, y: rect.min().y - by },
        Coord { x: rect.max().x + by, y: rect.max().y + by },
    )
}

fn rect_contains(rect: &Rect<f64>, p: &Point<f64>) -> bool {
    p.x() >= rect.min().x && p.x() <= rect.max().x && p.y() >= rect.min().y && p.y() <= rect.max().y
}

impl GeometryProvider for PlanarGeometryProvider {
    type Error = PlanarError;

    fn spatial_query(
        &self,
        reference: &Point<f64>,
        candidates: &[PointFeature],
        predicate: SpatialPredicate,
    ) -> Result<Vec<FeatureId>, Self::Error> {
        match predicate {
            SpatialPredicate::Intersects { footprint_radius } => {
                let r = Self::check_distance(footprint_radius)?;
                let footprint = self.buffer_footprint(reference, r)?;
                // A candidate footprint can only touch ours if its centre lies
                // within one radius of our envelope.
                let envelope = match footprint.bounding_rect() {
                    Some(rect) => expand(rect, r),
                    None => return Ok(Vec::new()),
                };
                Ok(candidates
                    .iter()
                    .filter(|c| rect_contains(&envelope, &c.location))
                    .filter(|c| Euclidean::distance(*reference, c.location) <= 2.0 * r)
                    .map(|c| c.id)
                    .collect())
            }
            SpatialPredicate::WithinDistance { distance } => {
                let d = Self::check_distance(distance)?;
                Ok(candidates
                    .iter()
                    .filter(|c| Euclidean::distance(*reference, c.location) <= d)
                    .map(|c| c.id)
                    .collect())
            }
        }
    }

    fn compute_centroid(&self, features: &[PointFeature]) -> Result<Point<f64>, Self::Error> {
        let points: MultiPoint<f64> = features.iter().map(|f| f.location).collect();
        points.centroid().ok_or(PlanarError::EmptyCentroid)
    }

    fn buffer_footprint(&self, point: &Point<f64>, radius: f64) -> Result<Polygon<f64>, Self::Error> {
        let r = Self::check_distance(radius)?;
        let n = self.segments;
        // Circumscribe the disc: vertices sit at r / cos(pi / n).
        let vertex_radius = r / (PI / n as f64).cos();

        let mut coords = Vec::with_capacity(n + 1);
        for i in 0..n {
            let angle = 2.0 * PI * i as f64 / n as f64;
            coords.push((
                point.x() + vertex_radius * angle.cos(),
                point.y() + vertex_radius * angle.sin(),
            ));
        }
        // Close the ring
        coords.push(coords[0]);

        Ok(Polygon::new(LineString::from(coords), vec![]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Contains;

    fn features() -> Vec<PointFeature> {
        vec![
            PointFeature::new(1, "a", 0.0, 0.0),
            PointFeature::new(2, "a", 3.0, 4.0),
            PointFeature::new(3, "b", 10.0, 0.0),
            PointFeature::new(4, "b", -20.0, 0.0),
        ]
    }

    #[test]
    fn test_intersects_uses_twice_the_radius() {
        let provider = PlanarGeometryProvider::default();
        let hits = provider
            .spatial_query(
                &Point::new(0.0, 0.0),
                &features(),
                SpatialPredicate::Intersects { footprint_radius: 2.5 },
            )
            .unwrap();
        // Distance 5 == 2 * 2.5: touching footprints intersect.
        assert_eq!(hits, vec![FeatureId::new(1), FeatureId::new(2)]);
    }

    #[test]
    fn test_within_distance() {
        let provider = PlanarGeometryProvider::default();
        let hits = provider
            .spatial_query(
                &Point::new(0.0, 0.0),
                &features(),
                SpatialPredicate::WithinDistance { distance: 10.0 },
            )
            .unwrap();
        assert_eq!(hits, vec![FeatureId::new(1), FeatureId::new(2), FeatureId::new(3)]);
    }

    #[test]
    fn test_invalid_distance() {
        let provider = PlanarGeometryProvider::default();
        let err = provider
            .spatial_query(
                &Point::new(0.0, 0.0),
                &features(),
                SpatialPredicate::WithinDistance { distance: -1.0 },
            )
            .unwrap_err();
        assert_eq!(err, PlanarError::InvalidDistance(-1.0));
    }

    #[test]
    fn test_centroid_is_mean_centre() {
        let provider = PlanarGeometryProvider::default();
        let pair = [PointFeature::new(1, "a", 0.0, 0.0), PointFeature::new(2, "a", 9.0, 3.0)];
        let c = provider.compute_centroid(&pair).unwrap();
        assert!((c.x() - 4.5).abs() < 1e-12);
        assert!((c.y() - 1.5).abs() < 1e-12);
        assert_eq!(provider.compute_centroid(&[]), Err(PlanarError::EmptyCentroid));
    }

    #[test]
    fn test_footprint_covers_disc() {
        let provider = PlanarGeometryProvider::new(6);
        let footprint = provider.buffer_footprint(&Point::new(1.0, 1.0), 2.0).unwrap();
        assert_eq!(footprint.exterior().0.len(), 7);
        // Points just inside the disc along several bearings are covered.
        for k in 0..12 {
            let angle = k as f64 * PI / 6.0;
            let p = Point::new(1.0 + 1.99 * angle.cos(), 1.0 + 1.99 * angle.sin());
            assert!(footprint.contains(&p), "bearing {} not covered", k);
        }
    }
}
