//! Golden tests for the point generalizer.
//!
//! These tests pin the reference scenarios and verify determinism and
//! correctness of the full pipeline.

use std::sync::Arc;

use geo::{Point, Polygon};
use point_generalizer::{
    generalize, FeatureId, GeneralizationError, GeneralizationPolicyV1,
    Generalizer, GeometryProvider, PlanarGeometryProvider, PointFeature, Resolution,
    ResolutionAction, SkipReason, SourceFeature, SpatialPredicate, TestMetrics,
};

/// Scale and symbol size giving a search distance of 20 ground units.
const SCALE: f64 = 10_000.0;
const SYMBOL: f64 = 2.0;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn typed(id: u64, kind: &str, x: f64, y: f64) -> SourceFeature {
    SourceFeature::new(id, x, y).with_text("Type", kind)
}

fn generalizer(policy: GeneralizationPolicyV1) -> Generalizer<PlanarGeometryProvider> {
    let provider = Arc::new(PlanarGeometryProvider::new(policy.footprint_segments));
    Generalizer::new(provider, policy)
}

/// Fixed pseudo-random layout over a 400 x 400 extent.
fn scattered_layer(n: u64) -> Vec<SourceFeature> {
    let kinds = ["school", "pharmacy", "bank", "library"];
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (1..=n)
        .map(|id| {
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            let x = ((state >> 33) % 400) as f64;
            state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
            let y = ((state >> 33) % 400) as f64;
            typed(id, kinds[(id % 4) as usize], x, y)
        })
        .collect()
}

/// Provider whose backend is unreachable.
struct OfflineProvider;

#[derive(Debug, thiserror::Error)]
#[error("geometry service offline")]
struct Offline;

impl GeometryProvider for OfflineProvider {
    type Error = Offline;

    fn spatial_query(
        &self,
        _reference: &Point<f64>,
        _candidates: &[PointFeature],
        _predicate: SpatialPredicate,
    ) -> Result<Vec<FeatureId>, Offline> {
        Err(Offline)
    }

    fn compute_centroid(&self, _features: &[PointFeature]) -> Result<Point<f64>, Offline> {
        Err(Offline)
    }

    fn buffer_footprint(&self, _point: &Point<f64>, _radius: f64) -> Result<Polygon<f64>, Offline> {
        Err(Offline)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// REFERENCE SCENARIOS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_a_cluster_and_isolated_pair() {
    let input = vec![
        typed(1, "school", 0.0, 0.0),
        typed(2, "school", 3.0, 0.0),
        typed(3, "school", 0.0, 3.0),
        typed(4, "school", 1000.0, 0.0),
        typed(5, "school", 0.0, 1000.0),
    ];
    let report = generalizer(GeneralizationPolicyV1::new("Type", SCALE, SYMBOL, 1.0))
        .generalize_with_report(&input)
        .unwrap();

    let set = &report.final_set;
    assert_eq!(set.len(), 3);

    let ids: Vec<u64> = set.points.iter().map(|p| p.source.as_u64()).collect();
    assert_eq!(ids, vec![1, 4, 5]);
    assert_eq!(
        set.points[0].resolution,
        Resolution::Representative { cleared: vec![FeatureId::new(2), FeatureId::new(3)] }
    );
    assert_eq!(set.points[0].location, Point::new(0.0, 0.0));
    assert_eq!(set.points[1].location, Point::new(1000.0, 0.0));
    assert_eq!(set.points[2].location, Point::new(0.0, 1000.0));
}

#[test]
fn test_scenario_b_pair_merges_to_midpoint() {
    // search_distance / 2 - 1 = 9 apart
    let input = vec![typed(1, "bank", 0.0, 0.0), typed(2, "bank", 9.0, 0.0)];
    let set = generalize(&input, "Type", SCALE, SYMBOL, 1.0).unwrap();

    assert_eq!(set.len(), 1);
    assert!((set.points[0].location.x() - 4.5).abs() < 1e-9);
    assert!(set.points[0].location.y().abs() < 1e-9);
    assert_eq!(
        set.points[0].resolution,
        Resolution::Merged { members: [FeatureId::new(1), FeatureId::new(2)] }
    );
}

#[test]
fn test_scenario_c_isolated_point_unchanged() {
    let input = vec![typed(42, "library", 7.5, -3.25)];
    let set = generalize(&input, "Type", SCALE, SYMBOL, 5.0).unwrap();

    assert_eq!(set.len(), 1);
    assert_eq!(set.points[0].location, Point::new(7.5, -3.25));
    assert_eq!(set.points[0].offset(), 0.0);
    assert_eq!(set.points[0].resolution, Resolution::PassThrough);
    assert_eq!(set.dispersion_iterations, 0);
}

#[test]
fn test_scenario_d_min_distance_beyond_extent() {
    let input = vec![
        typed(1, "a", 0.0, 0.0),
        typed(2, "a", 1.0, 0.0),
        typed(3, "a", 0.0, 1.0),
    ];
    let policy = GeneralizationPolicyV1::new("Type", 1_000.0, 0.1, 100.0)
        .with_max_dispersion_iterations(50);

    let err = generalizer(policy).generalize(&input).unwrap_err();
    match err {
        GeneralizationError::DispersionNonConvergence {
            iterations,
            min_distance,
            closest_pair,
            best_effort,
        } => {
            assert_eq!(iterations, 50);
            assert_eq!(min_distance, 100.0);
            assert!(closest_pair < 100.0);
            assert_eq!(best_effort.len(), 3);
        }
        other => panic!("expected non-convergence, got {other}"),
    }
}

#[test]
fn test_scenario_d_default_envelope_is_bounding_box() {
    // Two isolated points 100 apart: the bounding diagonal is 100.
    let pair = vec![typed(1, "a", 0.0, 0.0), typed(2, "a", 100.0, 0.0)];
    match generalize(&pair, "Type", SCALE, SYMBOL, 105.0) {
        Err(GeneralizationError::DispersionNonConvergence { closest_pair, best_effort, .. }) => {
            assert_eq!(closest_pair, 100.0);
            assert_eq!(best_effort.locations(), vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        }
        other => panic!("expected non-convergence, got {other:?}"),
    }

    let set = generalize(&pair, "Type", SCALE, SYMBOL, 99.0).unwrap();
    assert_eq!(set.dispersion_iterations, 0);

    // Diagonal of a 30 x 40 box is 50.
    let diagonal = vec![typed(1, "a", 0.0, 0.0), typed(2, "a", 30.0, 40.0)];
    assert!(matches!(
        generalize(&diagonal, "Type", SCALE, SYMBOL, 50.5),
        Err(GeneralizationError::DispersionNonConvergence { .. })
    ));
    assert!(generalize(&diagonal, "Type", SCALE, SYMBOL, 49.5).is_ok());
}

// ─────────────────────────────────────────────────────────────────────────────
// DETERMINISM TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_runs_identical() {
    let input = scattered_layer(120);
    let policy = GeneralizationPolicyV1::new("Type", SCALE, 1.0, 4.0).with_dispersion_margin(50.0);

    let first = generalizer(policy.clone()).generalize_with_report(&input).unwrap();
    let second = generalizer(policy).generalize_with_report(&input).unwrap();

    assert_eq!(first.final_set.fingerprint, second.final_set.fingerprint);
    assert_eq!(first.final_set.locations(), second.final_set.locations());
    assert_eq!(first.ranked, second.ranked);
    assert_ne!(first.manifest.run_id, second.manifest.run_id);
    assert!(first.manifest.same_content(&second.manifest));
}

#[test]
fn test_input_hash_ignores_skipped_records() {
    let clean = scattered_layer(40);
    let mut noisy = clean.clone();
    noisy.push(SourceFeature::null_geometry(1_000).with_text("Type", "school"));
    noisy.push(typed(1_001, "school", f64::NAN, 0.0));

    let policy = GeneralizationPolicyV1::new("Type", SCALE, 1.0, 2.0).with_dispersion_margin(50.0);
    let a = generalizer(policy.clone()).generalize_with_report(&clean).unwrap();
    let b = generalizer(policy).generalize_with_report(&noisy).unwrap();

    assert_eq!(a.manifest.input_hash, b.manifest.input_hash);
    assert_eq!(a.final_set.fingerprint, b.final_set.fingerprint);
    assert_eq!(b.warnings.len(), 2);
    assert_eq!(b.warnings[0].reason, SkipReason::NullGeometry);
    assert_eq!(b.warnings[1].reason, SkipReason::DegenerateGeometry);
}

// ─────────────────────────────────────────────────────────────────────────────
// CORRECTNESS TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_merge_takes_focal_type() {
    // "museum" is rarer, so it is the focal point of the pair.
    let input = vec![
        typed(1, "school", 6.0, 8.0),
        typed(2, "museum", 0.0, 0.0),
        typed(3, "school", 1000.0, 1000.0),
    ];
    let set = generalize(&input, "Type", SCALE, SYMBOL, 1.0).unwrap();

    assert_eq!(set.len(), 2);
    let merged = &set.points[0];
    assert_eq!(merged.feature_type, "museum");
    assert_eq!(merged.source, FeatureId::new(2));
    assert!((merged.location.x() - 3.0).abs() < 1e-9);
    assert!((merged.location.y() - 4.0).abs() < 1e-9);
}

#[test]
fn test_keep_and_clear_conservation() {
    let input = vec![
        typed(1, "a", 0.0, 0.0),
        typed(2, "a", 5.0, 0.0),
        typed(3, "a", 0.0, 5.0),
        typed(4, "a", 5.0, 5.0),
        typed(5, "a", 500.0, 0.0),
    ];
    let metrics = Arc::new(TestMetrics::default());
    let report = generalizer(GeneralizationPolicyV1::new("Type", SCALE, SYMBOL, 1.0))
        .with_metrics(metrics.clone())
        .generalize_with_report(&input)
        .unwrap();

    let stats = &report.manifest.stats;
    // k = 4: one representative, three cleared, one output point for the step.
    assert_eq!(stats.representatives + stats.cleared, 4);
    assert_eq!(stats.representatives, 1);
    assert_eq!(stats.passed_through, 1);
    assert_eq!(report.final_set.len(), 2);
    assert_eq!(metrics.count(ResolutionAction::Representative), 1);
    assert_eq!(metrics.count(ResolutionAction::Cleared), 3);
    assert_eq!(report.ranked[0].key.conflict_count, 4);
}

#[test]
fn test_removed_point_never_resolved_again() {
    // 2 overlaps both 1 and 3 (which do not overlap each other) and clears them.
    let input = vec![
        typed(1, "a", 0.0, 0.0),
        typed(2, "a", 15.0, 0.0),
        typed(3, "a", 30.0, 0.0),
        typed(4, "b", 0.0, 500.0),
    ];
    let report = generalizer(GeneralizationPolicyV1::new("Type", SCALE, SYMBOL, 1.0))
        .generalize_with_report(&input)
        .unwrap();

    // 2 has the most conflicts and goes first among the "a" features.
    assert_eq!(report.ranked[1].feature.id, FeatureId::new(2));
    let set = &report.final_set;
    assert_eq!(set.len(), 2);
    assert_eq!(
        set.points[1].resolution,
        Resolution::Representative { cleared: vec![FeatureId::new(1), FeatureId::new(3)] }
    );
    assert_eq!(report.manifest.stats.cleared, 2);
}

#[test]
fn test_dispersion_enforces_min_distance() {
    // 3 x 3 grid with spacing 3: no symbol conflicts, but closer than min_distance.
    let mut input = Vec::new();
    for i in 0..3u64 {
        for j in 0..3u64 {
            input.push(typed(i * 3 + j + 1, "a", i as f64 * 3.0, j as f64 * 3.0));
        }
    }
    let policy = GeneralizationPolicyV1::new("Type", SCALE, 0.2, 5.0).with_dispersion_margin(20.0);
    let set = generalizer(policy).generalize(&input).unwrap();

    assert_eq!(set.len(), 9);
    assert!(set.dispersion_iterations > 0);
    assert!(set.closest_pair_distance().unwrap() >= 5.0 * (1.0 - 1e-9));
    assert!(set.points.iter().any(|p| p.offset() > 0.0));
}

// ─────────────────────────────────────────────────────────────────────────────
// ERROR TESTS
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_empty_input_rejected() {
    let result = generalize(&[], "Type", SCALE, SYMBOL, 1.0);
    assert!(matches!(
        result,
        Err(GeneralizationError::InvalidParameter { name: "features", .. })
    ));
}

#[test]
fn test_non_positive_parameters_rejected() {
    let input = vec![typed(1, "a", 0.0, 0.0)];
    for (scale, size, min) in [(0.0, 2.0, 1.0), (SCALE, -1.0, 1.0), (SCALE, 2.0, 0.0)] {
        assert!(matches!(
            generalize(&input, "Type", scale, size, min),
            Err(GeneralizationError::InvalidParameter { .. })
        ));
    }
    assert!(matches!(
        generalize(&input, "", SCALE, SYMBOL, 1.0),
        Err(GeneralizationError::InvalidParameter { name: "type_field", .. })
    ));
}

#[test]
fn test_provider_failure_aborts_run() {
    let input = vec![typed(1, "a", 0.0, 0.0), typed(2, "a", 5.0, 0.0)];
    let generalizer = Generalizer::new(
        Arc::new(OfflineProvider),
        GeneralizationPolicyV1::new("Type", SCALE, SYMBOL, 1.0),
    );

    let err = generalizer.generalize(&input).unwrap_err();
    assert!(matches!(err, GeneralizationError::QueryProvider(ref m) if m == "geometry service offline"));
    assert!(err.best_effort().is_none());
}

#[test]
fn test_ledger_covers_every_valid_feature() {
    let input = scattered_layer(60);
    let policy = GeneralizationPolicyV1::new("Type", SCALE, 2.0, 1.0).with_dispersion_margin(50.0);
    let report = generalizer(policy).generalize_with_report(&input).unwrap();

    let stats = &report.manifest.stats;
    assert_eq!(
        stats.passed_through + stats.representatives + stats.cleared + stats.merged,
        stats.valid_features
    );
    assert_eq!(
        stats.output_points + stats.duplicates_removed,
        stats.passed_through + stats.representatives + stats.merged / 2
    );
}
