//! Post-processing: deduplication and marker dispersion.
//!
//! ## Dispersion
//!
//! Each round is a read-then-move barrier:
//!
//! 1. Snapshot all locations
//! 2. Find every pair closer than `min_distance`
//! 3. Push both members apart along their connecting line by half the deficit
//! 4. Apply all offsets at once and clamp to the envelope
//!
//! The envelope is the bounding box of the deduplicated set grown by the
//! dispersion margin (0 by default). No pair can end further apart than the
//! envelope diagonal, so a `min_distance` beyond it never converges.

use geo::{Coord, Distance, Euclidean, Point, Rect};
use std::collections::HashSet;

use crate::error::{ensure_positive, GeneralizationError, Result};
use crate::policy::GeneralizationPolicyV1;
use crate::types::{closest_pair_distance, FinalSet, GeneralizedOutput, GeneralizedPoint};

/// Rotation between successive fallback directions for coincident pairs.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Relative slack below `min_distance` still accepted as separated.
const SEPARATION_TOLERANCE: f64 = 1e-9;

/// Pairs are pushed to slightly beyond `min_distance` so that partially
/// cancelled pushes still cross the threshold in finitely many rounds.
const SEPARATION_OVERSHOOT: f64 = 1e-6;

/// Outcome of a dispersion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispersionOutcome {
    /// Rounds that moved at least one point.
    pub iterations: usize,
    /// Whether every pair ended at least `min_distance` apart.
    pub converged: bool,
}

/// Exact-coordinate identity; `-0.0` and `0.0` are the same key.
fn coordinate_key(p: &Point<f64>) -> (u64, u64) {
    ((p.x() + 0.0).to_bits(), (p.y() + 0.0).to_bits())
}

/// Drop points whose location exactly matches an earlier point.
///
/// Keeps the first occurrence, so the result is stable and running it again
/// removes nothing.
pub fn deduplicate(points: Vec<GeneralizedPoint>) -> (Vec<GeneralizedPoint>, usize) {
    let before = points.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<GeneralizedPoint> = points
        .into_iter()
        .filter(|p| seen.insert(coordinate_key(&p.location)))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

fn envelope(points: &[GeneralizedPoint], margin: f64) -> Option<Rect<f64>> {
    let first = points.first()?.location;
    let (mut min, mut max) = (Coord::from(first), Coord::from(first));
    for p in &points[1..] {
        min.x = min.x.min(p.location.x());
        min.y = min.y.min(p.location.y());
        max.x = max.x.max(p.location.x());
        max.y = max.y.max(p.location.y());
    }
    Some(Rect::new(
        Coord { x: min.x - margin, y: min.y - margin },
        Coord { x: max.x + margin, y: max.y + margin },
    ))
}

fn clamp(p: Point<f64>, rect: &Rect<f64>) -> Point<f64> {
    Point::new(
        p.x().clamp(rect.min().x, rect.max().x),
        p.y().clamp(rect.min().y, rect.max().y),
    )
}

/// Offsets that would resolve every violation in `locations`, or `None`
/// when all pairs are already separated.
fn separation_offsets(locations: &[Point<f64>], min_distance: f64) -> Option<Vec<(f64, f64)>> {
    let threshold = min_distance * (1.0 - SEPARATION_TOLERANCE);
    let target = min_distance * (1.0 + SEPARATION_OVERSHOOT);
    let n = locations.len();
    let mut offsets = vec![(0.0, 0.0); n];
    let mut violated = false;

    for i in 0..n {
        for j in (i + 1)..n {
            let d = Euclidean::distance(locations[i], locations[j]);
            if d >= threshold {
                continue;
            }
            violated = true;

            let (ux, uy) = if d > 0.0 {
                (
                    (locations[j].x() - locations[i].x()) / d,
                    (locations[j].y() - locations[i].y()) / d,
                )
            } else {
                let angle = (i * n + j) as f64 * GOLDEN_ANGLE;
                (angle.cos(), angle.sin())
            };
            let push = (target - d) / 2.0;

            offsets[i].0 -= ux * push;
            offsets[i].1 -= uy * push;
            offsets[j].0 += ux * push;
            offsets[j].1 += uy * push;
        }
    }

    violated.then_some(offsets)
}

/// Displace points until every pair is at least `min_distance` apart.
///
/// Runs at most `max_iterations` rounds; the points are left at their last
/// positions either way.
pub fn disperse(
    points: &mut [GeneralizedPoint],
    min_distance: f64,
    max_iterations: usize,
    margin: f64,
) -> Result<DispersionOutcome> {
    ensure_positive("min_distance", min_distance)?;

    let bounds = match envelope(points, margin) {
        Some(rect) if points.len() > 1 => rect,
        _ => {
            return Ok(DispersionOutcome {
                iterations: 0,
                converged: true,
            })
        }
    };

    let mut iterations = 0;
    loop {
        let snapshot: Vec<Point<f64>> = points.iter().map(|p| p.location).collect();
        let offsets = match separation_offsets(&snapshot, min_distance) {
            None => {
                return Ok(DispersionOutcome {
                    iterations,
                    converged: true,
                })
            }
            Some(offsets) => offsets,
        };

        if iterations == max_iterations {
            return Ok(DispersionOutcome {
                iterations,
                converged: false,
            });
        }

        for (point, (dx, dy)) in points.iter_mut().zip(offsets) {
            point.location = clamp(
                Point::new(point.location.x() + dx, point.location.y() + dy),
                &bounds,
            );
        }
        iterations += 1;

        tracing::trace!(
            iteration = iterations,
            closest_pair = closest_pair_distance(&snapshot).unwrap_or(f64::INFINITY),
            "Dispersion round"
        );
    }
}

/// Deduplicate and disperse the resolver output.
///
/// On non-convergence the error carries the last best-effort set.
pub fn finalize(output: GeneralizedOutput, policy: &GeneralizationPolicyV1) -> Result<FinalSet> {
    let (mut points, duplicates_removed) = deduplicate(output.points);

    let outcome = disperse(
        &mut points,
        policy.min_distance,
        policy.max_dispersion_iterations,
        policy.effective_dispersion_margin(),
    )?;

    let final_set = FinalSet::new(points, duplicates_removed, outcome.iterations);

    if !outcome.converged {
        let closest_pair = final_set.closest_pair_distance().unwrap_or(0.0);
        tracing::error!(
            iterations = outcome.iterations,
            min_distance = policy.min_distance,
            closest_pair,
            points = final_set.len(),
            "Dispersion did not converge"
        );
        return Err(GeneralizationError::DispersionNonConvergence {
            iterations: outcome.iterations,
            min_distance: policy.min_distance,
            closest_pair,
            best_effort: Box::new(final_set),
        });
    }

    tracing::info!(
        points = final_set.len(),
        duplicates_removed,
        dispersion_iterations = outcome.iterations,
        max_offset = final_set
            .points
            .iter()
            .map(GeneralizedPoint::offset)
            .fold(0.0_f64, f64::max),
        fingerprint = %final_set.fingerprint,
        "Finalize complete"
    );

    Ok(final_set)
}
