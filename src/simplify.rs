//! Length-capped line simplification for map and profile rendering.
//!
//! Douglas–Peucker over a local planar projection, driven by an explicit work
//! stack so that tracks with tens of thousands of points cannot exhaust the
//! call stack. The first, last, highest and lowest points are always kept.

use crate::geometry::LocalProjection;
use crate::gpx_types::{SimplifiedTrack, TrackPoint};
use crate::options::MIN_MAX_POINTS;

/// Tolerance doublings tried before falling back to stride decimation.
const MAX_TOLERANCE_PASSES: usize = 32;

/// Simplify `points` to at most `max_points` entries.
///
/// `distances` holds the cumulative distance of every input point and is
/// sampled into the result. Starting at `initial_tolerance` meters, the
/// tolerance doubles until the cap is met; if it never is, the surviving
/// points are thinned by a fixed stride.
pub fn simplify(
    points: &[TrackPoint],
    distances: &[f64],
    max_points: usize,
    initial_tolerance: f64,
) -> SimplifiedTrack {
    let max_points = max_points.max(MIN_MAX_POINTS);

    if points.len() <= max_points {
        let indices: Vec<usize> = (0..points.len()).collect();
        return build(points, distances, indices, 0.0);
    }

    let anchors = forced_indices(points);
    let projection = LocalProjection::centered_on(points);
    let xy: Vec<(f64, f64)> = points.iter().map(|p| projection.project(p)).collect();

    let mut tolerance = initial_tolerance;
    let mut kept = douglas_peucker(&xy, &anchors, tolerance);
    let mut passes = 1;
    while kept.len() > max_points && passes < MAX_TOLERANCE_PASSES {
        tolerance *= 2.0;
        kept = douglas_peucker(&xy, &anchors, tolerance);
        passes += 1;
    }

    if kept.len() > max_points {
        log::debug!(
            "simplify: {} points still over cap {} at tolerance {tolerance}m, decimating",
            kept.len(),
            max_points
        );
        kept = stride_decimate(&kept, &anchors, max_points);
    } else {
        log::trace!(
            "simplify: {} -> {} points after {passes} pass(es), tolerance {tolerance}m",
            points.len(),
            kept.len()
        );
    }

    build(points, distances, kept, tolerance)
}

/// First, last, highest and lowest point indices, sorted and deduplicated.
/// Elevation ties resolve to the earliest point.
pub fn forced_indices(points: &[TrackPoint]) -> Vec<usize> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut forced = vec![0, points.len() - 1];
    let mut highest: Option<(usize, f64)> = None;
    let mut lowest: Option<(usize, f64)> = None;
    for (i, ele) in points.iter().enumerate().filter_map(|(i, p)| p.ele.map(|e| (i, e))) {
        if highest.is_none_or(|(_, h)| ele > h) {
            highest = Some((i, ele));
        }
        if lowest.is_none_or(|(_, l)| ele < l) {
            lowest = Some((i, ele));
        }
    }
    forced.extend(highest.map(|(i, _)| i));
    forced.extend(lowest.map(|(i, _)| i));

    forced.sort_unstable();
    forced.dedup();
    forced
}

/// Douglas–Peucker between consecutive anchors. Returns kept indices in order.
fn douglas_peucker(xy: &[(f64, f64)], anchors: &[usize], tolerance: f64) -> Vec<usize> {
    let mut keep = vec![false; xy.len()];
    for &a in anchors {
        keep[a] = true;
    }

    let mut stack: Vec<(usize, usize)> = anchors.windows(2).map(|w| (w[0], w[1])).collect();
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;
        for i in start + 1..end {
            let d = segment_distance(xy[i], xy[start], xy[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(i, k)| k.then_some(i))
        .collect()
}

/// Distance from `p` to the segment `a`-`b`; collapses to point distance when `a == b`.
fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

/// Keep every anchor plus an evenly strided subset of the other `kept` indices,
/// at most `max_points` in total. `anchors.len()` must not exceed `max_points`.
fn stride_decimate(kept: &[usize], anchors: &[usize], max_points: usize) -> Vec<usize> {
    let budget = max_points.saturating_sub(anchors.len());
    let candidates: Vec<usize> = kept
        .iter()
        .copied()
        .filter(|i| anchors.binary_search(i).is_err())
        .collect();

    let mut out: Vec<usize> = anchors.to_vec();
    if budget > 0 && !candidates.is_empty() {
        let stride = candidates.len().div_ceil(budget);
        out.extend(candidates.iter().copied().step_by(stride));
    }
    out.sort_unstable();
    out
}

fn build(
    points: &[TrackPoint],
    distances: &[f64],
    indices: Vec<usize>,
    tolerance_m: f64,
) -> SimplifiedTrack {
    SimplifiedTrack {
        points: indices.iter().map(|&i| points[i].clone()).collect(),
        distances_m: indices
            .iter()
            .map(|&i| distances.get(i).copied().unwrap_or(0.0))
            .collect(),
        source_indices: indices,
        tolerance_m,
    }
}
