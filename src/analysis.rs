use crate::error::AnalysisError;
use crate::geometry;
use crate::gpx_types::*;
use crate::options::AnalysisOptions;
use crate::parser;
use crate::simplify;
use crate::smoothing;
use crate::stats;

/// Analyze raw GPX bytes: parse, smooth, aggregate and simplify.
///
/// Pure: no I/O, no shared state, identical input gives identical output.
/// Any parse or aggregation failure is returned as-is; there is never a
/// partial result.
pub fn analyze(bytes: &[u8], opts: &AnalysisOptions) -> Result<TrackAnalysis, AnalysisError> {
    let track = parser::parse_track(bytes)?;
    analyze_track(track, opts)
}

/// Same as [`analyze`] for input that is already a string.
pub fn analyze_str(xml: &str, opts: &AnalysisOptions) -> Result<TrackAnalysis, AnalysisError> {
    let track = parser::parse_track_str(xml)?;
    analyze_track(track, opts)
}

/// Run the post-parse stages over an already parsed track.
pub fn analyze_track(track: RawTrack, opts: &AnalysisOptions) -> Result<TrackAnalysis, AnalysisError> {
    let smoothed = smoothing::smooth_elevations(&track.elevations(), opts.smoothing_half_window());
    let stats = stats::compute_stats(&track, smoothed.as_deref(), opts)?;

    let smoothed_points = with_elevations(&track.points, smoothed.as_deref());
    let distances = geometry::cumulative_distances(&smoothed_points);
    let simplified = simplify::simplify(
        &smoothed_points,
        &distances,
        opts.effective_max_points(),
        opts.initial_tolerance(),
    );

    log::debug!(
        "analyzed {} points ({} segments): {:.1} m, +{:.1}/-{:.1} m, {} render points",
        stats.point_count,
        stats.segment_count,
        stats.total_distance_m,
        stats.elevation_gain_m,
        stats.elevation_loss_m,
        simplified.len()
    );

    Ok(TrackAnalysis {
        name: track.name,
        track_type: track.track_type,
        stats,
        track: simplified,
    })
}

/// New point sequence carrying the smoothed elevations.
fn with_elevations(points: &[TrackPoint], smoothed: Option<&[f64]>) -> Vec<TrackPoint> {
    match smoothed {
        Some(s) => points
            .iter()
            .zip(s)
            .map(|(p, ele)| TrackPoint {
                ele: Some(*ele),
                ..p.clone()
            })
            .collect(),
        None => points.to_vec(),
    }
}
