use chrono::{DateTime, Utc};

use crate::error::AnalysisError;
use crate::geometry;
use crate::gpx_types::*;
use crate::options::AnalysisOptions;

/// Aggregate a parsed track and its smoothed elevations into summary statistics.
///
/// `smoothed` must be `None` when the track carries no elevation at all, and
/// otherwise have exactly one entry per point. A single-point track yields a
/// degenerate record: zero distance, no grade, no duration.
pub fn compute_stats(
    track: &RawTrack,
    smoothed: Option<&[f64]>,
    opts: &AnalysisOptions,
) -> Result<GpxStats, AnalysisError> {
    let points = &track.points;
    let bounds = BoundingBox::from_points(points).ok_or(AnalysisError::EmptyTrack { found: 0 })?;
    let smoothed = smoothed.filter(|s| s.len() == points.len());

    // Segment boundaries are not special: a file is treated as one continuous route.
    let seg_distances: Vec<f64> = points
        .windows(2)
        .map(|w| geometry::distance(&w[0], &w[1]))
        .collect();
    let total_distance_m: f64 = seg_distances.iter().sum();

    let (elevation_gain_m, elevation_loss_m) = match smoothed {
        Some(s) => gain_loss(s, opts.elevation_threshold()),
        None => (0.0, 0.0),
    };
    let (min_elevation_m, max_elevation_m) = match smoothed {
        Some(s) => elevation_range(s),
        None => (None, None),
    };

    let (steepest_climb, steepest_descent) = match smoothed {
        Some(s) => grade_extremes(s, &seg_distances, opts.grade_distance_threshold()),
        None => (None, None),
    };

    let average_grade = match (smoothed, total_distance_m > opts.grade_distance_threshold()) {
        (Some(s), true) => Some((s[s.len() - 1] - s[0]) / total_distance_m),
        _ => None,
    };

    let (start_time, end_time, duration_s) = match timestamps(points) {
        Some((start, end)) => {
            let secs = (end - start).num_milliseconds() as f64 / 1000.0;
            (Some(start), Some(end), Some(secs.max(0.0)))
        }
        None => (None, None, None),
    };
    let average_speed_mps = duration_s
        .filter(|d| *d > 0.0)
        .map(|d| total_distance_m / d);

    Ok(GpxStats {
        point_count: points.len(),
        segment_count: track.segment_count(),
        total_distance_m,
        elevation_gain_m,
        elevation_loss_m,
        min_elevation_m,
        max_elevation_m,
        bounds,
        start_time,
        end_time,
        duration_s,
        average_speed_mps,
        average_grade,
        steepest_climb,
        steepest_descent,
    })
}

/// Total climb and descent with hysteresis.
///
/// Elevation is measured against a reference that only moves once the
/// difference strictly exceeds `threshold`, so slow climbs made of many small
/// steps still add up while jitter inside the band is ignored. A trailing
/// remainder that continues the last counted direction is added at the end.
pub fn gain_loss(elevations: &[f64], threshold: f64) -> (f64, f64) {
    let (Some(&first), Some(&last)) = (elevations.first(), elevations.last()) else {
        return (0.0, 0.0);
    };

    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut reference = first;
    let mut rising: Option<bool> = None;

    for &ele in &elevations[1..] {
        let delta = ele - reference;
        if delta > threshold {
            gain += delta;
            reference = ele;
            rising = Some(true);
        } else if -delta > threshold {
            loss += -delta;
            reference = ele;
            rising = Some(false);
        }
    }

    let rest = last - reference;
    match rising {
        Some(true) if rest > 0.0 => gain += rest,
        Some(false) if rest < 0.0 => loss += -rest,
        _ => {}
    }

    (gain, loss)
}

fn elevation_range(elevations: &[f64]) -> (Option<f64>, Option<f64>) {
    let min = elevations.iter().copied().reduce(f64::min);
    let max = elevations.iter().copied().reduce(f64::max);
    (min, max)
}

/// Steepest rising and steepest falling segment, skipping segments whose
/// horizontal length is at or below `min_distance`. Ties keep the earliest.
fn grade_extremes(
    elevations: &[f64],
    seg_distances: &[f64],
    min_distance: f64,
) -> (Option<GradeExtreme>, Option<GradeExtreme>) {
    let mut climb: Option<GradeExtreme> = None;
    let mut descent: Option<GradeExtreme> = None;

    for (index, dist) in seg_distances.iter().enumerate() {
        if *dist <= min_distance {
            continue;
        }
        let grade = (elevations[index + 1] - elevations[index]) / dist;
        if grade > 0.0 && climb.is_none_or(|c| grade > c.grade) {
            climb = Some(GradeExtreme { grade, index });
        }
        if grade < 0.0 && descent.is_none_or(|d| grade < d.grade) {
            descent = Some(GradeExtreme { grade, index });
        }
    }

    (climb, descent)
}

/// First and last timestamp, only when there are at least two points and
/// every point carries one.
fn timestamps(points: &[TrackPoint]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if points.len() < 2 || points.iter().any(|p| p.time.is_none()) {
        return None;
    }
    Some((points.first()?.time?, points.last()?.time?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::smooth_elevations;
    use chrono::TimeZone;

    fn track_of(points: Vec<TrackPoint>) -> RawTrack {
        let mut track = RawTrack::default();
        track.push_segment(points);
        track
    }

    fn stats_with_window(track: &RawTrack, window: usize) -> GpxStats {
        let opts = AnalysisOptions {
            smoothing_window: window,
            ..Default::default()
        };
        let smoothed = smooth_elevations(&track.elevations(), opts.smoothing_half_window());
        compute_stats(track, smoothed.as_deref(), &opts).unwrap()
    }

    #[test]
    fn test_square_track_flat() {
        let track = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_ele(100.0),
            TrackPoint::new(0.0, 0.001).with_ele(100.0),
            TrackPoint::new(0.001, 0.001).with_ele(100.0),
            TrackPoint::new(0.001, 0.0).with_ele(100.0),
        ]);
        let stats = stats_with_window(&track, 5);
        assert_eq!(stats.elevation_gain_m, 0.0);
        assert_eq!(stats.elevation_loss_m, 0.0);
        // Three legs of ~111.2 m each
        assert!((stats.total_distance_m - 333.6).abs() < 1.0, "{}", stats.total_distance_m);
        assert!(stats.steepest_climb.is_none());
        assert!(stats.steepest_descent.is_none());
        assert_eq!(stats.average_grade, Some(0.0));
    }

    #[test]
    fn test_raw_vs_smoothed_gain() {
        let track = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_ele(100.0),
            TrackPoint::new(0.0, 0.001).with_ele(105.0),
            TrackPoint::new(0.0, 0.002).with_ele(95.0),
            TrackPoint::new(0.0, 0.003).with_ele(110.0),
        ]);
        let raw = stats_with_window(&track, 1);
        assert!((raw.elevation_gain_m - 20.0).abs() < 1e-9);
        assert!((raw.elevation_loss_m - 10.0).abs() < 1e-9);

        let smoothed = stats_with_window(&track, 5);
        assert!(smoothed.elevation_gain_m < raw.elevation_gain_m);
        assert!(smoothed.elevation_loss_m < raw.elevation_loss_m);
    }

    #[test]
    fn test_monotone_gain_equals_net_rise() {
        let points: Vec<TrackPoint> = (0..30)
            .map(|i| TrackPoint::new(0.0, i as f64 * 0.001).with_ele(200.0 + 3.0 * i as f64))
            .collect();
        let track = track_of(points);
        for window in [1, 3, 5, 11] {
            let stats = stats_with_window(&track, window);
            assert!((stats.elevation_gain_m - 87.0).abs() < 1e-6, "window {window}");
            assert_eq!(stats.elevation_loss_m, 0.0);
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(gain_loss(&[10.0, 11.0, 10.0, 11.0], 1.0), (0.0, 0.0));
        assert_eq!(gain_loss(&[10.0, 11.0, 12.0, 11.0], 1.0), (2.0, 0.0));
        assert_eq!(gain_loss(&[10.0, 11.5, 10.0], 1.0), (1.5, 1.5));
        assert_eq!(gain_loss(&[10.0, 10.5, 11.0], 0.0), (1.0, 0.0));
        assert_eq!(gain_loss(&[], 1.0), (0.0, 0.0));
    }

    #[test]
    fn test_small_steps_accumulate() {
        let climb: Vec<f64> = (0..=200).map(|i| 300.0 + 0.5 * i as f64).collect();
        let (gain, loss) = gain_loss(&climb, 1.0);
        assert!((gain - 100.0).abs() < 1e-9, "gain {gain}");
        assert_eq!(loss, 0.0);

        let descent: Vec<f64> = climb.iter().rev().copied().collect();
        let (gain, loss) = gain_loss(&descent, 1.0);
        assert_eq!(gain, 0.0);
        assert!((loss - 100.0).abs() < 1e-9, "loss {loss}");
    }

    #[test]
    fn test_dense_monotone_track_gain_equals_net_rise() {
        let points: Vec<TrackPoint> = (0..=200)
            .map(|i| TrackPoint::new(0.0, i as f64 * 0.0001).with_ele(50.0 + 0.5 * i as f64))
            .collect();
        let track = track_of(points);
        for window in [1, 5, 11] {
            let stats = stats_with_window(&track, window);
            assert!((stats.elevation_gain_m - 100.0).abs() < 1e-6, "window {window}");
            assert_eq!(stats.elevation_loss_m, 0.0);
        }
    }

    #[test]
    fn test_slow_sine_profile() {
        // One full cycle, 20 m amplitude, at most ~0.2 m per sample.
        let profile: Vec<f64> = (0..=628)
            .map(|i| 100.0 + 20.0 * (std::f64::consts::TAU * i as f64 / 628.0).sin())
            .collect();
        let (gain, loss) = gain_loss(&profile, 1.0);
        assert!((gain - 40.0).abs() < 2.0, "gain {gain}");
        assert!((loss - 40.0).abs() < 2.0, "loss {loss}");
    }

    #[test]
    fn test_single_point_degenerate() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let track = track_of(vec![TrackPoint::new(45.0, 7.0).with_ele(500.0).with_time(t0)]);
        let stats = stats_with_window(&track, 5);
        assert_eq!(stats.point_count, 1);
        assert_eq!(stats.total_distance_m, 0.0);
        assert_eq!(stats.elevation_gain_m, 0.0);
        assert!(stats.average_grade.is_none());
        assert!(stats.steepest_climb.is_none());
        assert!(stats.duration_s.is_none());
        assert_eq!(stats.min_elevation_m, Some(500.0));
        assert_eq!(stats.bounds.min_lat, 45.0);
    }

    #[test]
    fn test_empty_track_errors() {
        let err = compute_stats(&RawTrack::default(), None, &AnalysisOptions::default());
        assert!(matches!(err, Err(AnalysisError::EmptyTrack { .. })));
    }

    #[test]
    fn test_no_elevation() {
        let track = track_of(vec![TrackPoint::new(0.0, 0.0), TrackPoint::new(0.0, 0.01)]);
        let stats = stats_with_window(&track, 5);
        assert!(stats.min_elevation_m.is_none());
        assert!(stats.max_elevation_m.is_none());
        assert!(stats.average_grade.is_none());
        assert_eq!(stats.elevation_gain_m, 0.0);
        assert!(stats.total_distance_m > 1000.0);
    }

    #[test]
    fn test_duration_requires_every_timestamp() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 10, 0).unwrap();
        let full = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_time(t0),
            TrackPoint::new(0.0, 0.01).with_time(t1),
        ]);
        let stats = stats_with_window(&full, 1);
        assert_eq!(stats.duration_s, Some(600.0));
        assert_eq!(stats.start_time, Some(t0));
        assert_eq!(stats.end_time, Some(t1));
        let speed = stats.average_speed_mps.unwrap();
        assert!((speed - stats.total_distance_m / 600.0).abs() < 1e-9);

        let partial = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_time(t0),
            TrackPoint::new(0.0, 0.005),
            TrackPoint::new(0.0, 0.01).with_time(t1),
        ]);
        let stats = stats_with_window(&partial, 1);
        assert!(stats.duration_s.is_none());
        assert!(stats.average_speed_mps.is_none());
    }

    #[test]
    fn test_backwards_timestamps_clamp_to_zero() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 5, 0, 0).unwrap();
        let track = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_time(t0),
            TrackPoint::new(0.0, 0.01).with_time(t1),
        ]);
        let stats = stats_with_window(&track, 1);
        assert_eq!(stats.duration_s, Some(0.0));
        assert!(stats.average_speed_mps.is_none());
    }

    #[test]
    fn test_grade_extremes_skip_stationary_segments() {
        let track = track_of(vec![
            TrackPoint::new(0.0, 0.0).with_ele(100.0),
            TrackPoint::new(0.0, 0.001).with_ele(110.0),
            // Same position, big jump: would blow up the grade
            TrackPoint::new(0.0, 0.001).with_ele(150.0),
            TrackPoint::new(0.0, 0.002).with_ele(140.0),
        ]);
        let stats = stats_with_window(&track, 1);
        let climb = stats.steepest_climb.unwrap();
        assert_eq!(climb.index, 0);
        assert!((climb.grade - 10.0 / 111.19).abs() < 1e-3);
        let descent = stats.steepest_descent.unwrap();
        assert_eq!(descent.index, 2);
        assert!(descent.grade < 0.0);
    }

    #[test]
    fn test_inter_segment_distance_counted() {
        let mut track = RawTrack::default();
        track.push_segment(vec![TrackPoint::new(0.0, 0.0), TrackPoint::new(0.0, 0.001)]);
        track.push_segment(vec![TrackPoint::new(0.0, 0.002), TrackPoint::new(0.0, 0.003)]);
        let stats = stats_with_window(&track, 1);
        assert_eq!(stats.segment_count, 2);
        assert!((stats.total_distance_m - 3.0 * 111.195).abs() < 0.1);
    }

    #[test]
    fn test_bounds_contain_every_point() {
        let points = vec![
            TrackPoint::new(46.5, 8.1),
            TrackPoint::new(46.7, 7.9),
            TrackPoint::new(46.4, 8.3),
        ];
        let track = track_of(points.clone());
        let stats = stats_with_window(&track, 5);
        assert!(points.iter().all(|p| stats.bounds.contains(p)));
        assert!(stats.total_distance_m >= 0.0);
    }
}
