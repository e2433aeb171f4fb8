use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single recorded GPS sample (<trkpt>, or <rtept> for route-only files).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: Option<f64>,
    pub time: Option<DateTime<Utc>>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
        }
    }

    pub fn with_ele(mut self, ele: f64) -> Self {
        self.ele = Some(ele);
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// Every point of a track file in file order, with all segments concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrack {
    pub name: Option<String>,
    pub track_type: Option<String>,
    pub points: Vec<TrackPoint>,
    /// Index into `points` where each non-empty segment begins.
    pub segment_starts: Vec<usize>,
}

impl RawTrack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_starts.len()
    }

    /// Append a segment's points, recording its start. Empty segments leave no trace.
    pub fn push_segment(&mut self, points: Vec<TrackPoint>) {
        if points.is_empty() {
            return;
        }
        self.segment_starts.push(self.points.len());
        self.points.extend(points);
    }

    pub fn elevations(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.ele).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn from_points(points: &[TrackPoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        Some(points.iter().skip(1).fold(init, |b, p| Self {
            min_lat: b.min_lat.min(p.lat),
            max_lat: b.max_lat.max(p.lat),
            min_lon: b.min_lon.min(p.lon),
            max_lon: b.max_lon.max(p.lon),
        }))
    }

    pub fn contains(&self, point: &TrackPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

/// Grade of one segment and the index of the point that starts it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeExtreme {
    pub grade: f64,
    pub index: usize,
}

/// Summary statistics of a whole track.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxStats {
    pub point_count: usize,
    pub segment_count: usize,
    pub total_distance_m: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub min_elevation_m: Option<f64>,
    pub max_elevation_m: Option<f64>,
    pub bounds: BoundingBox,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_s: Option<f64>,
    pub average_speed_mps: Option<f64>,
    /// Net smoothed elevation change over total distance.
    pub average_grade: Option<f64>,
    pub steepest_climb: Option<GradeExtreme>,
    pub steepest_descent: Option<GradeExtreme>,
}

/// Render-ready subsequence of the smoothed track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedTrack {
    pub points: Vec<TrackPoint>,
    /// Position of each kept point in the full sequence.
    pub source_indices: Vec<usize>,
    /// Distance from the start along the full-resolution track, per kept point.
    pub distances_m: Vec<f64>,
    /// Tolerance the final simplification pass ran with; 0 when nothing was dropped.
    pub tolerance_m: f64,
}

impl SimplifiedTrack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Result of a full analysis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAnalysis {
    pub name: Option<String>,
    pub track_type: Option<String>,
    pub stats: GpxStats,
    pub track: SimplifiedTrack,
}
