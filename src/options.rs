use serde::Deserialize;

/// Smallest accepted simplification cap: first, last, min- and max-elevation points.
pub const MIN_MAX_POINTS: usize = 4;

/// Options for a track analysis run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Upper bound on the simplified track length (default: 500, minimum: 4)
    #[serde(default = "default_max_points")]
    pub max_points: usize,

    /// Moving-average window in samples; 0 or 1 disables smoothing (default: 5)
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,

    /// Hysteresis band for gain/loss: elevation must move strictly more than this
    /// from the last counted level before it is counted, in meters (default: 1.0)
    #[serde(default = "default_min_elevation_delta")]
    pub min_elevation_delta: f64,

    /// Segments this short or shorter are ignored for grade extremes, in meters (default: 1.0)
    #[serde(default = "default_min_grade_distance")]
    pub min_grade_distance: f64,

    /// Starting perpendicular tolerance of the simplifier, in meters (default: 1.0)
    #[serde(default = "default_simplify_tolerance")]
    pub simplify_tolerance: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_points: default_max_points(),
            smoothing_window: default_smoothing_window(),
            min_elevation_delta: default_min_elevation_delta(),
            min_grade_distance: default_min_grade_distance(),
            simplify_tolerance: default_simplify_tolerance(),
        }
    }
}

impl AnalysisOptions {
    /// Simplification cap with the floor applied.
    pub fn effective_max_points(&self) -> usize {
        self.max_points.max(MIN_MAX_POINTS)
    }

    /// Half-width of the centered smoothing window. Even windows widen to the next odd size.
    pub fn smoothing_half_window(&self) -> usize {
        self.smoothing_window / 2
    }

    pub fn elevation_threshold(&self) -> f64 {
        non_negative(self.min_elevation_delta)
    }

    pub fn grade_distance_threshold(&self) -> f64 {
        non_negative(self.min_grade_distance)
    }

    pub fn initial_tolerance(&self) -> f64 {
        if self.simplify_tolerance.is_finite() && self.simplify_tolerance > 0.0 {
            self.simplify_tolerance
        } else {
            default_simplify_tolerance()
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

fn default_max_points() -> usize {
    500
}

fn default_smoothing_window() -> usize {
    5
}

fn default_min_elevation_delta() -> f64 {
    1.0
}

fn default_min_grade_distance() -> f64 {
    1.0
}

fn default_simplify_tolerance() -> f64 {
    1.0
}
