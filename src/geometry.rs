//! Great-circle distance and bearing on a spherical Earth.

use crate::gpx_types::TrackPoint;

/// Mean Earth radius (IUGG), in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two points, in meters.
pub fn distance(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h marginally past 1 for antipodal points.
    let c = 2.0 * h.min(1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` towards `b`, in degrees clockwise from north, in [0, 360).
pub fn bearing(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Running distance from the first point, one entry per point.
pub fn cumulative_distances(points: &[TrackPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += distance(&points[i - 1], p);
        }
        out.push(total);
    }
    out
}

/// Equirectangular projection around a reference latitude, in meters.
///
/// Accurate enough for perpendicular-offset comparisons over the span of a
/// single activity; not a substitute for `distance`.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin_lat: f64,
    origin_lon: f64,
    lon_scale: f64,
}

impl LocalProjection {
    /// Origin at the mean latitude and longitude of `points`.
    pub fn centered_on(points: &[TrackPoint]) -> Self {
        let (origin_lat, origin_lon) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            let n = points.len() as f64;
            (
                points.iter().map(|p| p.lat).sum::<f64>() / n,
                points.iter().map(|p| p.lon).sum::<f64>() / n,
            )
        };
        Self {
            origin_lat,
            origin_lon,
            lon_scale: origin_lat.to_radians().cos(),
        }
    }

    pub fn project(&self, p: &TrackPoint) -> (f64, f64) {
        let x = (p.lon - self.origin_lon).to_radians() * self.lon_scale * EARTH_RADIUS_M;
        let y = (p.lat - self.origin_lat).to_radians() * EARTH_RADIUS_M;
        (x, y)
    }
}
