use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::geometry;
use crate::gpx_types::*;

/// Render an analysis as a GeoJSON FeatureCollection for map renderers.
///
/// The simplified track becomes one LineString Feature (a Point Feature for
/// single-point tracks) with `[lon, lat, ele]` coordinates, the summary in
/// `properties.stats`, and per-coordinate `times`, `distances` and `bearings`
/// under `coordinateProperties`.
pub fn to_feature_collection(analysis: &TrackAnalysis) -> FeatureCollection {
    let track = &analysis.track;
    if track.is_empty() {
        return FeatureCollection {
            bbox: None,
            features: Vec::new(),
            foreign_members: None,
        };
    }

    let geometry = if track.len() == 1 {
        Geometry::new(Value::Point(point_coords(&track.points[0])))
    } else {
        Geometry::new(Value::LineString(
            track.points.iter().map(point_coords).collect(),
        ))
    };

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );
    insert_optional(&mut props, "name", &analysis.name);
    insert_optional(&mut props, "type", &analysis.track_type);
    if let Ok(stats) = serde_json::to_value(&analysis.stats) {
        props.insert("stats".to_string(), stats);
    }
    if track.len() > 1 {
        insert_coordinate_properties(&mut props, track);
    }

    let b = analysis.stats.bounds;
    let bbox = vec![b.min_lon, b.min_lat, b.max_lon, b.max_lat];

    FeatureCollection {
        bbox: Some(bbox.clone()),
        features: vec![Feature {
            bbox: Some(bbox),
            geometry: Some(geometry),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

/// Build [lon, lat] or [lon, lat, ele] coordinate array.
fn point_coords(pt: &TrackPoint) -> Vec<f64> {
    match pt.ele {
        Some(ele) => vec![pt.lon, pt.lat, ele],
        None => vec![pt.lon, pt.lat],
    }
}

fn insert_optional(props: &mut Map<String, JsonValue>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn number(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn insert_coordinate_properties(props: &mut Map<String, JsonValue>, track: &SimplifiedTrack) {
    let mut coord_props = Map::new();

    let times: Vec<JsonValue> = track
        .points
        .iter()
        .map(|pt| match &pt.time {
            Some(t) => JsonValue::String(t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
            None => JsonValue::Null,
        })
        .collect();
    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        coord_props.insert("times".to_string(), JsonValue::Array(times));
    }

    coord_props.insert(
        "distances".to_string(),
        JsonValue::Array(track.distances_m.iter().copied().map(number).collect()),
    );

    // Heading towards the next point; the final point keeps the last heading.
    let mut bearings: Vec<JsonValue> = track
        .points
        .windows(2)
        .map(|w| number(geometry::bearing(&w[0], &w[1])))
        .collect();
    if let Some(last) = bearings.last().cloned() {
        bearings.push(last);
    }
    coord_props.insert("bearings".to_string(), JsonValue::Array(bearings));

    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}
