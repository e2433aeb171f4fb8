pub mod analysis;
pub mod error;
pub mod geometry;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod render;
pub mod simplify;
pub mod smoothing;
pub mod stats;

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;

pub use crate::analysis::{analyze, analyze_str};
pub use crate::error::{AnalysisError, ParseError};
pub use crate::gpx_types::{GpxStats, SimplifiedTrack, TrackAnalysis, TrackPoint};
pub use crate::options::AnalysisOptions;

/// Analyze a GPX file (Uint8Array or string), returned as a JS object
/// `{ name, trackType, stats, track }`.
#[wasm_bindgen(js_name = analyzeGpx)]
pub fn analyze_gpx(input: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let analysis = analyze(&input_bytes(&input), &opts)?;
    serde_wasm_bindgen::to_value(&analysis).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Analyze a GPX string, returned as a JSON string.
#[wasm_bindgen(js_name = analyzeGpxString)]
pub fn analyze_gpx_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let analysis = analyze_str(gpx_string, &opts)?;
    serde_json::to_string(&analysis).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Analyze a GPX file and render the simplified track as GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = analyzeGpxToGeoJson)]
pub fn analyze_gpx_to_geojson(input: JsValue, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let analysis = analyze(&input_bytes(&input), &opts)?;
    let fc = render::to_feature_collection(&analysis);
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Strings are taken as UTF-8 text; anything else is read as a byte array.
fn input_bytes(input: &JsValue) -> Vec<u8> {
    match input.as_string() {
        Some(s) => s.into_bytes(),
        None => Uint8Array::new(input).to_vec(),
    }
}

fn parse_options(options: JsValue) -> Result<AnalysisOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(AnalysisOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
