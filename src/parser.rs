use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{AnalysisError, ParseError};
use crate::gpx_types::*;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse raw GPX bytes into a single logical track.
pub fn parse_track(bytes: &[u8]) -> std::result::Result<RawTrack, AnalysisError> {
    let xml = std::str::from_utf8(bytes).map_err(ParseError::from)?;
    parse_track_str(xml)
}

/// Parse a GPX XML string into a single logical track.
///
/// All `<trkseg>` of all `<trk>` are concatenated in file order. Files without
/// any track point fall back to their `<rte>` points. Waypoints never count.
pub fn parse_track_str(xml: &str) -> std::result::Result<RawTrack, AnalysisError> {
    let mut reader = Reader::from_str(xml);
    let mut track = RawTrack::default();
    let mut routes: Vec<RouteData> = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut seen_trk = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trk" => {
                    let (name, track_type) = parse_trk(&mut reader, &mut track)?;
                    // Metadata always comes from the first <trk>, even when it has none.
                    if !seen_trk {
                        track.name = name;
                        track.track_type = track_type;
                        seen_trk = true;
                    }
                }
                b"rte" => routes.push(parse_route(&mut reader)?),
                b"wpt" => {
                    reader.read_to_end(e.name())?;
                }
                other => open.push(String::from_utf8_lossy(other).into_owned()),
            },
            Ok(Event::End(_)) => {
                open.pop();
            }
            Ok(Event::Eof) => {
                if let Some(element) = open.pop() {
                    return Err(ParseError::UnclosedElement { element }.into());
                }
                break;
            }
            Err(e) => return Err(ParseError::Xml(e).into()),
            _ => {}
        }
    }

    if track.is_empty() {
        for route in routes {
            if track.name.is_none() {
                track.name = route.name;
                track.track_type = route.route_type;
            }
            track.push_segment(route.points);
        }
    }

    if track.is_empty() {
        return Err(AnalysisError::EmptyTrack { found: 0 });
    }

    log::trace!(
        "parsed {} points in {} segments",
        track.len(),
        track.segment_count()
    );
    Ok(track)
}

#[derive(Debug, Default)]
struct RouteData {
    name: Option<String>,
    route_type: Option<String>,
    points: Vec<TrackPoint>,
}

/// Parse lat/lon attributes from a point element's start tag.
fn parse_lat_lon(e: &BytesStart<'_>, element: &'static str) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ParseError::Xml(e.into()))?;
        let val = std::str::from_utf8(&attr.value)?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate(val, element, "lat", 90.0)?),
            b"lon" => lon = Some(parse_coordinate(val, element, "lon", 180.0)?),
            _ => {}
        }
    }

    let lat = lat.ok_or(ParseError::MissingAttribute {
        element,
        attribute: "lat",
    })?;
    let lon = lon.ok_or(ParseError::MissingAttribute {
        element,
        attribute: "lon",
    })?;

    Ok((lat, lon))
}

/// `str::parse::<f64>` always uses '.' as radix point, whatever the host locale.
fn parse_coordinate(
    val: &str,
    element: &'static str,
    attribute: &'static str,
    limit: f64,
) -> Result<f64> {
    match val.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= limit => Ok(v),
        _ => Err(ParseError::InvalidAttribute {
            element,
            attribute,
            value: val.to_string(),
        }),
    }
}

/// Parse a point element (trkpt, rtept) and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point<'a>(
    start: &BytesStart<'a>,
    reader: &mut Reader<&'a [u8]>,
    element: &'static str,
) -> Result<TrackPoint> {
    let (lat, lon) = parse_lat_lon(start, element)?;
    let mut point = TrackPoint::new(lat, lon);
    let end_name = start.name().0.to_vec();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"ele" => {
                    let text = read_text_owned(reader, &e)?;
                    point.ele = parse_elevation(text.trim())?;
                }
                b"time" => {
                    let text = read_text_owned(reader, &e)?;
                    point.time = parse_time(text.trim())?;
                }
                _ => {
                    // name, desc, extensions, speed, ...
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => return Err(unclosed(element)),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(point)
}

fn parse_elevation(text: &str) -> Result<Option<f64>> {
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseError::InvalidValue {
            element: "ele",
            value: text.to_string(),
        }),
    }
}

fn parse_time(text: &str) -> Result<Option<DateTime<Utc>>> {
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    // xsd:dateTime makes the offset optional; such times are taken as UTC.
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| Some(dt.and_utc()))
        .map_err(|_| ParseError::InvalidValue {
            element: "time",
            value: text.to_string(),
        })
}

/// Parse a <trk> element, appending its segments to `track`.
/// Returns the element's own name and type.
fn parse_trk<'a>(
    reader: &mut Reader<&'a [u8]>,
    track: &mut RawTrack,
) -> Result<(Option<String>, Option<String>)> {
    let mut name: Option<String> = None;
    let mut track_type: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                b"type" => track_type = Some(read_text_owned(reader, &e)?),
                b"trkseg" => track.push_segment(parse_segment(reader)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            Ok(Event::Eof) => return Err(unclosed("trk")),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok((name, track_type))
}

/// Parse a <trkseg> element.
fn parse_segment<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Vec<TrackPoint>> {
    let mut points = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"trkpt" => points.push(parse_point(&e, reader, "trkpt")?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    let (lat, lon) = parse_lat_lon(&e, "trkpt")?;
                    points.push(TrackPoint::new(lat, lon));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            Ok(Event::Eof) => return Err(unclosed("trkseg")),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(points)
}

/// Parse a <rte> element.
fn parse_route<'a>(reader: &mut Reader<&'a [u8]>) -> Result<RouteData> {
    let mut route = RouteData::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => route.name = Some(read_text_owned(reader, &e)?),
                b"type" => route.route_type = Some(read_text_owned(reader, &e)?),
                b"rtept" => route.points.push(parse_point(&e, reader, "rtept")?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rtept" {
                    let (lat, lon) = parse_lat_lon(&e, "rtept")?;
                    route.points.push(TrackPoint::new(lat, lon));
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"rte" => break,
            Ok(Event::Eof) => return Err(unclosed("rte")),
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(route)
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned<'a>(reader: &mut Reader<&'a [u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().0.to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Ok(Event::CData(e)) => text.push_str(std::str::from_utf8(e.as_ref())?),
            Ok(Event::GeneralRef(e)) => {
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    // Predefined XML entities; anything else is dropped
                    match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) if e.name().0 == end_name.as_slice() => break,
            Ok(Event::Eof) => {
                return Err(ParseError::UnclosedElement {
                    element: String::from_utf8_lossy(&end_name).into_owned(),
                });
            }
            Err(e) => return Err(ParseError::Xml(e)),
            _ => {}
        }
    }

    Ok(text)
}

fn unclosed(element: &str) -> ParseError {
    ParseError::UnclosedElement {
        element: element.to_string(),
    }
}
