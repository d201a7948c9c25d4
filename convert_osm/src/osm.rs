//! Interpreting individual tag values

use abstutil::Tags;
use geom::Speed;
use raw_map::{osm, RawWay};

/// Which way traffic may flow along a way, relative to its node order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Oneway {
    Forward,
    Backward,
    Both,
}

impl Oneway {
    pub fn forwards(self) -> bool {
        self != Oneway::Backward
    }

    pub fn backwards(self) -> bool {
        self != Oneway::Forward
    }
}

/// `Err` holds an unrecognized value.
pub fn parse_oneway(value: &str) -> Result<Oneway, String> {
    match value {
        "yes" | "true" | "1" => Ok(Oneway::Forward),
        "-1" => Ok(Oneway::Backward),
        "no" | "false" | "0" => Ok(Oneway::Both),
        _ => Err(value.to_string()),
    }
}

/// Only what the tags say directly: an explicit `oneway`, or a roundabout. Class defaults aren't
/// considered.
pub fn tagged_oneway(way: &RawWay) -> Option<Oneway> {
    match way.tags.get(osm::ONEWAY).map(|v| parse_oneway(v)) {
        Some(Ok(Oneway::Both)) => None,
        Some(Ok(dir)) => Some(dir),
        _ => {
            if way.is_roundabout() {
                Some(Oneway::Forward)
            } else {
                None
            }
        }
    }
}

/// Plain numbers are km/h. Also understands "30 mph".
pub fn parse_maxspeed(value: &str) -> Option<Speed> {
    let value = value.trim();
    if let Some(mph) = value.strip_suffix("mph") {
        return mph
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| *x > 0.0)
            .map(Speed::miles_per_hour);
    }
    value
        .strip_suffix("km/h")
        .unwrap_or(value)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|x| *x > 0.0)
        .map(Speed::km_per_hour)
}

/// Returns `Err` with the raw value if it's present but not a positive number.
pub fn parse_lanes(tags: &Tags, key: &str) -> Result<Option<usize>, String> {
    match tags.get(key) {
        None => Ok(None),
        Some(value) => match value.trim().parse::<f64>() {
            // Some mappers write "2.0"
            Ok(x) if x >= 1.0 && x.fract() == 0.0 => Ok(Some(x as usize)),
            _ => Err(value.to_string()),
        },
    }
}
