//! Static reference data for the beaches the assistant has live data for.
//!
//! Station ids are NOAA CO-OPS tide prediction stations nearest each beach;
//! coordinates feed the National Weather Service point lookup.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeachInfo {
    pub name: &'static str,
    pub short_name: &'static str,
    pub state: &'static str,
    pub station_id: Option<&'static str>,
    pub coordinates: Option<Coordinates>,
}

const fn beach(
    name: &'static str,
    short_name: &'static str,
    state: &'static str,
    station_id: Option<&'static str>,
    coordinates: Option<(f64, f64)>,
) -> BeachInfo {
    BeachInfo {
        name,
        short_name,
        state,
        station_id,
        coordinates: match coordinates {
            Some((lat, lon)) => Some(Coordinates { lat, lon }),
            None => None,
        },
    }
}

pub static BEACHES: &[BeachInfo] = &[
    beach("Santa Monica Beach", "santa monica", "CA", Some("9410840"), Some((34.0095, -118.4973))),
    beach("Venice Beach", "venice", "CA", Some("9410840"), Some((33.9850, -118.4695))),
    beach("Huntington Beach", "huntington", "CA", Some("9410580"), Some((33.6595, -117.9988))),
    beach("La Jolla Beach", "la jolla", "CA", Some("9410230"), Some((32.8328, -117.2713))),
    beach("Clearwater Beach", "clearwater", "FL", Some("8726724"), Some((27.9777, -82.8271))),
    beach("Miami Beach", "miami", "FL", Some("8723214"), Some((25.7907, -80.1300))),
    beach("Pompano Beach", "pompano", "FL", Some("8722956"), Some((26.2379, -80.1248))),
    beach("Daytona Beach", "daytona", "FL", Some("8721604"), Some((29.2108, -81.0228))),
    beach("Pensacola Beach", "pensacola", "FL", Some("8729840"), Some((30.3335, -87.1420))),
    beach("Myrtle Beach", "myrtle", "SC", Some("8661070"), Some((33.6891, -78.8867))),
    beach("Virginia Beach", "virginia", "VA", Some("8638863"), Some((36.8529, -75.9780))),
    beach("Cape May Beach", "cape may", "NJ", Some("8536110"), Some((38.9351, -74.9060))),
    beach("Galveston Beach", "galveston", "TX", Some("8771450"), Some((29.2810, -94.8240))),
    beach("Waikiki Beach", "waikiki", "HI", Some("1612340"), Some((21.2793, -157.8292))),
    beach("Cannon Beach", "cannon", "OR", Some("9437540"), None),
];

/// Lowercase short name used as the lookup key: "Clearwater Beach" -> "clearwater".
pub fn short_name(beach_name: &str) -> String {
    let lowered = beach_name.trim().to_lowercase();
    match lowered.strip_suffix("beach") {
        Some(rest) if !rest.trim().is_empty() => rest.trim().to_string(),
        _ => lowered,
    }
}

/// Find a catalog entry by display name or short name, case-insensitively.
pub fn lookup(name: &str) -> Option<&'static BeachInfo> {
    let key = short_name(name);
    BEACHES.iter().find(|beach| beach.short_name == key)
}

pub fn station_for(beach_name: &str) -> Option<&'static str> {
    lookup(beach_name).and_then(|beach| beach.station_id)
}

pub fn coordinates_for(beach_name: &str) -> Option<Coordinates> {
    lookup(beach_name).and_then(|beach| beach.coordinates)
}
