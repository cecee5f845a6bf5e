//! Turns routing signals into a reply built from provider data, and tidies
//! every reply before it reaches the user.

use chrono::{Days, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::adapters::places::{LatLng, PlaceSearch};
use crate::adapters::tides::TideQuery;
use crate::adapters::{DataSources, PlacesSource, TideSource, WeatherSource};
use crate::catalog;
use crate::intent::IntentSignals;

pub const TIDE_HEADING: &str = "**Tide Information**";
pub const AMENITIES_HEADING: &str = "**Nearby Amenities**";
pub const MAX_AMENITIES: usize = 5;
const AMENITY_SEARCH_RADIUS_METRES: u32 = 5000;

lazy_static! {
    static ref TRANSCRIPT_MARKER: Regex =
        Regex::new(r"(?m)^[ \t]*(User|Human|Assistant|AI)[ \t]*:").unwrap();
}

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Weather,
    Sections,
    TideOnly,
    AmenitiesOnly,
    Language,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub route: Route,
    pub text: String,
}

/// Answers from the data providers when the signals call for it.
///
/// Provider failures never escape: each one becomes a sentence in the reply
/// so the remaining sections still reach the user.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    sources: DataSources,
}

impl Composer {
    pub fn new(sources: DataSources) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &DataSources {
        &self.sources
    }

    /// The first matching path, in priority order.
    ///
    /// Weather short-circuits only when the beach has coordinates or nothing
    /// else was asked; otherwise the other sections are answered and the
    /// missing coordinates are mentioned alongside them.
    pub fn route(&self, signals: &IntentSignals) -> Route {
        let has_beach = signals.beach.is_some();
        let wants_sections = signals.wants_tide || signals.wants_amenities;

        if self.weather_requested(signals) && (has_coordinates(signals) || !wants_sections) {
            Route::Weather
        } else if has_beach && wants_sections {
            Route::Sections
        } else if signals.wants_tide && self.sources.tides.is_some() {
            Route::TideOnly
        } else if signals.wants_amenities && self.sources.places.is_some() {
            Route::AmenitiesOnly
        } else {
            Route::Language
        }
    }

    fn weather_requested(&self, signals: &IntentSignals) -> bool {
        signals.beach.is_some() && signals.wants_weather && self.sources.weather.is_some()
    }

    /// Build a reply from provider data, or `None` when the language model
    /// should answer instead.
    pub async fn compose(&self, signals: &IntentSignals) -> Option<Composed> {
        let route = self.route(signals);
        tracing::debug!(?route, beach = ?signals.beach_name(), "composing reply");

        let text = match route {
            Route::Weather => {
                let weather = self.sources.weather.as_deref()?;
                weather_report(weather, signals.beach_name()?).await
            }
            Route::Sections => {
                let beach = signals.beach_name()?;
                let mut sections = Vec::new();

                if self.weather_requested(signals) {
                    sections.push(no_coordinates(beach));
                }

                if signals.wants_tide {
                    if let Some(tides) = self.sources.tides.as_deref() {
                        sections.push(format!("{}\n{}", TIDE_HEADING, tide_section(tides, beach).await));
                    }
                }
                if signals.wants_amenities {
                    if let Some(places) = self.sources.places.as_deref() {
                        sections.push(format!(
                            "{}\n{}",
                            AMENITIES_HEADING,
                            amenities_section(places, beach).await
                        ));
                    }
                }

                if sections.is_empty() {
                    tracing::debug!(beach, "no data source for the requested sections");
                    return None;
                }
                sections.join("\n\n")
            }
            Route::TideOnly => missing_beach("tide predictions"),
            Route::AmenitiesOnly => missing_beach("nearby amenities"),
            Route::Language => return None,
        };

        Some(Composed { route, text })
    }
}

fn has_coordinates(signals: &IntentSignals) -> bool {
    signals
        .beach_name()
        .and_then(catalog::coordinates_for)
        .is_some()
}

fn no_coordinates(beach: &str) -> String {
    format!(
        "I couldn't determine coordinates for {}, so I can't look up its weather.",
        beach
    )
}

fn missing_beach(what: &str) -> String {
    format!(
        "I couldn't determine which beach you're asking about. Please include the beach name so I can look up {}.",
        what
    )
}

async fn weather_report(weather: &dyn WeatherSource, beach: &str) -> String {
    let Some(coordinates) = catalog::coordinates_for(beach) else {
        return no_coordinates(beach);
    };

    let (conditions, forecast) = futures::join!(
        weather.current_conditions(coordinates.lat, coordinates.lon),
        weather.forecast(coordinates.lat, coordinates.lon)
    );

    let mut sentences = Vec::new();

    if let Some(observation) = conditions {
        let mut details = Vec::new();
        if let Some(description) = observation
            .text_description
            .filter(|d| !d.trim().is_empty())
        {
            details.push(description);
        }
        if let (Some(f), Some(c)) = (
            observation.temperature.fahrenheit(),
            observation.temperature.celsius(),
        ) {
            details.push(format!("{:.0}°F ({:.0}°C)", f, c));
        }
        if let Some(mph) = observation.wind_speed.miles_per_hour() {
            details.push(format!("wind {:.0} mph", mph));
        }
        if !details.is_empty() {
            sentences.push(format!("Current conditions at {}: {}.", beach, details.join(", ")));
        }
    }

    if let Some(period) = forecast.and_then(|f| f.periods.into_iter().next()) {
        sentences.push(format!("Forecast for {}: {}", period.name, period.detailed_forecast));
    }

    if sentences.is_empty() {
        return format!("Weather information for {} is not available right now.", beach);
    }

    sentences.push("(Source: NOAA National Weather Service)".to_string());
    sentences.join(" ")
}

async fn tide_section(tides: &dyn TideSource, beach: &str) -> String {
    let Some(station) = catalog::station_for(beach) else {
        return format!("I don't have a tide station on file for {}.", beach);
    };

    let today = Utc::now().date_naive();
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let query = TideQuery::new(station, today, tomorrow);
    let units = query.units;

    match tides.tide_predictions(&query).await {
        Err(e) => {
            tracing::warn!(beach, station, error = %e, "tide lookup failed");
            format!("I couldn't retrieve tide predictions for {}: {}.", beach, e)
        }
        Ok(predictions) if predictions.is_empty() => {
            format!("No tide predictions are available for {} right now.", beach)
        }
        Ok(predictions) => {
            let lines: Vec<String> = predictions
                .iter()
                .map(|p| {
                    let kind = p.kind.map(|k| k.label()).unwrap_or("Predicted");
                    format!("- {} tide at {}: {} {}", kind, p.time, p.value, units.height_unit())
                })
                .collect();
            format!(
                "Tide predictions for {} (station {}, times in GMT):\n{}\nSource: NOAA Tides and Currents.",
                beach,
                station,
                lines.join("\n")
            )
        }
    }
}

async fn amenities_section(places: &dyn PlacesSource, beach: &str) -> String {
    let mut search = PlaceSearch::text(format!("amenities near {}", beach));
    if let Some(c) = catalog::coordinates_for(beach) {
        search = search.with_location(LatLng { lat: c.lat, lng: c.lon }, AMENITY_SEARCH_RADIUS_METRES);
    }

    match places.search_places(&search).await {
        Err(e) => {
            tracing::warn!(beach, error = %e, "places lookup failed");
            format!("I couldn't retrieve amenities near {}: {}.", beach, e)
        }
        Ok(response) if response.results.is_empty() => {
            format!("I couldn't find any amenities near {}.", beach)
        }
        Ok(response) => {
            let names: Vec<&str> = response
                .results
                .iter()
                .take(MAX_AMENITIES)
                .map(|place| place.name.as_str())
                .collect();
            format!("Places near {}: {}.", beach, names.join(", "))
        }
    }
}

/// Normalise a reply: strip any echoed transcript, trim, capitalise the first
/// letter and end with terminal punctuation. Empty text stays empty.
pub fn finalize_reply(text: &str) -> String {
    let mut reply = first_assistant_turn(text.trim()).to_string();
    if reply.is_empty() {
        return reply;
    }

    if let Some(first) = reply.chars().next() {
        if first.is_lowercase() {
            reply = first.to_uppercase().chain(reply.chars().skip(1)).collect();
        }
    }

    if !reply.ends_with(['.', '!', '?']) {
        reply.push('.');
    }
    reply
}

/// Models sometimes continue a reply with an invented `User:` / `Assistant:`
/// exchange. Keep what precedes the first marker, or failing that the body of
/// the first assistant turn.
fn first_assistant_turn(text: &str) -> &str {
    let markers: Vec<(usize, usize, bool)> = TRANSCRIPT_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let speaker = caps.get(1)?.as_str();
            Some((whole.start(), whole.end(), matches!(speaker, "Assistant" | "AI")))
        })
        .collect();

    let Some(&(first_start, _, _)) = markers.first() else {
        return text;
    };

    let lead = text[..first_start].trim();
    if !lead.is_empty() {
        return lead;
    }

    markers
        .iter()
        .enumerate()
        .find(|(_, (_, _, assistant))| *assistant)
        .map(|(i, &(_, end, _))| {
            let next = markers.get(i + 1).map(|m| m.0).unwrap_or(text.len());
            text[end..next].trim()
        })
        .unwrap_or("")
}
