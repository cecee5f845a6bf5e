use async_trait::async_trait;
use chrono::{Days, Utc};
use serde_json::{json, Value};

use crate::adapters::places::{LatLng, PlaceSearch};
use crate::adapters::tides::{TideQuery, Units};
use crate::adapters::DataSources;
use crate::catalog::{self, BeachInfo};
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall};
use crate::systems::System;

const MAX_DAYS: u64 = 7;
const DEFAULT_STATION_RADIUS_KM: f64 = 50.0;

/// Exposes the tide, weather and places providers to the language model
pub struct BeachDataSystem {
    tools: Vec<Tool>,
    sources: DataSources,
}

fn beach_parameter() -> Value {
    json!({
        "type": "string",
        "description": "Name of the beach, e.g. \"Clearwater Beach\"."
    })
}

impl BeachDataSystem {
    pub fn new(sources: DataSources) -> Self {
        let tide_tool = Tool::new(
            "tide_predictions",
            "Get high and low tide predictions from NOAA for a beach, starting today.",
            json!({
                "type": "object",
                "required": ["beach"],
                "properties": {
                    "beach": beach_parameter(),
                    "days": {
                        "type": "integer",
                        "default": 1,
                        "description": "How many days of predictions to return (1-7)."
                    }
                }
            }),
        );

        let water_tool = Tool::new(
            "water_temperature",
            "Get the latest water temperature readings from the NOAA station nearest a beach.",
            json!({
                "type": "object",
                "required": ["beach"],
                "properties": {"beach": beach_parameter()}
            }),
        );

        let places_tool = Tool::new(
            "nearby_places",
            "Search for restaurants, hotels, parking and other amenities near a beach.",
            json!({
                "type": "object",
                "required": ["beach"],
                "properties": {
                    "beach": beach_parameter(),
                    "query": {
                        "type": "string",
                        "default": null,
                        "description": "What to look for, e.g. \"seafood restaurants\". Defaults to amenities."
                    }
                }
            }),
        );

        let weather_tool = Tool::new(
            "weather",
            "Get current conditions and the forecast from the National Weather Service for a beach.",
            json!({
                "type": "object",
                "required": ["beach"],
                "properties": {"beach": beach_parameter()}
            }),
        );

        let stations_tool = Tool::new(
            "tide_stations",
            "Find NOAA tide stations near a beach, nearest first.",
            json!({
                "type": "object",
                "required": ["beach"],
                "properties": {
                    "beach": beach_parameter(),
                    "radius_km": {
                        "type": "number",
                        "default": DEFAULT_STATION_RADIUS_KM,
                        "description": "Search radius in kilometers."
                    }
                }
            }),
        );

        Self {
            tools: vec![tide_tool, water_tool, places_tool, weather_tool, stations_tool],
            sources,
        }
    }

    async fn tide_predictions(&self, params: Value) -> AgentResult<Value> {
        let tides = self
            .sources
            .tides
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("tide predictions".into()))?;
        let beach = known_beach(&params)?;
        let station = station(beach)?;

        let days = params
            .get("days")
            .and_then(|v| v.as_u64())
            .unwrap_or(1)
            .clamp(1, MAX_DAYS);
        let today = Utc::now().date_naive();
        let end = today.checked_add_days(Days::new(days)).unwrap_or(today);

        let predictions = tides
            .tide_predictions(&TideQuery::new(station, today, end))
            .await?;

        Ok(json!({
            "beach": beach.name,
            "station": station,
            "datum": "MLLW",
            "units": "ft",
            "time_zone": "GMT",
            "predictions": predictions,
        }))
    }

    async fn water_temperature(&self, params: Value) -> AgentResult<Value> {
        let tides = self
            .sources
            .tides
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("water temperature".into()))?;
        let beach = known_beach(&params)?;
        let station = station(beach)?;

        let today = Utc::now().date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        let readings = tides
            .water_temperature(station, yesterday, today, Units::English)
            .await?;

        Ok(json!({
            "beach": beach.name,
            "station": station,
            "units": Units::English.temperature_unit(),
            "latest": readings.last(),
        }))
    }

    async fn nearby_places(&self, params: Value) -> AgentResult<Value> {
        let places = self
            .sources
            .places
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("places search".into()))?;
        let beach = beach_name(&params)?;
        let what = params
            .get("query")
            .and_then(|v| v.as_str())
            .filter(|q| !q.trim().is_empty())
            .unwrap_or("amenities");

        let mut search = PlaceSearch::text(format!("{} near {}", what, beach));
        if let Some(c) = catalog::coordinates_for(beach) {
            search = search.with_location(LatLng { lat: c.lat, lng: c.lon }, 5000);
        }
        let response = places.search_places(&search).await?;

        let results: Vec<Value> = response
            .results
            .iter()
            .take(10)
            .map(|place| {
                json!({
                    "name": place.name,
                    "address": place.formatted_address.as_ref().or(place.vicinity.as_ref()),
                    "rating": place.rating,
                    "open_now": place.opening_hours.as_ref().and_then(|h| h.open_now),
                })
            })
            .collect();

        Ok(json!({ "beach": beach, "query": what, "results": results }))
    }

    async fn weather(&self, params: Value) -> AgentResult<Value> {
        let weather = self
            .sources
            .weather
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("weather".into()))?;
        let beach = known_beach(&params)?;
        let coordinates = beach.coordinates.ok_or_else(|| {
            AgentError::InvalidParameters(format!("No coordinates are known for {}", beach.name))
        })?;

        let (conditions, forecast) = futures::join!(
            weather.current_conditions(coordinates.lat, coordinates.lon),
            weather.forecast(coordinates.lat, coordinates.lon)
        );

        if conditions.is_none() && forecast.is_none() {
            return Err(AgentError::ExecutionError(format!(
                "Weather data for {} is not available",
                beach.name
            )));
        }

        Ok(json!({
            "beach": beach.name,
            "conditions": conditions,
            "forecast": forecast.and_then(|f| f.periods.into_iter().next()),
        }))
    }

    async fn tide_stations(&self, params: Value) -> AgentResult<Value> {
        let tides = self
            .sources
            .tides
            .as_deref()
            .ok_or_else(|| AgentError::Unavailable("tide stations".into()))?;
        let beach = known_beach(&params)?;
        let coordinates = beach.coordinates.ok_or_else(|| {
            AgentError::InvalidParameters(format!("No coordinates are known for {}", beach.name))
        })?;
        let radius = params
            .get("radius_km")
            .and_then(|v| v.as_f64())
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_STATION_RADIUS_KM);

        let mut stations = tides
            .find_stations(coordinates.lat, coordinates.lon, radius, Units::Metric)
            .await?;
        stations.sort_by(|a, b| {
            let a = a.distance.unwrap_or(f64::MAX);
            let b = b.distance.unwrap_or(f64::MAX);
            a.total_cmp(&b)
        });

        Ok(json!({
            "beach": beach.name,
            "radius_km": radius,
            "catalog_station": beach.station_id,
            "stations": stations,
        }))
    }
}

fn beach_name(params: &Value) -> AgentResult<&str> {
    params
        .get("beach")
        .and_then(|v| v.as_str())
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| AgentError::InvalidParameters("Missing 'beach' parameter".into()))
}

fn known_beach(params: &Value) -> AgentResult<&'static BeachInfo> {
    let name = beach_name(params)?;
    catalog::lookup(name).ok_or_else(|| {
        AgentError::InvalidParameters(format!("'{}' is not a beach I have data for", name))
    })
}

fn station(beach: &BeachInfo) -> AgentResult<&'static str> {
    beach.station_id.ok_or_else(|| {
        AgentError::InvalidParameters(format!("No tide station is known for {}", beach.name))
    })
}

#[async_trait]
impl System for BeachDataSystem {
    fn name(&self) -> &str {
        "beach"
    }

    fn description(&self) -> &str {
        "Live tide, water temperature, weather and amenity data for USA beaches"
    }

    fn instructions(&self) -> &str {
        "Use these tools when the user asks about current conditions at a specific beach. \
        Always mention that tide and weather data comes from NOAA."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> AgentResult<Value> {
        match tool_call.name.as_str() {
            "tide_predictions" => self.tide_predictions(tool_call.arguments).await,
            "water_temperature" => self.water_temperature(tool_call.arguments).await,
            "nearby_places" => self.nearby_places(tool_call.arguments).await,
            "weather" => self.weather(tool_call.arguments).await,
            "tide_stations" => self.tide_stations(tool_call.arguments).await,
            _ => Err(AgentError::ToolNotFound(tool_call.name)),
        }
    }
}
