use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{fetch_json, validate, AdapterError, AdapterResult};

pub const NWS_BASE_URL: &str = "https://api.weather.gov";
pub const NWS_USER_AGENT: &str = "beach-ai/1.0 (beach-assistant)";

/// A value with the WMO unit code NWS attaches to it, e.g. `wmoUnit:degC`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit_code: Option<String>,
}

impl Measurement {
    /// Temperature in Fahrenheit, whatever unit the station reported.
    pub fn fahrenheit(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit_code.as_deref() {
            Some(code) if code.ends_with("degF") => Some(value),
            _ => Some(value * 9.0 / 5.0 + 32.0),
        }
    }

    pub fn celsius(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit_code.as_deref() {
            Some(code) if code.ends_with("degF") => Some((value - 32.0) * 5.0 / 9.0),
            _ => Some(value),
        }
    }

    /// Speed in miles per hour; NWS observations default to km/h.
    pub fn miles_per_hour(&self) -> Option<f64> {
        let value = self.value?;
        match self.unit_code.as_deref() {
            Some(code) if code.ends_with("m_s-1") => Some(value * 2.236_94),
            Some(code) if code.ends_with("mi_h-1") => Some(value),
            _ => Some(value * 0.621_371),
        }
    }
}

/// Latest observation from the station nearest a point
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub text_description: Option<String>,
    #[serde(default)]
    pub temperature: Measurement,
    #[serde(default)]
    pub wind_speed: Measurement,
    #[serde(default)]
    pub wind_direction: Measurement,
    #[serde(default)]
    pub relative_humidity: Measurement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: String,
    pub detailed_forecast: String,
    #[serde(default)]
    pub short_forecast: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub temperature_unit: Option<String>,
    #[serde(default)]
    pub wind_speed: Option<String>,
    #[serde(default)]
    pub wind_direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointProperties {
    forecast: String,
    observation_stations: String,
}

#[derive(Debug, Deserialize)]
struct PointResponse {
    properties: PointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StationProperties {
    station_identifier: String,
}

#[derive(Debug, Deserialize)]
struct StationFeature {
    properties: StationProperties,
}

#[derive(Debug, Deserialize)]
struct StationsResponse {
    features: Vec<StationFeature>,
}

#[derive(Debug, Deserialize)]
struct ObservationResponse {
    properties: Observation,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: Forecast,
}

/// Current conditions and forecasts by coordinates.
///
/// Any failed step along the lookup chain yields `None` rather than an error.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_conditions(&self, lat: f64, lon: f64) -> Option<Observation>;

    async fn forecast(&self, lat: f64, lon: f64) -> Option<Forecast>;
}

#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: NWS_BASE_URL.to_string(),
            user_agent: NWS_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the National Weather Service API (api.weather.gov)
pub struct NwsWeatherClient {
    client: Client,
    base_url: String,
}

impl NwsWeatherClient {
    pub fn new(config: WeatherConfig) -> AdapterResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| AdapterError::NotConfigured(format!("invalid user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/geo+json,application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn point(&self, lat: f64, lon: f64) -> AdapterResult<PointProperties> {
        let url = format!("{}/points/{:.4},{:.4}", self.base_url, lat, lon);
        let payload = fetch_json(self.client.get(url)).await?;
        let point: PointResponse = validate(payload, "points lookup")?;
        Ok(point.properties)
    }

    async fn try_current_conditions(&self, lat: f64, lon: f64) -> AdapterResult<Observation> {
        let point = self.point(lat, lon).await?;

        let payload = fetch_json(self.client.get(&point.observation_stations)).await?;
        let stations: StationsResponse = validate(payload, "observation stations")?;
        let station = stations
            .features
            .first()
            .map(|feature| feature.properties.station_identifier.clone())
            .ok_or_else(|| AdapterError::Api("no observation stations near this point".to_string()))?;

        let url = format!("{}/stations/{}/observations/latest", self.base_url, station);
        let payload = fetch_json(self.client.get(url)).await?;
        let observation: ObservationResponse = validate(payload, "latest observation")?;
        Ok(observation.properties)
    }

    async fn try_forecast(&self, lat: f64, lon: f64) -> AdapterResult<Forecast> {
        let point = self.point(lat, lon).await?;
        let payload = fetch_json(self.client.get(&point.forecast)).await?;
        let forecast: ForecastResponse = validate(payload, "forecast")?;
        Ok(forecast.properties)
    }
}

#[async_trait]
impl WeatherSource for NwsWeatherClient {
    async fn current_conditions(&self, lat: f64, lon: f64) -> Option<Observation> {
        match self.try_current_conditions(lat, lon).await {
            Ok(observation) => Some(observation),
            Err(e) => {
                tracing::warn!(lat, lon, error = %e, "failed to fetch current conditions");
                None
            }
        }
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Option<Forecast> {
        match self.try_forecast(lat, lon).await {
            Ok(forecast) => Some(forecast),
            Err(e) => {
                tracing::warn!(lat, lon, error = %e, "failed to fetch forecast");
                None
            }
        }
    }
}
