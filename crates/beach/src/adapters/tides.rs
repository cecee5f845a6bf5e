use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{fetch_json, validate, AdapterError, AdapterResult};

pub const NOAA_TIDES_BASE_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod";
pub const NOAA_APPLICATION: &str = "beach-ai";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TideKind {
    #[serde(rename = "H")]
    High,
    #[serde(rename = "L")]
    Low,
}

impl TideKind {
    pub fn label(&self) -> &'static str {
        match self {
            TideKind::High => "High",
            TideKind::Low => "Low",
        }
    }
}

/// One predicted water level. NOAA sends both fields as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TidePrediction {
    #[serde(rename = "t")]
    pub time: String,
    #[serde(rename = "v")]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TideKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterTemperatureReading {
    #[serde(rename = "t")]
    pub time: String,
    #[serde(rename = "v")]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct PredictionsResponse {
    predictions: Vec<TidePrediction>,
}

#[derive(Debug, Deserialize)]
struct WaterTemperatureResponse {
    data: Vec<WaterTemperatureReading>,
}

/// A tide station returned by a proximity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub state: Option<String>,
    /// Distance from the search point in the requested units
    #[serde(default)]
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    English,
    Metric,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::English => "english",
            Units::Metric => "metric",
        }
    }

    pub fn height_unit(&self) -> &'static str {
        match self {
            Units::English => "ft",
            Units::Metric => "m",
        }
    }

    pub fn temperature_unit(&self) -> &'static str {
        match self {
            Units::English => "°F",
            Units::Metric => "°C",
        }
    }
}

/// Parameters for a tide prediction request
#[derive(Debug, Clone, PartialEq)]
pub struct TideQuery {
    pub station_id: String,
    pub begin_date: NaiveDate,
    pub end_date: NaiveDate,
    /// `hilo` for high/low events only, `h` for hourly levels
    pub interval: Option<String>,
    pub datum: String,
    pub units: Units,
    pub time_zone: String,
}

impl TideQuery {
    pub fn new<S: Into<String>>(station_id: S, begin_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            station_id: station_id.into(),
            begin_date,
            end_date,
            interval: Some("hilo".to_string()),
            datum: "MLLW".to_string(),
            units: Units::English,
            time_zone: "gmt".to_string(),
        }
    }

    pub fn with_interval(mut self, interval: Option<String>) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_time_zone<S: Into<String>>(mut self, time_zone: S) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("product", "predictions".to_string()),
            ("station", self.station_id.clone()),
            ("begin_date", format_date(self.begin_date)),
            ("end_date", format_date(self.end_date)),
            ("datum", self.datum.clone()),
            ("units", self.units.as_str().to_string()),
            ("time_zone", self.time_zone.clone()),
            ("application", NOAA_APPLICATION.to_string()),
            ("format", "json".to_string()),
        ];
        if let Some(interval) = &self.interval {
            params.push(("interval", interval.clone()));
        }
        params
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Tide and water data keyed by station id.
#[async_trait]
pub trait TideSource: Send + Sync {
    async fn tide_predictions(&self, query: &TideQuery) -> AdapterResult<Vec<TidePrediction>>;

    async fn water_temperature(
        &self,
        station_id: &str,
        begin_date: NaiveDate,
        end_date: NaiveDate,
        units: Units,
    ) -> AdapterResult<Vec<WaterTemperatureReading>>;

    /// Stations within `radius` of a point. Entries that fail to parse are skipped.
    async fn find_stations(
        &self,
        lat: f64,
        lng: f64,
        radius: f64,
        units: Units,
    ) -> AdapterResult<Vec<Station>>;
}

#[derive(Debug, Clone)]
pub struct TidesConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TidesConfig {
    fn default() -> Self {
        Self {
            base_url: NOAA_TIDES_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the NOAA CO-OPS data API
pub struct NoaaTidesClient {
    client: Client,
    config: TidesConfig,
}

impl NoaaTidesClient {
    pub fn new(config: TidesConfig) -> AdapterResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn get(&self, endpoint: &str, params: &[(&'static str, String)]) -> AdapterResult<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        tracing::debug!(url = %url, ?params, "requesting NOAA data");

        let payload = fetch_json(self.client.get(&url).query(params)).await?;

        // NOAA reports lookup failures with a 200 and an error object
        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown NOAA error");
            return Err(AdapterError::Api(message.to_string()));
        }
        Ok(payload)
    }
}

#[async_trait]
impl TideSource for NoaaTidesClient {
    async fn tide_predictions(&self, query: &TideQuery) -> AdapterResult<Vec<TidePrediction>> {
        let payload = self.get("datagetter", &query.params()).await?;
        let response: PredictionsResponse = validate(payload, "tide predictions")?;
        Ok(response.predictions)
    }

    async fn water_temperature(
        &self,
        station_id: &str,
        begin_date: NaiveDate,
        end_date: NaiveDate,
        units: Units,
    ) -> AdapterResult<Vec<WaterTemperatureReading>> {
        let params = vec![
            ("product", "water_temperature".to_string()),
            ("station", station_id.to_string()),
            ("begin_date", format_date(begin_date)),
            ("end_date", format_date(end_date)),
            ("units", units.as_str().to_string()),
            ("time_zone", "gmt".to_string()),
            ("application", NOAA_APPLICATION.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = self.get("datagetter", &params).await?;
        let response: WaterTemperatureResponse = validate(payload, "water temperature")?;
        Ok(response.data)
    }

    async fn find_stations(
        &self,
        lat: f64,
        lng: f64,
        radius: f64,
        units: Units,
    ) -> AdapterResult<Vec<Station>> {
        let params = vec![
            ("lat", lat.to_string()),
            ("lng", lng.to_string()),
            ("radius", radius.to_string()),
            ("units", units.as_str().to_string()),
            ("application", NOAA_APPLICATION.to_string()),
            ("format", "json".to_string()),
        ];
        let payload = self.get("stations.json", &params).await?;

        let entries = match payload.get("stations") {
            Some(Value::Array(entries)) => entries.clone(),
            Some(_) => return Err(AdapterError::Validation("stations is not a list".to_string())),
            None => Vec::new(),
        };
        let stations = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Station>(entry) {
                Ok(station) => Some(station),
                Err(err) => {
                    tracing::warn!(error = %err, "Invalid station data");
                    None
                }
            })
            .collect();
        Ok(stations)
    }
}
