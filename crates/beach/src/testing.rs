//! In-memory data sources for unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::adapters::places::{PlaceDetails, PlaceSearch, PlaceSearchResponse, PlaceSummary};
use crate::adapters::tides::{Station, TidePrediction, TideQuery, Units, WaterTemperatureReading};
use crate::adapters::weather::{Forecast, ForecastPeriod, Measurement, Observation};
use crate::adapters::{AdapterError, AdapterResult, PlacesSource, TideSource, WeatherSource};

pub struct MockTides {
    predictions: Result<Vec<TidePrediction>, u16>,
    stations: Mutex<Vec<String>>,
}

impl MockTides {
    pub fn with_predictions(predictions: Vec<TidePrediction>) -> Self {
        Self {
            predictions: Ok(predictions),
            stations: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with the given HTTP status
    pub fn failing(status: u16) -> Self {
        Self {
            predictions: Err(status),
            stations: Mutex::new(Vec::new()),
        }
    }

    /// Station ids queried so far, in order
    pub fn stations(&self) -> Vec<String> {
        self.stations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TideSource for MockTides {
    async fn tide_predictions(&self, query: &TideQuery) -> AdapterResult<Vec<TidePrediction>> {
        self.stations.lock().unwrap().push(query.station_id.clone());
        self.predictions.clone().map_err(AdapterError::Status)
    }

    async fn water_temperature(
        &self,
        station_id: &str,
        _begin_date: NaiveDate,
        _end_date: NaiveDate,
        _units: Units,
    ) -> AdapterResult<Vec<WaterTemperatureReading>> {
        self.stations.lock().unwrap().push(station_id.to_string());
        self.predictions.as_ref().map_err(|s| AdapterError::Status(*s))?;
        Ok(vec![WaterTemperatureReading {
            time: "2024-06-01 12:00".to_string(),
            value: "78.4".to_string(),
        }])
    }

    /// Two stations around the search point, farthest first
    async fn find_stations(
        &self,
        lat: f64,
        lng: f64,
        _radius: f64,
        _units: Units,
    ) -> AdapterResult<Vec<Station>> {
        self.predictions.as_ref().map_err(|s| AdapterError::Status(*s))?;
        Ok(vec![
            Station {
                id: "8726520".to_string(),
                name: "St. Petersburg".to_string(),
                lat: lat - 0.2,
                lng: lng + 0.1,
                state: Some("FL".to_string()),
                distance: Some(24.1),
            },
            Station {
                id: "8726724".to_string(),
                name: "Clearwater Beach".to_string(),
                lat,
                lng,
                state: Some("FL".to_string()),
                distance: Some(0.4),
            },
        ])
    }
}

pub struct MockWeather {
    observation: Option<Observation>,
    forecast: Option<Forecast>,
    calls: AtomicUsize,
}

impl MockWeather {
    pub fn sunny() -> Self {
        Self {
            observation: Some(Observation {
                text_description: Some("Sunny".to_string()),
                temperature: Measurement {
                    value: Some(28.0),
                    unit_code: Some("wmoUnit:degC".to_string()),
                },
                wind_speed: Measurement {
                    value: Some(16.0934),
                    unit_code: Some("wmoUnit:km_h-1".to_string()),
                },
                ..Default::default()
            }),
            forecast: Some(Forecast {
                periods: vec![ForecastPeriod {
                    name: "Tonight".to_string(),
                    detailed_forecast: "Mostly clear, with a low around 72.".to_string(),
                    short_forecast: Some("Mostly Clear".to_string()),
                    temperature: Some(72.0),
                    temperature_unit: Some("F".to_string()),
                    wind_speed: Some("5 mph".to_string()),
                    wind_direction: Some("NE".to_string()),
                }],
            }),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every lookup comes back empty
    pub fn empty() -> Self {
        Self {
            observation: None,
            forecast: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for MockWeather {
    async fn current_conditions(&self, _lat: f64, _lon: f64) -> Option<Observation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.observation.clone()
    }

    async fn forecast(&self, _lat: f64, _lon: f64) -> Option<Forecast> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forecast.clone()
    }
}

pub struct MockPlaces {
    names: Vec<String>,
    queries: Mutex<Vec<String>>,
}

impl MockPlaces {
    pub fn with_names(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn summary(name: &str) -> PlaceSummary {
        PlaceSummary {
            name: name.to_string(),
            place_id: Some(name.to_lowercase().replace(' ', "-")),
            formatted_address: None,
            vicinity: None,
            rating: Some(4.5),
            user_ratings_total: None,
            price_level: None,
            types: Vec::new(),
            business_status: None,
            geometry: None,
            opening_hours: None,
        }
    }
}

#[async_trait]
impl PlacesSource for MockPlaces {
    async fn search_places(&self, search: &PlaceSearch) -> AdapterResult<PlaceSearchResponse> {
        self.queries
            .lock()
            .unwrap()
            .push(search.query.clone().unwrap_or_default());
        let status = if self.names.is_empty() { "ZERO_RESULTS" } else { "OK" };
        Ok(PlaceSearchResponse {
            results: self.names.iter().map(|n| Self::summary(n)).collect(),
            status: status.to_string(),
            next_page_token: None,
        })
    }

    async fn place_details(&self, place_id: &str, _fields: &[&str]) -> AdapterResult<PlaceDetails> {
        Err(AdapterError::Api(format!("NOT_FOUND: {}", place_id)))
    }
}
