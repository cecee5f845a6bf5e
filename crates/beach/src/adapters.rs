//! Boundary clients for the external data providers the composer consults.
//!
//! Each provider sits behind a small async trait so the agent can be built
//! with real HTTP clients, test doubles, or without a provider at all.
pub mod places;
pub mod tides;
pub mod weather;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use places::{GooglePlacesClient, PlacesSource};
pub use tides::{NoaaTidesClient, TideSource};
pub use weather::{NwsWeatherClient, WeatherSource};

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Status(u16),

    #[error("{0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    Validation(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// The data providers available to a conversation. Any of them may be absent,
/// which disables the matching composer path.
///
/// Cloning shares the underlying clients; they hold no per-call state.
#[derive(Clone, Default)]
pub struct DataSources {
    pub tides: Option<Arc<dyn TideSource>>,
    pub weather: Option<Arc<dyn WeatherSource>>,
    pub places: Option<Arc<dyn PlacesSource>>,
}

impl DataSources {
    pub fn with_tides(mut self, tides: Arc<dyn TideSource>) -> Self {
        self.tides = Some(tides);
        self
    }

    pub fn with_weather(mut self, weather: Arc<dyn WeatherSource>) -> Self {
        self.weather = Some(weather);
        self
    }

    pub fn with_places(mut self, places: Arc<dyn PlacesSource>) -> Self {
        self.places = Some(places);
        self
    }
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSources")
            .field("tides", &self.tides.is_some())
            .field("weather", &self.weather.is_some())
            .field("places", &self.places.is_some())
            .finish()
    }
}

/// Send a request and decode a JSON body, mapping non-200 statuses to errors.
pub(crate) async fn fetch_json(request: RequestBuilder) -> AdapterResult<Value> {
    let response = request.send().await?;

    match response.status() {
        StatusCode::OK => Ok(response.json().await?),
        status => {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), body = %body, "provider returned an error status");
            Err(AdapterError::Status(status.as_u16()))
        }
    }
}

/// Validate a JSON payload against the provider-specific schema.
pub(crate) fn validate<T: DeserializeOwned>(payload: Value, what: &str) -> AdapterResult<T> {
    serde_json::from_value(payload)
        .map_err(|e| AdapterError::Validation(format!("{} did not match the expected schema: {}", what, e)))
}
