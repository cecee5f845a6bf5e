use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{fetch_json, validate, AdapterError, AdapterResult};

pub const PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

const DEFAULT_PHOTO_WIDTH: u32 = 400;

/// Fields requested from the details endpoint when the caller asks for none.
pub const DEFAULT_DETAIL_FIELDS: &[&str] = &[
    "place_id",
    "name",
    "formatted_address",
    "formatted_phone_number",
    "website",
    "rating",
    "user_ratings_total",
    "price_level",
    "opening_hours",
    "types",
    "url",
];

const FIND_PLACE_FIELDS: &[&str] = &["place_id", "name", "formatted_address", "geometry", "rating", "types"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceLevel {
    Free,
    Inexpensive,
    Moderate,
    Expensive,
    VeryExpensive,
}

impl PriceLevel {
    fn from_level(level: u64) -> Option<Self> {
        match level {
            0 => Some(PriceLevel::Free),
            1 => Some(PriceLevel::Inexpensive),
            2 => Some(PriceLevel::Moderate),
            3 => Some(PriceLevel::Expensive),
            4 => Some(PriceLevel::VeryExpensive),
            _ => None,
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        match label.trim_start_matches("PRICE_LEVEL_") {
            "FREE" => Some(PriceLevel::Free),
            "INEXPENSIVE" => Some(PriceLevel::Inexpensive),
            "MODERATE" => Some(PriceLevel::Moderate),
            "EXPENSIVE" => Some(PriceLevel::Expensive),
            "VERY_EXPENSIVE" => Some(PriceLevel::VeryExpensive),
            _ => None,
        }
    }
}

/// Price levels arrive as 0-4 from the legacy API and as labels from the new one.
fn price_level<'de, D>(deserializer: D) -> Result<Option<PriceLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(PriceLevel::from_level),
        Some(Value::String(s)) => PriceLevel::from_label(&s),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub weekday_text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub name: String,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u64>,
    #[serde(default, deserialize_with = "price_level")]
    pub price_level: Option<PriceLevel>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSearchResponse {
    #[serde(default)]
    pub results: Vec<PlaceSummary>,
    pub status: String,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub name: String,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u64>,
    #[serde(default, deserialize_with = "price_level")]
    pub price_level: Option<PriceLevel>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    result: PlaceDetails,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<PlaceSummary>,
}

/// Search parameters. With a `query` the text search endpoint is used,
/// otherwise a nearby search around `location`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceSearch {
    pub query: Option<String>,
    pub location: Option<LatLng>,
    /// Metres
    pub radius: Option<u32>,
    pub place_type: Option<String>,
    pub language: Option<String>,
    pub region: Option<String>,
    pub min_price: Option<u8>,
    pub max_price: Option<u8>,
    pub open_now: bool,
    pub page_token: Option<String>,
}

impl PlaceSearch {
    pub fn text<S: Into<String>>(query: S) -> Self {
        Self {
            query: Some(query.into()),
            language: Some("en".to_string()),
            ..Default::default()
        }
    }

    pub fn nearby(location: LatLng, radius: u32) -> Self {
        Self {
            location: Some(location),
            radius: Some(radius),
            language: Some("en".to_string()),
            ..Default::default()
        }
    }

    pub fn with_type<S: Into<String>>(mut self, place_type: S) -> Self {
        self.place_type = Some(place_type.into());
        self
    }

    pub fn with_location(mut self, location: LatLng, radius: u32) -> Self {
        self.location = Some(location);
        self.radius = Some(radius);
        self
    }

    pub fn open_now(mut self) -> Self {
        self.open_now = true;
        self
    }

    fn endpoint(&self) -> &'static str {
        if self.query.is_some() {
            "textsearch/json"
        } else {
            "nearbysearch/json"
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        if let Some(location) = &self.location {
            params.push(("location", format!("{},{}", location.lat, location.lng)));
        }
        if let Some(radius) = self.radius {
            params.push(("radius", radius.to_string()));
        }
        if let Some(place_type) = &self.place_type {
            params.push(("type", place_type.clone()));
        }
        if let Some(language) = &self.language {
            params.push(("language", language.clone()));
        }
        if let Some(region) = &self.region {
            params.push(("region", region.clone()));
        }
        if let Some(min_price) = self.min_price {
            params.push(("minprice", min_price.to_string()));
        }
        if let Some(max_price) = self.max_price {
            params.push(("maxprice", max_price.to_string()));
        }
        if self.open_now {
            params.push(("opennow", "true".to_string()));
        }
        if let Some(token) = &self.page_token {
            params.push(("pagetoken", token.clone()));
        }
        params
    }
}

/// Points of interest search.
#[async_trait]
pub trait PlacesSource: Send + Sync {
    async fn search_places(&self, search: &PlaceSearch) -> AdapterResult<PlaceSearchResponse>;

    async fn place_details(&self, place_id: &str, fields: &[&str]) -> AdapterResult<PlaceDetails>;
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl PlacesConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: PLACES_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Client for the Google Places web service
pub struct GooglePlacesClient {
    client: Client,
    config: PlacesConfig,
}

impl GooglePlacesClient {
    pub fn new(config: PlacesConfig) -> AdapterResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::NotConfigured(
                "a Google Places API key is required".to_string(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Resolve free text such as a business name to matching places.
    pub async fn find_place(&self, input: &str, fields: &[&str]) -> AdapterResult<Vec<PlaceSummary>> {
        let fields = if fields.is_empty() {
            FIND_PLACE_FIELDS
        } else {
            fields
        };
        let params = vec![
            ("input", input.to_string()),
            ("inputtype", "textquery".to_string()),
            ("fields", fields.join(",")),
        ];
        let payload = self.get("findplacefromtext/json", params).await?;
        let response: FindPlaceResponse = validate(payload, "find place")?;
        Ok(response.candidates)
    }

    /// Download the image behind a photo reference, 400px wide unless
    /// a size is given.
    pub async fn place_photo(
        &self,
        photo_reference: &str,
        max_width: Option<u32>,
        max_height: Option<u32>,
    ) -> AdapterResult<Vec<u8>> {
        let url = format!("{}/photo", self.config.base_url.trim_end_matches('/'));
        let max_width = match (max_width, max_height) {
            (None, None) => Some(DEFAULT_PHOTO_WIDTH),
            (width, _) => width,
        };

        let mut params = vec![("photoreference", photo_reference.to_string())];
        if let Some(width) = max_width {
            params.push(("maxwidth", width.to_string()));
        }
        if let Some(height) = max_height {
            params.push(("maxheight", height.to_string()));
        }
        tracing::debug!(url = %url, ?params, "requesting place photo");
        params.push(("key", self.config.api_key.clone()));

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status.as_u16()));
        }
        let photo = response.bytes().await?;
        if photo.is_empty() {
            return Err(AdapterError::Validation("received empty photo data".to_string()));
        }
        Ok(photo.to_vec())
    }

    async fn get(&self, endpoint: &str, mut params: Vec<(&'static str, String)>) -> AdapterResult<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        tracing::debug!(url = %url, ?params, "requesting places data");

        params.push(("key", self.config.api_key.clone()));
        let payload = fetch_json(self.client.get(&url).query(&params)).await?;
        check_status(&payload)?;
        Ok(payload)
    }
}

/// Google reports failures in a `status` field of an otherwise 200 response.
fn check_status(payload: &Value) -> AdapterResult<()> {
    let status = payload
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN_ERROR");
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => {
            let detail = payload
                .get("error_message")
                .and_then(|m| m.as_str())
                .unwrap_or("no error message");
            Err(AdapterError::Api(format!("{}: {}", other, detail)))
        }
    }
}

#[async_trait]
impl PlacesSource for GooglePlacesClient {
    async fn search_places(&self, search: &PlaceSearch) -> AdapterResult<PlaceSearchResponse> {
        let payload = self.get(search.endpoint(), search.params()).await?;
        validate(payload, "place search")
    }

    async fn place_details(&self, place_id: &str, fields: &[&str]) -> AdapterResult<PlaceDetails> {
        let fields = if fields.is_empty() {
            DEFAULT_DETAIL_FIELDS
        } else {
            fields
        };
        let params = vec![
            ("place_id", place_id.to_string()),
            ("fields", fields.join(",")),
        ];
        let payload = self.get("details/json", params).await?;
        let response: PlaceDetailsResponse = validate(payload, "place details")?;
        Ok(response.result)
    }
}
