use crate::config::YelpSettings;
use crate::error::SearchError;
use crate::models::restaurant::Restaurant;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const SEARCH_PATH: &str = "/v3/businesses/search";

#[async_trait]
pub trait NearbySearch {
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<Restaurant>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<Business>,
}

// Yelp sends explicit nulls for fields it has no data for
#[derive(Debug, Deserialize)]
struct Business {
    id: String,
    name: Option<String>,
    categories: Option<Vec<Category>>,
    rating: Option<f64>,
    coordinates: Option<Coordinates>,
    location: Option<Location>,
    image_url: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    city: Option<String>,
    state: Option<String>,
    display_address: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: Option<String>,
}

impl From<Business> for Restaurant {
    fn from(business: Business) -> Self {
        let location = business.location.unwrap_or_default();
        let coordinates = business.coordinates.unwrap_or_default();
        Restaurant {
            business_id: business.id,
            name: business.name.unwrap_or_default(),
            categories: business
                .categories
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.title)
                .collect::<Vec<_>>()
                .join(","),
            city: location.city.unwrap_or_default(),
            state: location.state.unwrap_or_default(),
            stars: business.rating.unwrap_or_default(),
            full_address: location.display_address.unwrap_or_default().join(","),
            latitude: coordinates.latitude.unwrap_or_default(),
            longitude: coordinates.longitude.unwrap_or_default(),
            image_url: business.image_url.unwrap_or_default(),
            url: business.url.unwrap_or_default(),
        }
    }
}

pub struct YelpClient {
    client: Client,
    settings: YelpSettings,
}

impl YelpClient {
    pub fn new(settings: YelpSettings) -> Result<Self, SearchError> {
        if settings.api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }
        Ok(YelpClient {
            client: Client::new(),
            settings,
        })
    }

    fn search_url(&self) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), SEARCH_PATH)
    }
}

#[async_trait]
impl NearbySearch for YelpClient {
    async fn search(&self, latitude: f64, longitude: f64) -> Result<Vec<Restaurant>, SearchError> {
        let params = [
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("term", self.settings.term.clone()),
            ("limit", self.settings.limit.to_string()),
        ];
        log::debug!("Sending request to Yelp API with params: {:?}", params);

        let response = self
            .client
            .get(self.search_url())
            .query(&params)
            .bearer_auth(&self.settings.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.description)
                .unwrap_or_else(|| "Unknown error".to_string());
            log::warn!("Yelp API error {}: {}", status, message);
            return Err(SearchError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = response.json::<SearchResponse>().await.map_err(|e| {
            if e.is_decode() {
                SearchError::Malformed(e.to_string())
            } else {
                SearchError::Request(e)
            }
        })?;
        log::debug!("Yelp returned {} businesses", parsed.businesses.len());

        Ok(parsed.businesses.into_iter().map(Restaurant::from).collect())
    }
}
