//! Reverse geocoding with a coordinate fallback.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::dispatch::Coordinates;

#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Never fails: provider errors degrade to [`fallback_address`].
    async fn resolve(&self, coords: Coordinates) -> String;
}

pub fn fallback_address(coords: Coordinates) -> String {
    format!("{:.4}, {:.4}", coords.latitude, coords.longitude)
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

/// Google Geocoding API client.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(url: &str, api_key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn fetch(&self, coords: Coordinates) -> reqwest::Result<GeocodeResponse> {
        let latlng = format!("{},{}", coords.latitude, coords.longitude);
        self.client
            .get(&self.url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Errors carry no URL: the API key travels in the query string.
    async fn lookup(&self, coords: Coordinates) -> reqwest::Result<Option<String>> {
        let response = self
            .fetch(coords)
            .await
            .map_err(reqwest::Error::without_url)?;

        if response.status != "OK" {
            debug!("Geocoder returned status {}", response.status);
            return Ok(None);
        }

        Ok(response
            .results
            .into_iter()
            .map(|r| r.formatted_address)
            .find(|a| !a.trim().is_empty()))
    }
}

#[async_trait]
impl AddressResolver for GoogleGeocoder {
    async fn resolve(&self, coords: Coordinates) -> String {
        match self.lookup(coords).await {
            Ok(Some(address)) => address,
            Ok(None) => fallback_address(coords),
            Err(e) => {
                warn!("Reverse geocoding failed, using coordinates: {}", e);
                fallback_address(coords)
            }
        }
    }
}
