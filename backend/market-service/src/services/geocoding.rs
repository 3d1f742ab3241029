/// Reverse geocoding client
///
/// Turns a longitude/latitude pair into the administrative town name used by
/// posts ("서울특별시 은평구 녹번동"). Backed by the Naver Cloud reverse
/// geocoding API.
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

use crate::config::GeocodingConfig;

#[derive(Debug, Error)]
pub enum GeocodingError {
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocoding API returned status {0}")]
    Status(u16),
    #[error("empty region error")]
    EmptyRegion,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    region: Region,
}

#[derive(Debug, Deserialize)]
struct Region {
    area1: Area,
    area2: Area,
    area3: Area,
}

#[derive(Debug, Deserialize)]
struct Area {
    name: String,
}

#[derive(Clone)]
pub struct GeocodingClient {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl GeocodingClient {
    pub fn new(config: &GeocodingConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Resolve coordinates to a town name.
    pub async fn town_name(&self, lon: f64, lat: f64) -> Result<String, GeocodingError> {
        let coords = format!("{},{}", lon, lat);

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-NCP-APIGW-API-KEY-ID", &self.client_id)
            .header("X-NCP-APIGW-API-KEY", &self.client_secret)
            .query(&[
                ("request", "coordsToaddr"),
                ("coords", coords.as_str()),
                ("sourcecrs", "epsg:4326"),
                ("output", "json"),
                ("orders", "admcode"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, coords = %coords, "Reverse geocoding failed");
            return Err(GeocodingError::Status(status.as_u16()));
        }

        let body: ReverseGeocodeResponse = response
            .json()
            .await
            .map_err(|_| GeocodingError::EmptyRegion)?;
        let name = town_name_from(body)?;

        info!(coords = %coords, town = %name, "Resolved town name");
        Ok(name)
    }
}

fn town_name_from(body: ReverseGeocodeResponse) -> Result<String, GeocodingError> {
    let region = body
        .results
        .into_iter()
        .next()
        .map(|result| result.region)
        .ok_or(GeocodingError::EmptyRegion)?;

    let name = format!(
        "{} {} {}",
        region.area1.name, region.area2.name, region.area3.name
    );
    // Area names such as "종로1.2.3.4가동" are stored with a middle dot.
    Ok(name.replace('.', "·"))
}
