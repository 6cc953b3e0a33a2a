use serde::{Deserialize, Serialize};
use url::Url;

use crate::{config::AppConfig, error::AppError};

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Thin client for the map provider's geocoding and directions APIs. No
/// routing logic lives here; responses are reduced to the few fields the
/// frontend preview needs.
#[derive(Clone)]
pub struct GeoClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeHit {
    pub name: String,
    pub address: String,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePreview {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    text: String,
    place_name: String,
    center: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    distance: f64,
    duration: f64,
}

impl GeoClient {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: config.geo_api_url.clone(),
            api_key: config.geo_api_key.clone(),
        })
    }

    fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Forward-geocode a free-text place query.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>, AppError> {
        if !self.is_enabled() {
            return Err(AppError::NotImplemented);
        }

        let mut url = self
            .base_url
            .join(&format!(
                "/geocoding/v5/mapbox.places/{}.json",
                urlencode(query)
            ))
            .map_err(|err| AppError::Config(format!("invalid geocoding url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.api_key)
            .append_pair("limit", "5");

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::BadRequest(format!(
                "geocoding provider returned {}",
                response.status()
            )));
        }

        let parsed: GeocodeResponse = response.json().await?;
        Ok(parsed
            .features
            .into_iter()
            .map(|feature| {
                let [longitude, latitude] = feature.center;
                GeocodeHit {
                    name: feature.text,
                    address: feature.place_name,
                    longitude,
                    latitude,
                }
            })
            .collect())
    }

    /// Fetch a distance/duration estimate for an ordered coordinate chain.
    pub async fn directions(
        &self,
        coordinates: &[[f64; 2]],
        mode: &str,
    ) -> Result<RoutePreview, AppError> {
        if !self.is_enabled() {
            return Err(AppError::NotImplemented);
        }
        if coordinates.len() < 2 {
            return Err(AppError::BadRequest(
                "directions need at least two coordinates".into(),
            ));
        }
        if !matches!(mode, "driving" | "walking" | "cycling") {
            return Err(AppError::BadRequest(format!(
                "unsupported transport mode {mode:?}"
            )));
        }

        let chain = coordinates
            .iter()
            .map(|[lon, lat]| format!("{lon},{lat}"))
            .collect::<Vec<_>>()
            .join(";");
        let mut url = self
            .base_url
            .join(&format!("/directions/v5/mapbox/{mode}/{chain}"))
            .map_err(|err| AppError::Config(format!("invalid directions url: {err}")))?;
        url.query_pairs_mut()
            .append_pair("access_token", &self.api_key)
            .append_pair("overview", "false");

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::BadRequest(format!(
                "directions provider returned {}",
                response.status()
            )));
        }

        let parsed: DirectionsResponse = response.json().await?;
        let route = parsed
            .routes
            .into_iter()
            .next()
            .ok_or(AppError::NotFound)?;
        Ok(RoutePreview {
            distance_meters: route.distance,
            duration_seconds: route.duration,
        })
    }
}

fn urlencode(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                c.to_string()
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}
