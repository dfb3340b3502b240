#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP client for the incident map backend.
//!
//! [`ApiClient`] implements [`IncidentService`] over the backend's REST
//! API and adds the account operations the session never needs: saving
//! and clearing the home location, and geocoding an address through
//! Nominatim.

pub mod nominatim;
pub mod retry;
mod wire;

use std::time::Duration;

use async_trait::async_trait;
use incident_map_incident_models::{
    HomeProfile, IncidentPoint, PoliceStationPoint, clamp_radius,
};
use incident_map_session::{
    FetchError, IncidentService, LATEST_FETCH_LIMIT, NEAR_FETCH_LIMIT, NearQuery, SelectorConfig,
};

pub use nominatim::{DEFAULT_NOMINATIM_URL, GeocodedAddress};

/// Backend used when `INCIDENT_MAP_API_BASE` is not set.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("incident-map/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while talking to the backend or geocoder.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with an error status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The operation needs a bearer token and none is configured.
    #[error("no API token configured (set INCIDENT_MAP_TOKEN)")]
    MissingToken,

    /// The response did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The server kept rate limiting us.
    #[error("rate limited")]
    RateLimited,
}

impl From<ClientError> for FetchError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::MissingToken
            | ClientError::Status {
                status: 401 | 403, ..
            } => Self::Unauthenticated,
            ClientError::Json(_) | ClientError::Parse { .. } => Self::Decode {
                message: e.to_string(),
            },
            ClientError::Http(_) | ClientError::Status { .. } | ClientError::RateLimited => {
                Self::Transport {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Where to reach the backend and geocoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    pub api_base: String,
    /// Bearer token of the signed-in user.
    pub token: Option<String>,
    /// Nominatim search endpoint.
    pub nominatim_url: String,
    /// Feed size caps.
    pub limits: SelectorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            limits: SelectorConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from `INCIDENT_MAP_*` environment
    /// variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let limit = |key: &str, default: usize| {
            non_empty(key).map_or(default, |v| {
                v.trim().parse().unwrap_or_else(|_| {
                    log::warn!("Ignoring invalid {key}={v}; using {default}");
                    default
                })
            })
        };

        Self {
            api_base: non_empty("INCIDENT_MAP_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            token: non_empty("INCIDENT_MAP_TOKEN"),
            nominatim_url: non_empty("INCIDENT_MAP_NOMINATIM_URL")
                .unwrap_or_else(|| DEFAULT_NOMINATIM_URL.to_string()),
            limits: SelectorConfig {
                latest_limit: limit("INCIDENT_MAP_LATEST_LIMIT", LATEST_FETCH_LIMIT),
                near_limit: limit("INCIDENT_MAP_NEAR_LIMIT", NEAR_FETCH_LIMIT),
            },
        }
    }

    /// Whether a bearer token is configured.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Client for the incident map REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { http, config })
    }

    /// The configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    fn token(&self) -> Result<&str, ClientError> {
        self.config.token.as_deref().ok_or(ClientError::MissingToken)
    }

    /// `GET /api/incidents?limit=N`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or decoding fails.
    pub async fn incidents(&self, limit: usize) -> Result<Vec<IncidentPoint>, ClientError> {
        let url = self.url("/api/incidents");
        let limit = limit.to_string();
        let body =
            retry::send_json(|| self.http.get(&url).query(&[("limit", limit.as_str())])).await?;
        let data = wire::data_array(&body)?;
        Ok(data.iter().filter_map(wire::incident).collect())
    }

    /// `GET /api/pdq`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or decoding fails.
    pub async fn police_stations(&self) -> Result<Vec<PoliceStationPoint>, ClientError> {
        let url = self.url("/api/pdq");
        let body = retry::send_json(|| self.http.get(&url)).await?;
        Ok(wire::police_stations(wire::data_array(&body)?))
    }

    /// `GET /api/me`, reduced to the home profile.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingToken`] without a token, or another
    /// [`ClientError`] if the request or decoding fails.
    pub async fn home_profile(&self) -> Result<Option<HomeProfile>, ClientError> {
        let token = self.token()?;
        let url = self.url("/api/me");
        let body = retry::send_json(|| self.http.get(&url).bearer_auth(token)).await?;
        wire::home_profile(&body)
    }

    /// `GET /api/me/incidents?mode=home&limit=N&radiusM=R`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingToken`] without a token, or another
    /// [`ClientError`] if the request fails.
    pub async fn near_incidents(&self, query: &NearQuery) -> Result<Vec<IncidentPoint>, ClientError> {
        let token = self.token()?;
        let url = self.url("/api/me/incidents");
        let limit = query.limit.to_string();
        let radius = query.radius_m.round().to_string();
        let body = retry::send_json(|| {
            self.http.get(&url).bearer_auth(token).query(&[
                ("mode", "home"),
                ("limit", limit.as_str()),
                ("radiusM", radius.as_str()),
            ])
        })
        .await?;
        Ok(wire::incidents(&body["items"]))
    }

    /// Saves the home location (`PATCH /api/me/home`). The radius is
    /// clamped to the allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingToken`] without a token, or another
    /// [`ClientError`] if the request fails.
    pub async fn update_home(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: f64,
    ) -> Result<HomeProfile, ClientError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ClientError::Parse {
                message: format!("invalid home coordinates ({latitude}, {longitude})"),
            });
        }

        let profile = HomeProfile {
            home_lat: Some(latitude),
            home_lng: Some(longitude),
            home_radius_m: Some(clamp_radius(radius_m)),
        };
        self.patch_home(&profile).await?;
        log::info!("Saved home location at ({latitude}, {longitude})");
        Ok(profile)
    }

    /// Clears the home coordinates, keeping a clamped radius.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingToken`] without a token, or another
    /// [`ClientError`] if the request fails.
    pub async fn clear_home(&self, radius_m: f64) -> Result<HomeProfile, ClientError> {
        let profile = HomeProfile {
            home_lat: None,
            home_lng: None,
            home_radius_m: Some(clamp_radius(radius_m)),
        };
        self.patch_home(&profile).await?;
        log::info!("Cleared home location");
        Ok(profile)
    }

    async fn patch_home(&self, profile: &HomeProfile) -> Result<(), ClientError> {
        let token = self.token()?;
        let url = self.url("/api/me/home");
        retry::send_json(|| self.http.patch(&url).bearer_auth(token).json(profile)).await?;
        Ok(())
    }

    /// Geocodes a free-form address through the configured Nominatim
    /// endpoint. `Ok(None)` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request or decoding fails.
    pub async fn geocode_address(&self, address: &str) -> Result<Option<GeocodedAddress>, ClientError> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }
        nominatim::geocode(&self.http, &self.config.nominatim_url, address).await
    }
}

#[async_trait]
impl IncidentService for ApiClient {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<IncidentPoint>, FetchError> {
        Ok(self.incidents(limit).await?)
    }

    async fn fetch_police_stations(&self) -> Result<Vec<PoliceStationPoint>, FetchError> {
        Ok(self.police_stations().await?)
    }

    async fn fetch_home_profile(&self) -> Result<Option<HomeProfile>, FetchError> {
        Ok(self.home_profile().await?)
    }

    async fn fetch_near(&self, query: &NearQuery) -> Result<Vec<IncidentPoint>, FetchError> {
        Ok(self.near_incidents(query).await?)
    }
}
