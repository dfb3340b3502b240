//! The data-acquisition collaborator.

use async_trait::async_trait;
use incident_map_incident_models::{HomeProfile, IncidentPoint, PoliceStationPoint};
use serde::{Deserialize, Serialize};

/// Failures reported by an [`IncidentService`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request needs a signed-in user and none is available.
    #[error("not authenticated")]
    Unauthenticated,

    /// The request could not be completed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of what went wrong.
        message: String,
    },

    /// The response arrived but could not be understood.
    #[error("decode error: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },
}

/// Parameters of a home-scoped incident fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearQuery {
    /// Home latitude.
    pub latitude: f64,
    /// Home longitude.
    pub longitude: f64,
    /// Search radius in meters.
    pub radius_m: f64,
    /// Maximum number of incidents to return.
    pub limit: usize,
}

/// Source of incidents, police stations and the user's home profile.
///
/// Implementations perform network I/O; the session only sees records.
#[async_trait]
pub trait IncidentService: Send + Sync {
    /// Fetches the most recent incidents, newest first, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails.
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<IncidentPoint>, FetchError>;

    /// Fetches every police station.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails.
    async fn fetch_police_stations(&self) -> Result<Vec<PoliceStationPoint>, FetchError>;

    /// Fetches the signed-in user's home profile. `Ok(None)` means the
    /// user has never saved one.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails.
    async fn fetch_home_profile(&self) -> Result<Option<HomeProfile>, FetchError>;

    /// Fetches incidents within the query's radius of home.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails.
    async fn fetch_near(&self, query: &NearQuery) -> Result<Vec<IncidentPoint>, FetchError>;
}
