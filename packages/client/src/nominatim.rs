//! Nominatim / OpenStreetMap address lookup.
//!
//! The public instance allows at most one request per second; callers
//! geocode one address at a time on user action.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use serde::Serialize;

use crate::{ClientError, retry};

/// Public Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedAddress {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Full matched address, if returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Geocodes a free-form address, keeping only the best match.
///
/// # Errors
///
/// Returns [`ClientError`] if the request or response parsing fails.
pub async fn geocode(
    client: &reqwest::Client,
    base_url: &str,
    address: &str,
) -> Result<Option<GeocodedAddress>, ClientError> {
    let body = retry::send_json(|| {
        client
            .get(base_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
    })
    .await?;

    parse_response(&body)
}

/// Parses a Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, ClientError> {
    let results = body.as_array().ok_or_else(|| ClientError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| ClientError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| ClientError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        display_name: first["display_name"].as_str().map(String::from),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_result() {
        let body = serde_json::json!([
            {"lat": "45.5088", "lon": "-73.5878", "display_name": "Mont Royal, Montréal"},
            {"lat": "0", "lon": "0"}
        ]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - 45.5088).abs() < 1e-9);
        assert!((result.longitude - -73.5878).abs() < 1e-9);
        assert_eq!(result.display_name.as_deref(), Some("Mont Royal, Montréal"));
    }

    #[test]
    fn empty_result_is_none() {
        assert!(parse_response(&serde_json::json!([])).unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_responses() {
        assert!(parse_response(&serde_json::json!({"error": "x"})).is_err());
        assert!(parse_response(&serde_json::json!([{"lat": 45.5, "lon": "-73.5"}])).is_err());
    }
}
