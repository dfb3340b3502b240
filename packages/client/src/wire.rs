//! Decoding of backend JSON payloads.
//!
//! Coordinates are coerced from numbers or numeric strings; anything else
//! becomes NaN and is dropped later by the coordinate sanitiser.

use incident_map_incident_models::{
    DatasetKind, HomeProfile, IncidentId, IncidentPoint, PoliceStationPoint, parse_numeric,
};
use serde_json::Value;

use crate::ClientError;

/// Returns the `data` array of a `{success, data}` envelope.
pub fn data_array(body: &Value) -> Result<&[Value], ClientError> {
    if body["success"] == Value::Bool(false) {
        log::warn!("Backend reported success=false");
    }

    body["data"]
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ClientError::Parse {
            message: "response has no data array".to_string(),
        })
}

/// Decodes incidents from a JSON array. Records without a usable id are
/// skipped; a non-array yields nothing.
pub fn incidents(items: &Value) -> Vec<IncidentPoint> {
    items
        .as_array()
        .map(|items| items.iter().filter_map(incident).collect())
        .unwrap_or_default()
}

/// Decodes one incident record.
pub fn incident(value: &Value) -> Option<IncidentPoint> {
    let Some(id) = incident_id(&value["id"]) else {
        log::debug!("Skipping incident without id: {value}");
        return None;
    };

    Some(IncidentPoint {
        id,
        latitude: coerce_f64(&value["latitude"]),
        longitude: coerce_f64(&value["longitude"]),
        category: value["category"].as_str().map(String::from),
        timestamp: value["date"].as_str().map(String::from),
        pdq_id: coerce_i64(&value["pdqId"]),
        source: DatasetKind::Latest,
    })
}

/// Decodes police stations from a JSON array.
pub fn police_stations(items: &[Value]) -> Vec<PoliceStationPoint> {
    items
        .iter()
        .filter_map(|value| {
            let Some(id) = coerce_i64(&value["id"]) else {
                log::debug!("Skipping police station without id: {value}");
                return None;
            };
            Some(PoliceStationPoint {
                id,
                name: value["name"].as_str().map(String::from),
                latitude: coerce_f64(&value["latitude"]),
                longitude: coerce_f64(&value["longitude"]),
            })
        })
        .collect()
}

/// Decodes the home profile from a `/api/me` response. `Ok(None)` when the
/// user has no profile row.
pub fn home_profile(body: &Value) -> Result<Option<HomeProfile>, ClientError> {
    let Some(user) = body.get("user").filter(|u| u.is_object()) else {
        return Err(ClientError::Parse {
            message: "response has no user".to_string(),
        });
    };

    let profile = &user["profile"];
    if !profile.is_object() {
        return Ok(None);
    }

    Ok(Some(HomeProfile {
        home_lat: coerce_optional_f64(&profile["homeLat"]),
        home_lng: coerce_optional_f64(&profile["homeLng"]),
        home_radius_m: coerce_optional_f64(&profile["homeRadiusM"]),
    }))
}

fn incident_id(value: &Value) -> Option<IncidentId> {
    match value {
        Value::Number(n) => Some(
            n.as_i64()
                .map_or_else(|| IncidentId::Text(n.to_string()), IncidentId::Int),
        ),
        Value::String(s) if !s.is_empty() => Some(IncidentId::Text(s.clone())),
        _ => None,
    }
}

fn coerce_f64(value: &Value) -> f64 {
    coerce_optional_f64(value).unwrap_or(f64::NAN)
}

fn coerce_optional_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => parse_numeric(s)
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64),
        _ => None,
    }
}
