#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident, police station and home profile types.
//!
//! These are the records handed to the core by the data-fetch layer. They
//! are treated as read-only: every stage of the rendering pipeline
//! (filtering, declustering, highlighting) produces new derived
//! collections instead of mutating them in place.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Category shown for incidents that arrive without one.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Radius used when a home profile has coordinates but no radius.
pub const DEFAULT_HOME_RADIUS_M: f64 = 400.0;

/// Smallest radius a user may save for their home location.
pub const MIN_HOME_RADIUS_M: f64 = 50.0;

/// Largest radius a user may save for their home location.
pub const MAX_HOME_RADIUS_M: f64 = 5000.0;

/// Which upstream collection a record (or the map) comes from.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DatasetKind {
    /// The unscoped, globally visible feed.
    #[default]
    Latest,
    /// Incidents scoped to the signed-in user's home location.
    Near,
}

/// Identity of an incident. The backend sends either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncidentId {
    /// Numeric identifier.
    Int(i64),
    /// Opaque string identifier.
    Text(String),
}

impl IncidentId {
    /// Returns the numeric value of this id, if it has one.
    ///
    /// Strings count as numeric when they parse to a finite number after
    /// trimming. Empty strings never do. Integral values stay exact
    /// integers, so `"42"`, `"42.0"` and `42` all yield the same key.
    #[must_use]
    pub fn as_number(&self) -> Option<NumericId> {
        match self {
            Self::Int(value) => Some(NumericId::Int(*value)),
            Self::Text(text) => {
                let trimmed = text.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .map(NumericId::Int)
                    .or_else(|| parse_numeric(trimmed).map(NumericId::from_finite))
            }
        }
    }
}

/// Numeric form of an [`IncidentId`], used to match ids across sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NumericId {
    /// An integral id, compared exactly.
    Int(i64),
    /// A non-integral (or out of `i64` range) id.
    Float(f64),
}

impl NumericId {
    /// Upper bound (exclusive) of the `i64` range as an `f64`.
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

    #[allow(clippy::cast_possible_truncation)]
    fn from_finite(value: f64) -> Self {
        if value.fract() == 0.0 && value >= -Self::I64_BOUND && value < Self::I64_BOUND {
            Self::Int(value as i64)
        } else {
            Self::Float(value)
        }
    }
}

impl fmt::Display for NumericId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<i64> for IncidentId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for IncidentId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for IncidentId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for IncidentId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Parses a numeric-looking string into a finite `f64`.
#[must_use]
pub fn parse_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A point whose latitude or longitude is not a finite number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinate for {id}: ({latitude}, {longitude})")]
pub struct InvalidCoordinate {
    /// Identity of the offending record.
    pub id: String,
    /// Latitude as received.
    pub latitude: f64,
    /// Longitude as received.
    pub longitude: f64,
}

/// A geolocated incident report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPoint {
    /// Unique within a dataset.
    pub id: IncidentId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Crime category label, if the source provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// When the incident occurred (ISO-8601, as sent by the backend).
    #[serde(default, rename = "date", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Police station (PDQ) the report is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdq_id: Option<i64>,
    /// Dataset this record was fetched for.
    #[serde(default)]
    pub source: DatasetKind,
}

impl IncidentPoint {
    /// Creates an incident with no category, timestamp or station.
    #[must_use]
    pub fn new(id: impl Into<IncidentId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            category: None,
            timestamp: None,
            pdq_id: None,
            source: DatasetKind::Latest,
        }
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the raw timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Category label, defaulting to [`UNKNOWN_CATEGORY`].
    #[must_use]
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Parsed occurrence time, `None` when missing or unparsable.
    #[must_use]
    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    /// Checks that both coordinates are finite.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinate`] if either coordinate is NaN or infinite.
    pub fn validate(&self) -> Result<(), InvalidCoordinate> {
        if self.latitude.is_finite() && self.longitude.is_finite() {
            Ok(())
        } else {
            Err(InvalidCoordinate {
                id: self.id.to_string(),
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Parses an incident timestamp.
///
/// Accepts RFC 3339 and other zoned ISO-8601 forms (minute precision,
/// `+hhmm` or `+hh` offsets, a space separator), normalized to UTC. Naive
/// date-times with `T` or a space separator and bare dates (midnight) are
/// taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y-%m-%dT%H:%M%#z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_utc());
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Drops incidents with non-finite coordinates and tags the survivors with
/// the dataset they were fetched for.
#[must_use]
pub fn sanitize_incidents(raw: Vec<IncidentPoint>, source: DatasetKind) -> Vec<IncidentPoint> {
    let total = raw.len();
    let kept: Vec<IncidentPoint> = raw
        .into_iter()
        .filter_map(|mut incident| match incident.validate() {
            Ok(()) => {
                incident.source = source;
                Some(incident)
            }
            Err(e) => {
                log::debug!("Dropping incident: {e}");
                None
            }
        })
        .collect();

    if kept.len() < total {
        log::warn!(
            "Dropped {} of {total} {source} incidents with invalid coordinates",
            total - kept.len()
        );
    }

    kept
}

/// A police station (PDQ) marker. Never jittered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliceStationPoint {
    /// Station number.
    pub id: i64,
    /// Display name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

/// Drops police stations with non-finite coordinates.
#[must_use]
pub fn sanitize_police_stations(raw: Vec<PoliceStationPoint>) -> Vec<PoliceStationPoint> {
    let total = raw.len();
    let kept: Vec<PoliceStationPoint> = raw
        .into_iter()
        .filter(|p| p.latitude.is_finite() && p.longitude.is_finite())
        .collect();
    if kept.len() < total {
        log::warn!(
            "Dropped {} of {total} police stations with invalid coordinates",
            total - kept.len()
        );
    }
    kept
}

/// A user's saved "near you" configuration. Every field is nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeProfile {
    /// Home latitude.
    #[serde(default)]
    pub home_lat: Option<f64>,
    /// Home longitude.
    #[serde(default)]
    pub home_lng: Option<f64>,
    /// Radius around home, in meters.
    #[serde(default)]
    pub home_radius_m: Option<f64>,
}

impl HomeProfile {
    /// Resolves the usable home location.
    ///
    /// Only returns a location when both coordinates are present and
    /// finite. A missing or non-finite radius falls back to
    /// [`DEFAULT_HOME_RADIUS_M`].
    #[must_use]
    pub fn location(&self) -> Option<HomeLocation> {
        let latitude = self.home_lat.filter(|v| v.is_finite())?;
        let longitude = self.home_lng.filter(|v| v.is_finite())?;
        let radius_m = self
            .home_radius_m
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_HOME_RADIUS_M);

        Some(HomeLocation {
            latitude,
            longitude,
            radius_m,
        })
    }

    /// Whether the profile describes a usable home location.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.location().is_some()
    }
}

/// A resolved home location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeLocation {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Radius in meters.
    pub radius_m: f64,
}

impl HomeLocation {
    /// The "near you" circle to draw, if the radius is positive.
    #[must_use]
    pub fn circle(&self) -> Option<HomeCircle> {
        (self.radius_m.is_finite() && self.radius_m > 0.0).then_some(HomeCircle {
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius_m,
        })
    }
}

/// A circle overlay centred on the user's home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeCircle {
    /// Centre latitude.
    pub latitude: f64,
    /// Centre longitude.
    pub longitude: f64,
    /// Radius in meters.
    pub radius_m: f64,
}

/// Clamps a user-entered radius to the allowed range.
///
/// Non-finite input falls back to [`DEFAULT_HOME_RADIUS_M`].
#[must_use]
pub fn clamp_radius(radius_m: f64) -> f64 {
    if !radius_m.is_finite() {
        return DEFAULT_HOME_RADIUS_M;
    }
    radius_m.clamp(MIN_HOME_RADIUS_M, MAX_HOME_RADIUS_M)
}

/// An incident placed for display.
///
/// Recomputed on every input or filter change and owned by the rendering
/// pass that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplacedPoint {
    /// The original record, with its original coordinates.
    #[serde(flatten)]
    pub incident: IncidentPoint,
    /// Displayed latitude.
    pub j_lat: f64,
    /// Displayed longitude.
    pub j_lng: f64,
    /// Number of incidents sharing this point's rounded coordinates.
    pub group_size: usize,
}

impl DisplacedPoint {
    /// Whether the point was moved away from its original position.
    #[must_use]
    pub fn is_displaced(&self) -> bool {
        self.group_size > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_id_accepts_numbers_and_strings() {
        let ids: Vec<IncidentId> = serde_json::from_str(r#"[42, "abc", "17"]"#).unwrap();
        assert_eq!(ids[0], IncidentId::Int(42));
        assert_eq!(ids[1], IncidentId::Text("abc".to_string()));
        assert_eq!(ids[2].as_number(), Some(NumericId::Int(17)));
        assert_eq!(ids[1].as_number(), None);
        assert_eq!(IncidentId::from("  ").as_number(), None);
        assert_eq!(IncidentId::from("17.0").as_number(), Some(NumericId::Int(17)));
        assert_eq!(IncidentId::from("1.5").as_number(), Some(NumericId::Float(1.5)));
    }

    #[test]
    fn large_integer_ids_stay_distinct() {
        let low = IncidentId::Int(9_007_199_254_740_992).as_number();
        let high = IncidentId::Int(9_007_199_254_740_993).as_number();
        assert_ne!(low, high);
        assert_eq!(IncidentId::from("9007199254740993").as_number(), high);
        assert_eq!(IncidentId::Int(i64::MIN).as_number(), Some(NumericId::Int(i64::MIN)));
    }

    #[test]
    fn incident_id_display_matches_raw_form() {
        assert_eq!(IncidentId::Int(-7).to_string(), "-7");
        assert_eq!(IncidentId::from("x-1").to_string(), "x-1");
    }

    #[test]
    fn category_defaults_to_unknown() {
        let incident = IncidentPoint::new(1, 45.5, -73.6);
        assert_eq!(incident.category(), UNKNOWN_CATEGORY);
        assert_eq!(incident.with_category("Vol").category(), "Vol");
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        let cases = [
            "2024-03-05T12:30:00Z",
            "2024-03-05T12:30:00.000Z",
            "2024-03-05T08:30:00-04:00",
            "2024-03-05T12:30:00",
            "2024-03-05 12:30:00",
            "2024-03-05T12:30Z",
            "2024-03-05T12:30:00+0000",
            "2024-03-05 12:30:00+00",
            "2024-03-05T13:30:00.000+0100",
            "2024-03-05T07:30-05:00",
        ];
        for case in cases {
            let parsed = parse_timestamp(case).unwrap();
            assert_eq!(parsed.to_string(), "2024-03-05 12:30:00", "{case}");
        }
        assert_eq!(
            parse_timestamp("2024-03-05").unwrap().to_string(),
            "2024-03-05 00:00:00"
        );
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn deserializes_backend_incident() {
        let incident: IncidentPoint = serde_json::from_value(serde_json::json!({
            "id": "12",
            "latitude": 45.5,
            "longitude": -73.6,
            "category": "Méfait",
            "date": "2023-11-02",
            "pdqId": 21
        }))
        .unwrap();
        assert_eq!(incident.id, IncidentId::Text("12".to_string()));
        assert_eq!(incident.pdq_id, Some(21));
        assert_eq!(incident.source, DatasetKind::Latest);
        assert!(incident.occurred_at().is_some());
    }

    #[test]
    fn sanitize_drops_non_finite_and_tags_source() {
        let raw = vec![
            IncidentPoint::new(1, 45.5, -73.6),
            IncidentPoint::new(2, f64::NAN, -73.6),
            IncidentPoint::new(3, 45.5, f64::INFINITY),
        ];
        let kept = sanitize_incidents(raw, DatasetKind::Near);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, IncidentId::Int(1));
        assert_eq!(kept[0].source, DatasetKind::Near);
    }

    #[test]
    fn validate_reports_offending_id() {
        let err = IncidentPoint::new("a", f64::NAN, 0.0).validate().unwrap_err();
        assert_eq!(err.id, "a");
    }

    #[test]
    fn home_profile_requires_both_coordinates() {
        let missing_lat = HomeProfile {
            home_lat: None,
            home_lng: Some(-73.6),
            home_radius_m: Some(500.0),
        };
        assert!(!missing_lat.is_set());

        let nan_lng = HomeProfile {
            home_lat: Some(45.5),
            home_lng: Some(f64::NAN),
            home_radius_m: None,
        };
        assert!(nan_lng.location().is_none());
    }

    #[test]
    fn home_profile_radius_defaults() {
        let profile = HomeProfile {
            home_lat: Some(45.5),
            home_lng: Some(-73.6),
            home_radius_m: None,
        };
        let location = profile.location().unwrap();
        assert!((location.radius_m - DEFAULT_HOME_RADIUS_M).abs() < f64::EPSILON);
        assert!(location.circle().is_some());
    }

    #[test]
    fn zero_radius_has_no_circle() {
        let location = HomeLocation {
            latitude: 45.5,
            longitude: -73.6,
            radius_m: 0.0,
        };
        assert!(location.circle().is_none());
    }

    #[test]
    fn home_profile_deserializes_nulls() {
        let profile: HomeProfile = serde_json::from_value(serde_json::json!({
            "id": 3,
            "homeLat": null,
            "homeLng": -73.6,
            "homeRadiusM": null
        }))
        .unwrap();
        assert_eq!(profile.home_lat, None);
        assert!(!profile.is_set());
    }

    #[test]
    fn clamp_radius_bounds() {
        assert!((clamp_radius(10.0) - MIN_HOME_RADIUS_M).abs() < f64::EPSILON);
        assert!((clamp_radius(9000.0) - MAX_HOME_RADIUS_M).abs() < f64::EPSILON);
        assert!((clamp_radius(f64::NAN) - DEFAULT_HOME_RADIUS_M).abs() < f64::EPSILON);
        assert!((clamp_radius(750.0) - 750.0).abs() < f64::EPSILON);
    }

    #[test]
    fn displaced_point_serializes_flat() {
        let point = DisplacedPoint {
            incident: IncidentPoint::new(1, 45.5, -73.6),
            j_lat: 45.6,
            j_lng: -73.7,
            group_size: 2,
        };
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["groupSize"], 2);
        assert_eq!(value["jLat"], 45.6);
        assert!(point.is_displaced());
    }

    #[test]
    fn dataset_kind_round_trips_through_strings() {
        assert_eq!(DatasetKind::Near.to_string(), "near");
        assert_eq!("latest".parse::<DatasetKind>().unwrap(), DatasetKind::Latest);
    }
}
