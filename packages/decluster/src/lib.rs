#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic point de-overlap for the incident map.
//!
//! Many incidents share an address (or a police station's report point),
//! so plotting them as-is stacks markers on top of each other. The
//! declusterer groups points by their rounded coordinates and spreads each
//! multi-member group on a small ring around the shared position:
//!
//! - Singleton groups pass through untouched.
//! - Groups of `n >= 2` use a ring radius of `min(30, 12 + n)` meters.
//! - Each member's angle on the ring comes from a hash of its id, so the
//!   layout is identical across renders and reloads and does not depend
//!   on input order.

use std::collections::BTreeMap;
use std::f64::consts::TAU;

use incident_map_geo::{
    DEFAULT_KEY_PRECISION, GeoKey, great_circle_meters, hash_to_unit, meters_to_degrees,
};
use incident_map_incident_models::{DisplacedPoint, IncidentPoint};

/// Ring radius for the smallest overlapping group is this plus its size.
pub const BASE_RADIUS_M: f64 = 12.0;

/// Upper bound on the ring radius, whatever the group size.
pub const MAX_RADIUS_M: f64 = 30.0;

/// Ring radius in meters for a group of `group_size` co-located points.
///
/// Returns `0.0` for singletons.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn group_radius_m(group_size: usize) -> f64 {
    if group_size < 2 {
        return 0.0;
    }
    (BASE_RADIUS_M + group_size as f64).min(MAX_RADIUS_M)
}

/// Angle (radians) of a point on its group's ring, derived from its id.
#[must_use]
pub fn jitter_angle(incident: &IncidentPoint) -> f64 {
    hash_to_unit(&incident.id.to_string()) * TAU
}

/// Spreads co-located incidents so each one stays individually visible.
///
/// The output has exactly one entry per input point, in input order.
/// Callers are expected to have dropped points with non-finite
/// coordinates already.
#[must_use]
pub fn decluster(points: &[IncidentPoint]) -> Vec<DisplacedPoint> {
    let keys: Vec<GeoKey> = points
        .iter()
        .map(|p| GeoKey::new(p.latitude, p.longitude, DEFAULT_KEY_PRECISION))
        .collect();

    let mut group_sizes: BTreeMap<&GeoKey, usize> = BTreeMap::new();
    for key in &keys {
        *group_sizes.entry(key).or_default() += 1;
    }

    log::trace!(
        "Declustering {} points into {} groups",
        points.len(),
        group_sizes.len()
    );

    points
        .iter()
        .zip(&keys)
        .map(|(incident, key)| {
            let group_size = group_sizes.get(key).copied().unwrap_or(1);
            displace(incident, group_size)
        })
        .collect()
}

#[allow(clippy::suboptimal_flops)]
fn displace(incident: &IncidentPoint, group_size: usize) -> DisplacedPoint {
    if group_size < 2 {
        return DisplacedPoint {
            incident: incident.clone(),
            j_lat: incident.latitude,
            j_lng: incident.longitude,
            group_size: 1,
        };
    }

    let angle = jitter_angle(incident);
    let delta = meters_to_degrees(group_radius_m(group_size), incident.latitude);

    DisplacedPoint {
        incident: incident.clone(),
        j_lat: incident.latitude + angle.sin() * delta.lat_delta,
        j_lng: incident.longitude + angle.cos() * delta.lng_delta,
        group_size,
    }
}

/// Great-circle distance in meters between a point's original and
/// displayed positions.
#[must_use]
pub fn offset_m(point: &DisplacedPoint) -> f64 {
    great_circle_meters(
        (point.incident.latitude, point.incident.longitude),
        (point.j_lat, point.j_lng),
    )
}
