//! Ordering for the incident list shown beside the map.

use incident_map_incident_models::IncidentPoint;

/// Incidents sorted newest first.
///
/// Missing or unparsable timestamps sort as the Unix epoch. Ties keep
/// their input order.
#[must_use]
pub fn newest_first(points: &[IncidentPoint]) -> Vec<&IncidentPoint> {
    let mut sorted: Vec<&IncidentPoint> = points.iter().collect();
    sorted.sort_by_key(|p| std::cmp::Reverse(sort_millis(p)));
    sorted
}

fn sort_millis(incident: &IncidentPoint) -> i64 {
    incident
        .occurred_at()
        .map_or(0, |dt| dt.and_utc().timestamp_millis())
}
