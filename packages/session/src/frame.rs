//! Assembly of everything the map draws in one pass.

use incident_map_decluster::{decluster, offset_m};
use incident_map_filter::{FilterState, apply_filters};
use incident_map_incident_models::{
    DatasetKind, DisplacedPoint, HomeCircle, HomeLocation, PoliceStationPoint,
};
use serde::Serialize;

use crate::{
    DatasetSelector,
    hover::{Emphasis, HoverLink},
};

/// Police station marker radius in pixels.
pub const STATION_MARKER_RADIUS: f64 = 7.0;

/// Layer toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Draw the police station layer.
    pub show_police_stations: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            show_police_stations: true,
        }
    }
}

/// An incident marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// The placed incident.
    #[serde(flatten)]
    pub point: DisplacedPoint,
    /// How to draw it.
    pub emphasis: Emphasis,
    /// Radius in pixels.
    pub radius: f64,
    /// Distance in meters between the original and displayed positions.
    pub offset_m: f64,
}

/// A police station marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationMarker {
    /// The station.
    #[serde(flatten)]
    pub station: PoliceStationPoint,
    /// Radius in pixels.
    pub radius: f64,
}

/// Counts shown next to the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSummary {
    /// Incidents in the active dataset.
    pub active: usize,
    /// Incidents left after filtering.
    pub filtered: usize,
    /// Filtered incidents moved off their original position.
    pub displaced: usize,
    /// Police station markers drawn.
    pub stations: usize,
}

/// Everything needed to draw the map once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    /// Dataset the markers come from.
    pub dataset: DatasetKind,
    /// Whether the selected dataset is still loading.
    pub loading: bool,
    /// Message for the user about the selected dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    /// Incident markers in draw order.
    pub markers: Vec<Marker>,
    /// Police station markers.
    pub police_stations: Vec<StationMarker>,
    /// Home radius overlay, drawn with the near dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_circle: Option<HomeCircle>,
    /// Counts.
    pub summary: FrameSummary,
}

/// Builds a frame from the current state.
///
/// Runs the active dataset through `filters`, declusters the result and
/// orders it so the highlighted marker is drawn last. Nothing is cached;
/// call again after any state change.
#[must_use]
pub fn build_frame(
    selector: &DatasetSelector,
    filters: &FilterState,
    hover: &HoverLink,
    options: FrameOptions,
) -> RenderFrame {
    let dataset = selector.effective();
    let active = selector.active_incidents();
    let filtered = apply_filters(active, filters);
    let displaced = decluster(&filtered);

    let markers: Vec<Marker> = hover
        .draw_order(&displaced)
        .into_iter()
        .map(|(point, emphasis)| Marker {
            point: point.clone(),
            emphasis,
            radius: emphasis.marker_radius(),
            offset_m: offset_m(point),
        })
        .collect();

    let police_stations: Vec<StationMarker> = if options.show_police_stations {
        selector
            .police_stations()
            .iter()
            .map(|station| StationMarker {
                station: station.clone(),
                radius: STATION_MARKER_RADIUS,
            })
            .collect()
    } else {
        Vec::new()
    };

    let home_circle = if dataset == DatasetKind::Near {
        selector.home().and_then(HomeLocation::circle)
    } else {
        None
    };

    let notice = match selector.selected() {
        DatasetKind::Near => selector.near_condition().map(ToString::to_string),
        DatasetKind::Latest => selector.latest_error().map(String::from),
    };

    let summary = FrameSummary {
        active: active.len(),
        filtered: filtered.len(),
        displaced: displaced.iter().filter(|p| p.is_displaced()).count(),
        stations: police_stations.len(),
    };

    RenderFrame {
        dataset,
        loading: selector.is_loading(selector.selected()),
        notice,
        markers,
        police_stations,
        home_circle,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use incident_map_filter::ALL_MONTHS;
    use incident_map_incident_models::{HomeProfile, IncidentId, IncidentPoint};

    use super::*;
    use crate::LatestSnapshot;

    fn loaded_selector() -> DatasetSelector {
        let mut selector = DatasetSelector::default();
        let ticket = selector.begin_latest_load();
        selector
            .commit_latest(
                ticket,
                LatestSnapshot {
                    incidents: vec![
                        IncidentPoint::new("1", 45.5017, -73.5673)
                            .with_category("Vol")
                            .with_timestamp("2024-04-01"),
                        IncidentPoint::new("2", 45.5017, -73.5673)
                            .with_category("Vol")
                            .with_timestamp("2024-04-02"),
                        IncidentPoint::new("3", 45.51, -73.50)
                            .with_category("Vol")
                            .with_timestamp("2024-04-03"),
                    ],
                    police_stations: vec![PoliceStationPoint {
                        id: 38,
                        name: None,
                        latitude: 45.52,
                        longitude: -73.58,
                    }],
                },
            )
            .unwrap();
        selector
    }

    fn everything(selector: &DatasetSelector) -> FilterState {
        FilterState::select_all(selector.vocabulary())
    }

    #[test]
    fn frame_declusters_filtered_incidents() {
        let selector = loaded_selector();
        let frame = build_frame(
            &selector,
            &everything(&selector),
            &HoverLink::new(),
            FrameOptions::default(),
        );

        assert_eq!(frame.dataset, DatasetKind::Latest);
        assert_eq!(frame.markers.len(), 3);
        assert_eq!(
            frame.summary,
            FrameSummary {
                active: 3,
                filtered: 3,
                displaced: 2,
                stations: 1,
            }
        );
        assert!(frame.home_circle.is_none());
        assert!(frame.notice.is_none());

        for marker in &frame.markers {
            if marker.point.is_displaced() {
                assert!((marker.offset_m - 14.0).abs() < 0.1, "{}", marker.offset_m);
            } else {
                assert!(marker.offset_m.abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn empty_filter_draws_no_incidents() {
        let selector = loaded_selector();
        let filters = FilterState::new([2024], ALL_MONTHS, Vec::<String>::new());
        let frame = build_frame(&selector, &filters, &HoverLink::new(), FrameOptions::default());
        assert!(frame.markers.is_empty());
        assert_eq!(frame.summary.active, 3);
        assert_eq!(frame.summary.filtered, 0);
    }

    #[test]
    fn highlighted_marker_is_last_and_larger() {
        let selector = loaded_selector();
        let mut hover = HoverLink::new();
        hover.set_highlighted(Some(&IncidentId::Int(1)));

        let frame = build_frame(&selector, &everything(&selector), &hover, FrameOptions::default());

        let last = frame.markers.last().unwrap();
        assert_eq!(last.point.incident.id, IncidentId::from("1"));
        assert_eq!(last.emphasis, Emphasis::Highlighted);
        assert!((last.radius - 12.0).abs() < f64::EPSILON);
        assert_eq!(
            frame
                .markers
                .iter()
                .filter(|m| m.emphasis == Emphasis::Highlighted)
                .count(),
            1
        );
    }

    #[test]
    fn station_layer_can_be_hidden() {
        let selector = loaded_selector();
        let frame = build_frame(
            &selector,
            &everything(&selector),
            &HoverLink::new(),
            FrameOptions {
                show_police_stations: false,
            },
        );
        assert!(frame.police_stations.is_empty());
        assert_eq!(frame.summary.stations, 0);
    }

    #[test]
    fn near_frame_carries_home_circle() {
        let mut selector = loaded_selector();
        selector.set_authenticated(true);
        let ticket = selector.select_near().unwrap();
        selector
            .commit_profile(
                ticket,
                Some(HomeProfile {
                    home_lat: Some(45.52),
                    home_lng: Some(-73.58),
                    home_radius_m: Some(600.0),
                }),
            )
            .unwrap();
        selector
            .commit_near(
                ticket,
                vec![
                    IncidentPoint::new(20, 45.521, -73.581)
                        .with_category("Vol")
                        .with_timestamp("2024-04-05"),
                ],
            )
            .unwrap();

        let frame = build_frame(
            &selector,
            &everything(&selector),
            &HoverLink::new(),
            FrameOptions::default(),
        );

        assert_eq!(frame.dataset, DatasetKind::Near);
        assert_eq!(frame.markers.len(), 1);
        let circle = frame.home_circle.unwrap();
        assert!((circle.radius_m - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unset_home_shows_latest_with_notice() {
        let mut selector = loaded_selector();
        selector.set_authenticated(true);
        let ticket = selector.select_near().unwrap();
        let _ = selector.commit_profile(ticket, None);

        let frame = build_frame(
            &selector,
            &everything(&selector),
            &HoverLink::new(),
            FrameOptions::default(),
        );

        assert_eq!(frame.dataset, DatasetKind::Latest);
        assert_eq!(frame.markers.len(), 3);
        assert!(frame.home_circle.is_none());
        assert!(frame.notice.unwrap().contains("Home location not set"));
    }

    #[test]
    fn serializes_flattened_markers() {
        let selector = loaded_selector();
        let frame = build_frame(
            &selector,
            &everything(&selector),
            &HoverLink::new(),
            FrameOptions::default(),
        );
        let value = serde_json::to_value(&frame).unwrap();
        let marker = &value["markers"][0];
        assert!(marker["jLat"].is_f64());
        assert!(marker["latitude"].is_f64());
        assert_eq!(marker["emphasis"], "normal");
        assert_eq!(value["dataset"], "latest");
        assert_eq!(value["policeStations"][0]["id"], 38);
    }
}
