//! Shared highlight between the incident list and the map.

use std::fmt;

use incident_map_incident_models::{DisplacedPoint, IncidentId, NumericId};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// How a marker is drawn.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Emphasis {
    /// Regular marker.
    #[default]
    Normal,
    /// The hovered incident.
    Highlighted,
}

impl Emphasis {
    /// Marker radius in pixels.
    #[must_use]
    pub const fn marker_radius(self) -> f64 {
        match self {
            Self::Normal => 5.0,
            Self::Highlighted => 12.0,
        }
    }
}

type Listener = Box<dyn Fn(Option<NumericId>) + Send + Sync>;

/// Holds the highlighted incident id and notifies listeners when it
/// changes.
///
/// Ids are compared numerically: integer ids and numeric strings match
/// each other, and a non-numeric id never matches anything.
#[derive(Default)]
pub struct HoverLink {
    highlighted: Option<NumericId>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for HoverLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoverLink")
            .field("highlighted", &self.highlighted)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HoverLink {
    /// Creates a link with nothing highlighted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The normalized highlighted id.
    #[must_use]
    pub const fn highlighted(&self) -> Option<NumericId> {
        self.highlighted
    }

    /// Highlights `id`, or clears the highlight when `None` or when the id
    /// is not numeric. Listeners run only if the value changed.
    pub fn set_highlighted(&mut self, id: Option<&IncidentId>) {
        let next = id.and_then(IncidentId::as_number);
        if next == self.highlighted {
            return;
        }

        log::trace!("Highlight changed from {:?} to {next:?}", self.highlighted);
        self.highlighted = next;
        for listener in &self.listeners {
            listener(next);
        }
    }

    /// Clears the highlight, as when the pointer leaves the list.
    pub fn clear(&mut self) {
        self.set_highlighted(None);
    }

    /// Registers a callback invoked with the new value on every change.
    pub fn on_highlight_change(
        &mut self,
        listener: impl Fn(Option<NumericId>) + Send + Sync + 'static,
    ) {
        self.listeners.push(Box::new(listener));
    }

    /// Whether `id` is the highlighted incident.
    #[must_use]
    pub fn is_highlighted(&self, id: &IncidentId) -> bool {
        match (self.highlighted, id.as_number()) {
            (Some(highlighted), Some(candidate)) => highlighted == candidate,
            _ => false,
        }
    }

    /// Emphasis for `id`.
    #[must_use]
    pub fn emphasis(&self, id: &IncidentId) -> Emphasis {
        if self.is_highlighted(id) {
            Emphasis::Highlighted
        } else {
            Emphasis::Normal
        }
    }

    /// Points in draw order: everything else first, highlighted last so
    /// it ends up on top. Relative order is otherwise preserved.
    #[must_use]
    pub fn draw_order<'a>(&self, points: &'a [DisplacedPoint]) -> Vec<(&'a DisplacedPoint, Emphasis)> {
        let (highlighted, normal): (Vec<_>, Vec<_>) = points
            .iter()
            .map(|p| (p, self.emphasis(&p.incident.id)))
            .partition(|(_, emphasis)| *emphasis == Emphasis::Highlighted);

        normal.into_iter().chain(highlighted).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use incident_map_incident_models::IncidentPoint;

    use super::*;

    fn displaced(id: impl Into<IncidentId>) -> DisplacedPoint {
        DisplacedPoint {
            incident: IncidentPoint::new(id, 45.5, -73.6),
            j_lat: 45.5,
            j_lng: -73.6,
            group_size: 1,
        }
    }

    #[test]
    fn string_and_integer_ids_match() {
        let mut link = HoverLink::new();
        link.set_highlighted(Some(&IncidentId::from("42")));
        assert!(link.is_highlighted(&IncidentId::Int(42)));
        assert!(!link.is_highlighted(&IncidentId::Int(41)));

        link.set_highlighted(Some(&IncidentId::Int(7)));
        assert!(link.is_highlighted(&IncidentId::from(" 7 ")));
    }

    #[test]
    fn ids_beyond_float_precision_do_not_collide() {
        let points = vec![
            displaced(9_007_199_254_740_992_i64),
            displaced(9_007_199_254_740_993_i64),
        ];
        let mut link = HoverLink::new();
        link.set_highlighted(Some(&IncidentId::Int(9_007_199_254_740_992)));

        assert!(!link.is_highlighted(&IncidentId::Int(9_007_199_254_740_993)));
        let highlighted: Vec<String> = link
            .draw_order(&points)
            .into_iter()
            .filter(|(_, e)| *e == Emphasis::Highlighted)
            .map(|(p, _)| p.incident.id.to_string())
            .collect();
        assert_eq!(highlighted, vec!["9007199254740992".to_string()]);
    }

    #[test]
    fn non_numeric_ids_are_unmatched() {
        let mut link = HoverLink::new();
        link.set_highlighted(Some(&IncidentId::from("abc")));
        assert_eq!(link.highlighted(), None);
        assert!(!link.is_highlighted(&IncidentId::from("abc")));
    }

    #[test]
    fn listeners_fire_only_on_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut link = HoverLink::new();
        let counter = Arc::clone(&calls);
        link.on_highlight_change(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        link.set_highlighted(Some(&IncidentId::Int(1)));
        link.set_highlighted(Some(&IncidentId::from("1")));
        link.set_highlighted(Some(&IncidentId::Int(2)));
        link.clear();
        link.clear();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn highlighted_point_is_drawn_last() {
        let points = vec![displaced(1), displaced(2), displaced(3)];
        let mut link = HoverLink::new();
        link.set_highlighted(Some(&IncidentId::from("2")));

        let order: Vec<(String, Emphasis)> = link
            .draw_order(&points)
            .into_iter()
            .map(|(p, e)| (p.incident.id.to_string(), e))
            .collect();

        assert_eq!(
            order,
            vec![
                ("1".to_string(), Emphasis::Normal),
                ("3".to_string(), Emphasis::Normal),
                ("2".to_string(), Emphasis::Highlighted),
            ]
        );
    }

    #[test]
    fn absent_highlight_keeps_order() {
        let points = vec![displaced(3), displaced(1)];
        let mut link = HoverLink::new();
        link.set_highlighted(Some(&IncidentId::Int(99)));
        let order: Vec<Emphasis> = link.draw_order(&points).into_iter().map(|(_, e)| e).collect();
        assert_eq!(order, vec![Emphasis::Normal, Emphasis::Normal]);
        assert!((Emphasis::Highlighted.marker_radius() - 12.0).abs() < f64::EPSILON);
    }
}
