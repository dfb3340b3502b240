//! Grouping keys derived from rounded coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Decimal digits kept when grouping points (about 1.1 m at the equator).
pub const DEFAULT_KEY_PRECISION: u8 = 5;

/// Canonical `"lat,lng"` string of coordinates rounded to a fixed number
/// of decimal digits.
///
/// Two points share a key iff their rounded coordinates are bit-identical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeoKey(String);

impl GeoKey {
    /// Builds the key for `(lat, lng)` at `precision` decimal digits.
    #[must_use]
    pub fn new(lat: f64, lng: f64, precision: u8) -> Self {
        let factor = 10f64.powi(i32::from(precision));
        Self(format!(
            "{},{}",
            round_to(lat, factor),
            round_to(lng, factor)
        ))
    }

    /// Builds the key at [`DEFAULT_KEY_PRECISION`].
    #[must_use]
    pub fn at_default_precision(lat: f64, lng: f64) -> Self {
        Self::new(lat, lng, DEFAULT_KEY_PRECISION)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rounds half up (towards positive infinity) at `1 / factor` resolution.
///
/// Adding `0.0` folds `-0.0` into `0.0` so both format identically.
fn round_to(value: f64, factor: f64) -> f64 {
    (value * factor + 0.5).floor() / factor + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rounded_coordinates() {
        let key = GeoKey::at_default_precision(45.5017, -73.5673);
        assert_eq!(key.as_str(), "45.5017,-73.5673");
    }

    #[test]
    fn nearby_points_share_a_key() {
        let a = GeoKey::at_default_precision(45.501_700_1, -73.567_300_2);
        let b = GeoKey::at_default_precision(45.501_699_9, -73.567_299_8);
        assert_eq!(a, b);
    }

    #[test]
    fn points_a_unit_apart_differ() {
        let a = GeoKey::at_default_precision(45.50170, -73.56730);
        let b = GeoKey::at_default_precision(45.50171, -73.56730);
        assert_ne!(a, b);
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(GeoKey::new(0.5, -0.5, 0).as_str(), "1,0");
        assert_eq!(GeoKey::new(1.25, -1.25, 1).as_str(), "1.3,-1.2");
    }

    #[test]
    fn negative_zero_is_canonical() {
        assert_eq!(GeoKey::new(-0.000_001, 0.0, 5).as_str(), "0,0");
    }

    #[test]
    fn precision_controls_grouping() {
        let coarse_a = GeoKey::new(45.51, -73.50, 1);
        let coarse_b = GeoKey::new(45.53, -73.52, 1);
        assert_eq!(coarse_a, coarse_b);
        assert_ne!(GeoKey::new(45.51, -73.50, 5), GeoKey::new(45.53, -73.52, 5));
    }

    #[test]
    fn same_input_same_key() {
        let lat = 45.123_456_789;
        let lng = -73.987_654_321;
        assert_eq!(
            GeoKey::at_default_precision(lat, lng),
            GeoKey::at_default_precision(lat, lng)
        );
    }
}
