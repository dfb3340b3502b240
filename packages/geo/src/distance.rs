//! Conversion between meters and degrees of latitude/longitude.

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// Floor applied to `|cos(latitude)|` so longitude deltas stay finite at
/// the poles.
const MIN_COS_LATITUDE: f64 = 1e-6;

/// A latitude/longitude offset in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeDelta {
    /// Degrees of latitude.
    pub lat_delta: f64,
    /// Degrees of longitude.
    pub lng_delta: f64,
}

/// Converts a linear offset in meters to degree deltas at the given
/// latitude.
#[must_use]
pub fn meters_to_degrees(meters: f64, at_latitude: f64) -> DegreeDelta {
    let cos = at_latitude.to_radians().cos();
    let cos = if cos.abs() < MIN_COS_LATITUDE {
        MIN_COS_LATITUDE.copysign(cos)
    } else {
        cos
    };

    DegreeDelta {
        lat_delta: meters / METERS_PER_DEGREE,
        lng_delta: meters / (METERS_PER_DEGREE * cos),
    }
}

/// Haversine distance in meters between two `(lat, lng)` points.
#[must_use]
pub fn great_circle_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lng2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_M * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn equator_has_equal_deltas() {
        let delta = meters_to_degrees(111_320.0, 0.0);
        assert_close(delta.lat_delta, 1.0, 1e-12);
        assert_close(delta.lng_delta, 1.0, 1e-12);
    }

    #[test]
    fn longitude_widens_with_latitude() {
        let delta = meters_to_degrees(14.0, 45.5017);
        assert_close(delta.lat_delta, 14.0 / 111_320.0, 1e-15);
        assert!(delta.lng_delta > delta.lat_delta);
        assert_close(delta.lng_delta, delta.lat_delta / 45.5017_f64.to_radians().cos(), 1e-15);
    }

    #[test]
    fn poles_stay_finite() {
        for lat in [90.0, -90.0, 89.999_999_9] {
            let delta = meters_to_degrees(30.0, lat);
            assert!(delta.lng_delta.is_finite(), "lat {lat}");
            assert!(delta.lng_delta.abs() > 0.0);
        }
    }

    #[test]
    fn zero_meters_is_zero_delta() {
        let delta = meters_to_degrees(0.0, 45.0);
        assert_close(delta.lat_delta, 0.0, 0.0);
        assert_close(delta.lng_delta, 0.0, 0.0);
    }

    #[test]
    fn great_circle_of_one_degree_latitude() {
        let d = great_circle_meters((45.0, -73.0), (46.0, -73.0));
        assert_close(d, 111_195.0, 5.0);
        assert_close(great_circle_meters((45.0, -73.0), (45.0, -73.0)), 0.0, 0.0);
    }
}
