use geo::{HaversineDistance, Point};

use crate::types::LocationFix;

/// Great-circle distance in meters between two WGS84 coordinates.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}

pub fn fix_distance(from: &LocationFix, to: &LocationFix) -> f64 {
    haversine_distance(from.latitude, from.longitude, to.latitude, to.longitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_distance(37.0, 127.0, 37.0, 127.0), 0.0);
    }

    #[test]
    fn test_small_latitude_step() {
        // 0.0001° of latitude is roughly 11.1 m anywhere on the globe
        let d = haversine_distance(37.0, 127.0, 37.0001, 127.0);
        assert_abs_diff_eq!(d, 11.12, epsilon = 0.05);
    }

    #[test]
    fn test_symmetric() {
        let a = haversine_distance(48.85, 2.35, 51.5, -0.12);
        let b = haversine_distance(51.5, -0.12, 48.85, 2.35);
        assert_abs_diff_eq!(a, b, epsilon = 1e-6);
        assert!(a > 300_000.0 && a < 360_000.0);
    }
}
