//! Proximity check for location subquests.

use geo::Point;

use crate::models::Coordinate;

/// Canonical tolerance radius for location proofs.
pub const DEFAULT_TOLERANCE_METERS: f64 = 50.0;

/// Sphere radius used for all distance checks.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Float rounding allowance when comparing against the tolerance.
const BOUNDARY_SLACK_METERS: f64 = 1e-6;

/// Great-circle distance in meters, or `None` for invalid coordinates.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> Option<f64> {
    if !a.is_valid() || !b.is_valid() {
        return None;
    }
    let d = haversine(Point::from(a), Point::from(b));
    d.is_finite().then_some(d)
}

fn haversine(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lat2) = (a.y().to_radians(), b.y().to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Whether `user` is within `tolerance_meters` of `target` (inclusive).
///
/// Invalid coordinates or a negative/NaN tolerance never pass.
pub fn verify(user: Coordinate, target: Coordinate, tolerance_meters: f64) -> bool {
    if tolerance_meters.is_nan() || tolerance_meters < 0.0 {
        return false;
    }
    distance_meters(user, target).is_some_and(|d| d <= tolerance_meters + BOUNDARY_SLACK_METERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Willis Tower and The Bean, Chicago
    const WILLIS: Coordinate = Coordinate {
        latitude: 41.8789,
        longitude: -87.6359,
    };
    const BEAN: Coordinate = Coordinate {
        latitude: 41.8827,
        longitude: -87.6233,
    };

    #[test]
    fn test_identical_points_pass_any_tolerance() {
        assert!(verify(WILLIS, WILLIS, 0.0));
        assert!(verify(WILLIS, WILLIS, DEFAULT_TOLERANCE_METERS));
    }

    #[test]
    fn test_distance_is_plausible() {
        let d = distance_meters(WILLIS, BEAN).unwrap();
        assert!((1_000.0..1_200.0).contains(&d), "distance was {}", d);
        assert!(!verify(WILLIS, BEAN, DEFAULT_TOLERANCE_METERS));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let d = distance_meters(WILLIS, BEAN).unwrap();
        assert!(verify(WILLIS, BEAN, d));
        assert!(!verify(WILLIS, BEAN, d - 0.01));
    }

    #[test]
    fn test_points_exactly_tolerance_apart_pass() {
        // 50 m due north along a meridian
        let origin = Coordinate::new(0.0, 0.0);
        let dlat = (DEFAULT_TOLERANCE_METERS / EARTH_RADIUS_METERS).to_degrees();
        let north = Coordinate::new(dlat, 0.0);

        let d = distance_meters(origin, north).unwrap();
        assert!((d - DEFAULT_TOLERANCE_METERS).abs() < 1e-6, "distance was {}", d);
        assert!(verify(origin, north, DEFAULT_TOLERANCE_METERS));
        assert!(verify(north, origin, DEFAULT_TOLERANCE_METERS));
        assert!(!verify(origin, north, DEFAULT_TOLERANCE_METERS - 0.001));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = distance_meters(Coordinate::new(0.0, 10.0), Coordinate::new(1.0, 10.0)).unwrap();
        let expected = EARTH_RADIUS_METERS * 1.0_f64.to_radians();
        assert!((d - expected).abs() < 1e-6, "distance was {}", d);
    }

    #[test]
    fn test_nan_never_passes() {
        let bad = Coordinate::new(f64::NAN, -87.6);
        assert!(!verify(bad, WILLIS, 1e9));
        assert!(!verify(WILLIS, bad, 1e9));
        assert!(!verify(WILLIS, WILLIS, f64::NAN));
        assert!(!verify(WILLIS, WILLIS, -1.0));
    }

    #[test]
    fn test_out_of_range_degrees_never_pass() {
        let bad = Coordinate::new(91.0, 0.0);
        assert!(!verify(bad, bad, 1e9));
    }
}
