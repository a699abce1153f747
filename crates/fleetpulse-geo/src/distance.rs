//! Great-circle distance.

/// Mean Earth radius used by the haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance in kilometres between two points given in decimal degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(haversine_km(48.8566, 2.3522, 48.8566, 2.3522), 0.0);
    }

    #[test]
    fn test_paris_to_lyon() {
        let km = haversine_km(48.8566, 2.3522, 45.7640, 4.8357);
        assert!((km - 392.0).abs() < 3.0, "got {km}");
    }

    #[test]
    fn test_symmetric() {
        let ab = haversine_km(48.0, 2.0, 48.1, 2.1);
        let ba = haversine_km(48.1, 2.1, 48.0, 2.0);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_antipodes() {
        let km = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((km - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }
}
