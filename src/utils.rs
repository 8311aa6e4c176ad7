use crate::config::constant::EARTH_RADIUS_KM;
use crate::domain::types::Location;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(from: Location, to: Location) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (to.lng - from.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boston_to_new_york() {
        let boston = Location::new(42.3601, -71.0589);
        let new_york = Location::new(40.7128, -74.0060);

        let km = haversine_km(boston, new_york);

        assert!((km - 306.0).abs() < 2.0, "{km}");
        assert!((haversine_km(new_york, boston) - km).abs() < 1e-9);
    }

    #[test]
    fn same_point_is_zero() {
        let point = Location::new(1.3521, 103.8198);
        assert_eq!(haversine_km(point, point), 0.0);
    }
}
