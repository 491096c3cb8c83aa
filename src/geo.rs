use crate::models::LatLon;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine, spherical Earth).
pub fn haversine_distance(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlon = (b.lon() - a.lon()).to_radians();

    let sin_dlat_half = (dlat / 2.0).sin();
    let sin_dlon_half = (dlon / 2.0).sin();
    let h = sin_dlat_half.mul_add(
        sin_dlat_half,
        lat1.cos() * lat2.cos() * sin_dlon_half * sin_dlon_half,
    );
    // clamp guards asin against h creeping past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Total length of a polyline in meters.
pub fn path_length(points: &[LatLon]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(w[0], w[1]))
        .sum()
}

/// Rough meters-to-degrees-of-latitude conversion, for drawing radii.
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / (EARTH_RADIUS_M.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_distance(LatLon(12.0, 34.0), LatLon(12.0, 34.0)), 0.0);
    }

    #[test]
    fn test_twenty_meter_boundary() {
        let d = haversine_distance(LatLon(0.0, 0.0), LatLon(0.0, 0.0001796631));
        assert!((d - 20.0).abs() < 0.05, "got {}", d);
    }

    #[test]
    fn test_known_offsets_on_equator() {
        let d = haversine_distance(LatLon(0.0, 0.0), LatLon(0.0, 0.0001));
        assert!((d - 11.12).abs() < 0.01, "got {}", d);
        let d = haversine_distance(LatLon(0.0, 0.0), LatLon(0.0, 0.0003));
        assert!((d - 33.36).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_path_length_sums_segments() {
        let pts = [LatLon(0.0, 0.0), LatLon(0.0, 0.0001), LatLon(0.0, 0.0002)];
        let total = path_length(&pts);
        assert!((total - 22.24).abs() < 0.01, "got {}", total);
        assert_eq!(path_length(&pts[..1]), 0.0);
    }

    #[test]
    fn test_meters_to_degrees() {
        assert!((meters_to_degrees(111_194.9) - 1.0).abs() < 1e-4);
    }
}
