use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_372.795_477_598;

/// Great-circle distance in meters, rounded half-up to one decimal.
///
/// Uses the spherical law of cosines. Identical points short-circuit to 0.0 so
/// the arc-cosine never sees an argument pushed past 1.0 by rounding.
pub fn compute_distance(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (a.lng - b.lng).to_radians();

    let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlng.cos();
    let meters = EARTH_RADIUS_KM * cosine.clamp(-1.0, 1.0).acos() * 1000.0;
    round_one_decimal(meters)
}

/// Sum of the pairwise distances along a path, in meters.
pub fn path_distance_m(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|w| compute_distance(w[0], w[1])).sum()
}

fn round_one_decimal(value: f64) -> f64 {
    // f64::round rounds half away from zero, which is half-up for distances
    (value * 10.0).round() / 10.0
}
