use crate::geo::GeoPoint;

/// Mean Earth radius used for great-circle distances (meters).
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points on a spherical Earth (meters).
///
/// Uses the haversine formula, which stays well conditioned for the short
/// distances between a building and the scene reference point.
pub fn haversine_distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_MEAN_RADIUS_M * c
}
