use super::{Vec2, haversine_distance_m};
use crate::geo::GeoPoint;

/// Projects `point` into planar meters relative to `reference`.
///
/// `x` is the great-circle distance along the reference latitude covering the
/// longitude delta, `y` the distance along the reference longitude covering the
/// latitude delta. Each axis is signed by whether the target coordinate is
/// greater than the reference's. This is a flat local approximation: exact at
/// the reference, increasingly skewed away from it, and not conformal.
pub fn to_local_meters(reference: GeoPoint, point: GeoPoint) -> Vec2 {
    let along_parallel = GeoPoint::new(point.longitude, reference.latitude);
    let along_meridian = GeoPoint::new(reference.longitude, point.latitude);

    let dx = haversine_distance_m(reference, along_parallel);
    let dy = haversine_distance_m(reference, along_meridian);

    Vec2::new(
        signed(dx, point.longitude, reference.longitude),
        signed(dy, point.latitude, reference.latitude),
    )
}

fn signed(distance: f64, target: f64, reference: f64) -> f64 {
    if target < reference { -distance } else { distance }
}
