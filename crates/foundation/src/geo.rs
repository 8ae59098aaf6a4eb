//! Geographic primitives shared by every crate.

use serde::{Deserialize, Serialize};

/// WGS84 longitude/latitude in degrees.
///
/// Serialized as a GeoJSON position (`[lng, lat]`); extra ordinates such as an
/// altitude are accepted on input and dropped.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Longitude in [-180, 180] and latitude in [-90, 90].
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl TryFrom<Vec<f64>> for GeoPoint {
    type Error = String;

    fn try_from(position: Vec<f64>) -> Result<Self, Self::Error> {
        match position.as_slice() {
            [lng, lat, ..] => Ok(Self::new(*lng, *lat)),
            _ => Err(format!(
                "position needs at least 2 ordinates, got {}",
                position.len()
            )),
        }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> Self {
        [p.longitude, p.latitude]
    }
}

/// Ordered ring of vertices outlining a footprint.
///
/// The ring may or may not repeat its first vertex at the end; consumers close
/// the path themselves. Validation (at least three vertices) happens when the
/// ring is turned into geometry, not here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    ring: Vec<GeoPoint>,
}

impl Polygon {
    pub fn new(ring: Vec<GeoPoint>) -> Self {
        Self { ring }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.ring
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Arithmetic mean of the ring's vertices, or `None` for an empty ring.
    pub fn vertex_average(&self) -> Option<GeoPoint> {
        if self.ring.is_empty() {
            return None;
        }
        let n = self.ring.len() as f64;
        let (sum_lng, sum_lat) = self
            .ring
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.longitude, y + p.latitude));
        Some(GeoPoint::new(sum_lng / n, sum_lat / n))
    }

    /// Ray-casting point-in-polygon test in degree space.
    pub fn contains(&self, point: GeoPoint) -> bool {
        let ring = &self.ring;
        if ring.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = ring.len() - 1;
        for i in 0..ring.len() {
            let (a, b) = (ring[i], ring[j]);
            if (a.latitude > point.latitude) != (b.latitude > point.latitude) {
                let t = (point.latitude - a.latitude) / (b.latitude - a.latitude);
                let lng_at = a.longitude + t * (b.longitude - a.longitude);
                if point.longitude < lng_at {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}
