use std::fmt;

use foundation::math::{Vec2, to_local_meters};
use foundation::{GeoPoint, Polygon};

/// Why a footprint cannot become geometry. Always recovered by skipping the
/// single building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    TooFewVertices(usize),
    CoordinateOutOfRange { index: usize },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeError::TooFewVertices(n) => {
                write!(f, "invalid geometry: footprint has {n} vertices, need at least 3")
            }
            ShapeError::CoordinateOutOfRange { index } => {
                write!(f, "invalid geometry: vertex {index} is outside lon/lat range")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PathCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    Close,
}

/// Footprint in local (scaled) meters, one vertex per input vertex, in input
/// order. The path is implicitly closed.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarShape {
    points: Vec<Vec2>,
}

impl PlanarShape {
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Move to the first point, line to each following point, close.
    pub fn path(&self) -> Vec<PathCommand> {
        let mut out = Vec::with_capacity(self.points.len() + 1);
        let mut iter = self.points.iter();
        if let Some(first) = iter.next() {
            out.push(PathCommand::MoveTo(*first));
            out.extend(iter.map(|p| PathCommand::LineTo(*p)));
            out.push(PathCommand::Close);
        }
        out
    }

    /// Vertex average.
    pub fn center(&self) -> Vec2 {
        let n = self.points.len().max(1) as f64;
        let sum = self.points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        sum.scale(1.0 / n)
    }

    /// Ring without a trailing point that repeats the first one.
    pub fn open_ring(&self) -> &[Vec2] {
        match self.points.as_slice() {
            [first, .., last] if self.points.len() > 3 && nearly_equal(*first, *last) => {
                &self.points[..self.points.len() - 1]
            }
            pts => pts,
        }
    }
}

fn nearly_equal(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

/// Projects every footprint vertex around `reference` and scales it
/// uniformly. Vertex order is kept exactly; no winding fix-up happens here.
pub fn build_shape(
    footprint: &Polygon,
    reference: GeoPoint,
    scale: f64,
) -> Result<PlanarShape, ShapeError> {
    if footprint.len() < 3 {
        return Err(ShapeError::TooFewVertices(footprint.len()));
    }
    let points = footprint
        .points()
        .iter()
        .enumerate()
        .map(|(index, p)| {
            if p.is_valid() {
                Ok(to_local_meters(reference, *p).scale(scale))
            } else {
                Err(ShapeError::CoordinateOutOfRange { index })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PlanarShape { points })
}

#[cfg(test)]
mod tests {
    use super::{PathCommand, ShapeError, build_shape};
    use foundation::math::Vec2;
    use foundation::{GeoPoint, Polygon};

    const REF: GeoPoint = GeoPoint::new(-114.0719, 51.0447);

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    fn ring(n: usize) -> Polygon {
        Polygon::new(
            (0..n)
                .map(|i| {
                    let a = i as f64 / n as f64 * std::f64::consts::TAU;
                    GeoPoint::new(REF.longitude + 0.001 * a.cos(), REF.latitude + 0.001 * a.sin())
                })
                .collect(),
        )
    }

    #[test]
    fn fewer_than_three_vertices_is_invalid() {
        for n in 0..3 {
            assert_eq!(
                build_shape(&ring(n), REF, 1.0),
                Err(ShapeError::TooFewVertices(n))
            );
        }
    }

    #[test]
    fn vertex_count_is_preserved() {
        for n in 3..12 {
            let shape = build_shape(&ring(n), REF, 1.0).expect("valid");
            assert_eq!(shape.len(), n);
            assert_eq!(shape.path().len(), n + 1);
        }
    }

    #[test]
    fn closed_input_keeps_its_repeated_vertex() {
        let mut pts = ring(4).points().to_vec();
        pts.push(pts[0]);
        let shape = build_shape(&Polygon::new(pts), REF, 1.0).expect("valid");
        assert_eq!(shape.len(), 5);
        assert_eq!(shape.open_ring().len(), 4);
    }

    #[test]
    fn path_moves_lines_and_closes() {
        let poly = Polygon::new(vec![
            REF,
            GeoPoint::new(REF.longitude + 0.01, REF.latitude),
            GeoPoint::new(REF.longitude, REF.latitude + 0.01),
        ]);
        let path = build_shape(&poly, REF, 1.0).expect("valid").path();
        assert_eq!(path[0], PathCommand::MoveTo(Vec2::ZERO));
        assert!(matches!(path[1], PathCommand::LineTo(p) if p.x > 0.0 && p.y == 0.0));
        assert!(matches!(path[2], PathCommand::LineTo(p) if p.x == 0.0 && p.y > 0.0));
        assert_eq!(path[3], PathCommand::Close);
    }

    #[test]
    fn scale_multiplies_uniformly() {
        let poly = Polygon::new(vec![
            REF,
            GeoPoint::new(REF.longitude + 0.01, REF.latitude),
            GeoPoint::new(REF.longitude, REF.latitude - 0.01),
        ]);
        let unit = build_shape(&poly, REF, 1.0).expect("valid");
        let doubled = build_shape(&poly, REF, 2.0).expect("valid");
        for (a, b) in unit.points().iter().zip(doubled.points()) {
            assert_close(a.x * 2.0, b.x);
            assert_close(a.y * 2.0, b.y);
        }
        assert!(unit.points()[2].y < 0.0);
    }

    #[test]
    fn out_of_range_vertex_is_invalid() {
        let poly = Polygon::new(vec![REF, GeoPoint::new(190.0, 51.0), REF]);
        assert_eq!(
            build_shape(&poly, REF, 1.0),
            Err(ShapeError::CoordinateOutOfRange { index: 1 })
        );
    }
}
