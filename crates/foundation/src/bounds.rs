use crate::math::Vec3;

/// Axis-aligned bounding box in local scene meters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Aabb3 { min, max }
    }

    /// Smallest box containing every point, or `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Aabb3::new(first, first);
        for p in iter {
            bounds.min = Vec3::new(
                bounds.min.x.min(p.x),
                bounds.min.y.min(p.y),
                bounds.min.z.min(p.z),
            );
            bounds.max = Vec3::new(
                bounds.max.x.max(p.x),
                bounds.max.y.max(p.y),
                bounds.max.z.max(p.z),
            );
        }
        Some(bounds)
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Slab test; returns the entry distance along `dir` if the ray hits the
    /// box within `[t_min, t_max]`.
    pub fn ray_entry(&self, origin: Vec3, dir: Vec3, mut t_min: f64, mut t_max: f64) -> Option<f64> {
        let o = [origin.x, origin.y, origin.z];
        let d = [dir.x, dir.y, dir.z];
        let lo = [self.min.x, self.min.y, self.min.z];
        let hi = [self.max.x, self.max.y, self.max.z];

        for axis in 0..3 {
            if d[axis].abs() < 1e-12 {
                if o[axis] < lo[axis] || o[axis] > hi[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d[axis];
            let mut t1 = (lo[axis] - o[axis]) * inv;
            let mut t2 = (hi[axis] - o[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_max < t_min {
                return None;
            }
        }

        Some(t_min.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;
    use crate::math::Vec3;

    #[test]
    fn from_points_spans_all_points() {
        let b = Aabb3::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 4.0, 3.0),
            Vec3::new(0.5, 0.0, -1.0),
        ])
        .expect("bounds");
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 3.0));
        assert!(b.contains(Vec3::new(0.0, 0.0, 0.0)));
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn ray_entry_hits_and_misses() {
        let b = Aabb3::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let hit = b
            .ray_entry(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 0.0, f64::INFINITY)
            .expect("hit");
        assert_eq!(hit, 4.0);
        assert!(
            b.ray_entry(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0), 0.0, f64::INFINITY)
                .is_none()
        );
    }
}
