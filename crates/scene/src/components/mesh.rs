use foundation::bounds::Aabb3;
use foundation::math::Vec3;

/// Indexed triangle mesh in scene meters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(self.positions.iter().copied())
    }

    /// Iterates triangles as vertex triples, skipping any with out-of-range
    /// indices.
    pub fn triangle_vertices(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangles.iter().filter_map(|[a, b, c]| {
            let a = *self.positions.get(*a as usize)?;
            let b = *self.positions.get(*b as usize)?;
            let c = *self.positions.get(*c as usize)?;
            Some([a, b, c])
        })
    }
}
