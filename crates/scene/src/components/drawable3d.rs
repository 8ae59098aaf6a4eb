use foundation::bounds::Aabb3;
use foundation::math::Vec3;

use super::{Material, TriangleMesh};

#[derive(Debug, Clone, PartialEq)]
pub enum Shape3D {
    /// Solid geometry; the only shape picking intersects.
    Mesh(TriangleMesh),
    /// Square line grid on the ground plane, centred on the origin.
    Grid { size: f64, divisions: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drawable3D {
    pub shape: Shape3D,
    pub material: Material,
}

impl Drawable3D {
    pub fn mesh(mesh: TriangleMesh, material: Material) -> Self {
        Self {
            shape: Shape3D::Mesh(mesh),
            material,
        }
    }

    pub fn grid(size: f64, divisions: u32, material: Material) -> Self {
        Self {
            shape: Shape3D::Grid { size, divisions },
            material,
        }
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        match &self.shape {
            Shape3D::Mesh(mesh) => mesh.bounds(),
            Shape3D::Grid { size, .. } => {
                let h = size / 2.0;
                Some(Aabb3::new(Vec3::new(-h, -h, 0.0), Vec3::new(h, h, 0.0)))
            }
        }
    }

    pub fn is_grid(&self) -> bool {
        matches!(self.shape, Shape3D::Grid { .. })
    }
}
