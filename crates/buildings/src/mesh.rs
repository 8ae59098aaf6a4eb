use earcutr::earcut;
use foundation::{BuildingId, GeoPoint};
use foundation::math::Vec2;
use scene::components::{Drawable3D, Material, TriangleMesh};

use crate::record::LandUseRecord;
use crate::shape::{PlanarShape, ShapeError, build_shape};
use crate::store::StoredBuilding;
use crate::symbology::Color;

/// Height used when a building's elevations are missing or give no positive
/// difference.
pub const FALLBACK_HEIGHT_M: f64 = 50.0;

/// Back-reference carried by every building drawable.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingRef {
    pub id: BuildingId,
    pub land_use: Option<LandUseRecord>,
    /// Footprint centre in local (scaled) meters.
    pub center: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingMesh {
    pub drawable: Drawable3D,
    pub back_ref: BuildingRef,
    pub height: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshBuilder {
    pub fallback_height: f64,
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self {
            fallback_height: FALLBACK_HEIGHT_M,
        }
    }
}

impl MeshBuilder {
    pub fn new(fallback_height: f64) -> Self {
        Self { fallback_height }
    }

    /// Extruded drawable for one stored building, or `None` when its footprint
    /// cannot be shaped.
    pub fn build(
        &self,
        entry: &StoredBuilding,
        reference: GeoPoint,
        scale: f64,
        highlight_color: Color,
    ) -> Option<BuildingMesh> {
        self.try_build(entry, reference, scale, highlight_color).ok()
    }

    pub fn try_build(
        &self,
        entry: &StoredBuilding,
        reference: GeoPoint,
        scale: f64,
        highlight_color: Color,
    ) -> Result<BuildingMesh, ShapeError> {
        let building = entry.building();
        let shape = build_shape(&building.footprint, reference, scale)?;
        let height = self.height_for(building.height()) * scale;

        let presentation = &entry.presentation;
        let color = if presentation.highlighted {
            highlight_color
        } else {
            presentation.display_color
        };

        Ok(BuildingMesh {
            drawable: Drawable3D::mesh(extrude(&shape, height), Material::opaque(color.to_rgb())),
            back_ref: BuildingRef {
                id: building.id.clone(),
                land_use: building.land_use.clone(),
                center: shape.center(),
            },
            height,
        })
    }

    /// Unscaled extrusion height for a measured `roof - ground` difference.
    pub fn height_for(&self, measured: Option<f64>) -> f64 {
        match measured {
            Some(h) if h > 0.0 => h,
            _ => self.fallback_height,
        }
    }
}

/// Closed prism: bottom cap at z = 0, top cap at `height`, one quad per edge.
pub fn extrude(shape: &PlanarShape, height: f64) -> TriangleMesh {
    let ring = shape.open_ring();
    let n = ring.len();
    if n < 3 {
        return TriangleMesh::default();
    }

    let mut positions = Vec::with_capacity(n * 2);
    positions.extend(ring.iter().map(|p| p.extend(0.0)));
    positions.extend(ring.iter().map(|p| p.extend(height)));

    let mut triangles = Vec::new();
    let n32 = n as u32;

    let coords: Vec<f64> = ring.iter().flat_map(|p| [p.x, p.y]).collect();
    if let Ok(cap) = earcut(&coords, &[], 2) {
        for tri in cap.chunks_exact(3) {
            let (a, b, c) = (tri[0] as u32, tri[1] as u32, tri[2] as u32);
            triangles.push([a + n32, b + n32, c + n32]);
            triangles.push([c, b, a]);
        }
    }

    for i in 0..n32 {
        let j = (i + 1) % n32;
        triangles.push([i, j, j + n32]);
        triangles.push([i, j + n32, i + n32]);
    }

    TriangleMesh::new(positions, triangles)
}

/// Vertical extent of a mesh, for tests and diagnostics.
pub fn vertical_extent(mesh: &TriangleMesh) -> Option<(f64, f64)> {
    let b = mesh.bounds()?;
    Some((b.min.z, b.max.z))
}
