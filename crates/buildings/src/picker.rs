use foundation::math::{Vec2, Vec3};
use scene::camera::{Camera, Viewport};
use scene::entity::EntityId;
use scene::picking::{PickOptions, pick_screen};

use crate::record::Building;
use crate::store::BuildingStore;
use crate::sync::BuildingWorld;

/// A building resolved from a pointer position.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub building: Building,
    pub entity: EntityId,
    /// Footprint centre in local meters.
    pub local_center: Vec2,
    /// Where the pointer ray met the building.
    pub hit_point: Vec3,
}

/// Screen point to building: nearest drawable under the pointer, then its
/// back-reference. `None` when nothing is hit, including an empty scene.
pub fn pick(
    world: &BuildingWorld,
    store: &BuildingStore,
    camera: &Camera,
    viewport: Viewport,
    x_px: f64,
    y_px: f64,
) -> Option<Selection> {
    let hit = pick_screen(world, camera, viewport, x_px, y_px, PickOptions::default())?;
    let back_ref = world.back_ref(hit.entity)?;
    let stored = store.get(&back_ref.id)?;
    Some(Selection {
        building: stored.building().clone(),
        entity: hit.entity,
        local_center: back_ref.center,
        hit_point: hit.point,
    })
}

#[cfg(test)]
mod tests {
    use super::pick;
    use crate::record::Building;
    use crate::store::BuildingStore;
    use crate::sync::SceneSync;
    use foundation::math::Vec3;
    use foundation::{BuildingId, GeoPoint, Polygon};
    use scene::camera::{Camera, Viewport};

    const REF: GeoPoint = GeoPoint::new(-114.0719, 51.0447);

    fn square_at(dlon: f64) -> Polygon {
        let d = 0.0003;
        let (lon, lat) = (REF.longitude + dlon, REF.latitude);
        Polygon::new(vec![
            GeoPoint::new(lon - d, lat - d),
            GeoPoint::new(lon + d, lat - d),
            GeoPoint::new(lon + d, lat + d),
            GeoPoint::new(lon - d, lat + d),
        ])
    }

    fn looking_down_at(target: Vec3) -> Camera {
        Camera::look_at(
            Vec3::new(target.x, target.y - 200.0, target.z + 400.0),
            target,
            45f64.to_radians(),
        )
    }

    #[test]
    fn picks_building_under_pointer() {
        let mut store = BuildingStore::from_buildings(vec![
            Building::new(1, square_at(0.0)).with_elevations(0.0, 20.0),
            Building::new(2, square_at(0.01)).with_elevations(0.0, 20.0),
        ]);
        let mut sync = SceneSync::default();
        sync.rebuild(&mut store, REF, 1.0);

        let viewport = Viewport::new(800.0, 600.0);
        let target = store
            .get(&BuildingId::from(2))
            .and_then(|e| e.presentation.projected_center)
            .expect("center")
            .extend(10.0);
        let camera = looking_down_at(target);

        let selection =
            pick(sync.world(), &store, &camera, viewport, 400.0, 300.0).expect("selection");
        assert_eq!(selection.building.id, BuildingId::from(2));
        assert!((selection.local_center.x - target.x).abs() < 1e-6);
    }

    #[test]
    fn empty_scene_or_empty_space_is_none() {
        let mut store = BuildingStore::new();
        let mut sync = SceneSync::default();
        sync.rebuild(&mut store, REF, 1.0);
        let viewport = Viewport::new(800.0, 600.0);
        let camera = looking_down_at(Vec3::ZERO);
        assert!(pick(sync.world(), &store, &camera, viewport, 400.0, 300.0).is_none());

        store.replace_all(vec![Building::new(1, square_at(0.05))]);
        sync.rebuild(&mut store, REF, 1.0);
        assert!(pick(sync.world(), &store, &camera, viewport, 400.0, 300.0).is_none());
    }
}
