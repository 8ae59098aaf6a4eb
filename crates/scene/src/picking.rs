use foundation::math::Vec3;
use foundation::math::precision::stable_total_cmp_f64;

use crate::World;
use crate::camera::{Camera, Viewport};
use crate::components::Shape3D;
use crate::entity::EntityId;

const EPSILON: f64 = 1e-12;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickHit {
    pub entity: EntityId,
    pub distance: f64,
    pub point: Vec3,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: 1.0e30,
        }
    }
}

/// Deterministic ray picking against mesh drawables.
///
/// Ordering contract:
/// - The closest triangle hit along the (normalized) ray wins.
/// - If multiple entities are hit at the same distance, the lower `EntityId::index()` wins.
///
/// Grids are never pickable. Cached bounds act as a broadphase; only entities
/// whose box the ray enters are tested triangle by triangle.
pub fn pick_ray<R>(world: &World<R>, ray: Ray, opts: PickOptions) -> Option<PickHit> {
    let dir = ray.dir.normalized()?;
    let ray = Ray::new(ray.origin, dir);

    let mut best: Option<(f64, EntityId)> = None;

    for (entity, drawable) in world.drawables() {
        let Shape3D::Mesh(mesh) = &drawable.shape else {
            continue;
        };
        let Some(bounds) = world.bounds(entity) else {
            continue;
        };
        if bounds
            .ray_entry(ray.origin, dir, 0.0, opts.max_distance)
            .is_none()
        {
            continue;
        }

        let nearest = mesh
            .triangle_vertices()
            .filter_map(|tri| ray_triangle_t(&ray, tri))
            .filter(|t| *t <= opts.max_distance)
            .min_by(|a, b| stable_total_cmp_f64(*a, *b));
        let Some(t) = nearest else {
            continue;
        };

        best = match best {
            None => Some((t, entity)),
            Some((bt, be)) => {
                let ord = stable_total_cmp_f64(t, bt).then_with(|| entity.index().cmp(&be.index()));
                if ord.is_lt() {
                    Some((t, entity))
                } else {
                    Some((bt, be))
                }
            }
        };
    }

    let (t, entity) = best?;
    Some(PickHit {
        entity,
        distance: t,
        point: ray.at(t),
    })
}

/// Screen picking through a camera. `None` for a degenerate viewport or
/// camera, or when nothing is hit.
pub fn pick_screen<R>(
    world: &World<R>,
    camera: &Camera,
    viewport: Viewport,
    x_px: f64,
    y_px: f64,
    opts: PickOptions,
) -> Option<PickHit> {
    let ray = camera.ray_from_screen(viewport, x_px, y_px)?;
    pick_ray(world, ray, opts)
}

/// Möller–Trumbore; returns the hit distance for a normalized ray direction.
/// Both faces count as hits.
fn ray_triangle_t(ray: &Ray, [a, b, c]: [Vec3; 3]) -> Option<f64> {
    let e1 = b - a;
    let e2 = c - a;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::{PickOptions, Ray, pick_ray, pick_screen};
    use crate::World;
    use crate::camera::{Camera, Viewport};
    use crate::components::{Drawable3D, Material, TriangleMesh};
    use foundation::math::Vec3;

    /// Vertical square facing -x at `x`, spanning y and z in [-1, 1].
    fn wall_at(x: f64) -> Drawable3D {
        Drawable3D::mesh(
            TriangleMesh::new(
                vec![
                    Vec3::new(x, -1.0, -1.0),
                    Vec3::new(x, 1.0, -1.0),
                    Vec3::new(x, 1.0, 1.0),
                    Vec3::new(x, -1.0, 1.0),
                ],
                vec![[0, 1, 2], [0, 2, 3]],
            ),
            Material::default(),
        )
    }

    fn x_ray() -> Ray {
        Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0))
    }

    #[test]
    fn ray_picks_nearest_hit() {
        let mut world: World<()> = World::new();
        let far = world.add(wall_at(10.0));
        let near = world.add(wall_at(5.0));

        let hit = pick_ray(&world, x_ray(), PickOptions::default()).expect("hit");
        assert_eq!(hit.entity, near);
        assert_ne!(hit.entity, far);
        assert!((hit.distance - 5.0).abs() < 1e-9);
        assert!((hit.point.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn tie_breaks_by_entity_index() {
        let mut world: World<()> = World::new();
        let first = world.add(wall_at(5.0));
        let _second = world.add(wall_at(5.0));

        let hit = pick_ray(&world, x_ray(), PickOptions::default()).expect("hit");
        assert_eq!(hit.entity, first);
    }

    #[test]
    fn grid_is_not_pickable() {
        let mut world: World<()> = World::new();
        world.add(Drawable3D::grid(100.0, 10, Material::default()));
        let down = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(pick_ray(&world, down, PickOptions::default()).is_none());
    }

    #[test]
    fn empty_world_and_misses_yield_none() {
        let mut world: World<()> = World::new();
        assert!(pick_ray(&world, x_ray(), PickOptions::default()).is_none());

        world.add(wall_at(5.0));
        let away = Ray::new(Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0));
        assert!(pick_ray(&world, away, PickOptions::default()).is_none());
        let zero = Ray::new(Vec3::ZERO, Vec3::ZERO);
        assert!(pick_ray(&world, zero, PickOptions::default()).is_none());
    }

    #[test]
    fn inside_the_box_but_missing_triangles_is_a_miss() {
        let mut world: World<()> = World::new();
        // Diagonal triangle: its box spans the ray but the triangle itself does not.
        world.add(Drawable3D::mesh(
            TriangleMesh::new(
                vec![
                    Vec3::new(5.0, 0.5, 0.5),
                    Vec3::new(6.0, 1.0, 0.5),
                    Vec3::new(5.0, 1.0, 1.0),
                ],
                vec![[0, 1, 2]],
            ),
            Material::default(),
        ));
        let ray = Ray::new(Vec3::new(0.0, 0.5, 0.5 + 1e-3), Vec3::new(1.0, 0.0, 0.0));
        assert!(pick_ray(&world, ray, PickOptions::default()).is_none());
    }

    #[test]
    fn max_distance_limits_hits() {
        let mut world: World<()> = World::new();
        world.add(wall_at(5.0));
        let opts = PickOptions { max_distance: 4.0 };
        assert!(pick_ray(&world, x_ray(), opts).is_none());
    }

    #[test]
    fn screen_centre_picks_target_mesh() {
        let mut world: World<()> = World::new();
        let e = world.add(wall_at(5.0));
        let camera = Camera::look_at(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 1.0);
        let viewport = Viewport::new(200.0, 100.0);

        let hit = pick_screen(&world, &camera, viewport, 100.0, 50.0, PickOptions::default())
            .expect("hit");
        assert_eq!(hit.entity, e);
        assert!(
            pick_screen(&world, &camera, viewport, 0.0, 0.0, PickOptions::default()).is_none()
        );
    }
}
