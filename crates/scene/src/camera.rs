use foundation::math::Vec3;

use crate::picking::Ray;

/// Viewport size in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Maps a pixel position to normalized device coordinates in `[-1, 1]`,
    /// with +y pointing up.
    pub fn screen_to_ndc(&self, x_px: f64, y_px: f64) -> Option<(f64, f64)> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (x_px / self.width) * 2.0 - 1.0;
        let y = -(y_px / self.height) * 2.0 + 1.0;
        Some((x, y))
    }
}

/// Perspective look-at camera in scene meters. Scene up is +Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f64) -> Self {
        Self { eye, target, fov_y }
    }

    /// Camera placed south of and above `target`, looking at it.
    pub fn overview(target: Vec3, distance: f64) -> Self {
        let eye = Vec3::new(target.x, target.y - distance, target.z + distance);
        Self::look_at(eye, target, 60f64.to_radians())
    }

    /// Orthonormal `(forward, right, up)` basis, or `None` when the eye sits on
    /// the target or looks straight along the up axis.
    pub fn basis(&self) -> Option<(Vec3, Vec3, Vec3)> {
        let forward = (self.target - self.eye).normalized()?;
        let right = forward.cross(Vec3::UNIT_Z).normalized()?;
        let up = right.cross(forward);
        Some((forward, right, up))
    }

    /// World-space ray through the given pixel.
    pub fn ray_from_screen(&self, viewport: Viewport, x_px: f64, y_px: f64) -> Option<Ray> {
        let (ndc_x, ndc_y) = viewport.screen_to_ndc(x_px, y_px)?;
        let (forward, right, up) = self.basis()?;
        let half = (self.fov_y / 2.0).tan();
        let dir = forward
            + right.scale(ndc_x * half * viewport.aspect())
            + up.scale(ndc_y * half);
        Some(Ray::new(self.eye, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::{Camera, Viewport};
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn ndc_corners() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.screen_to_ndc(0.0, 0.0), Some((-1.0, 1.0)));
        assert_eq!(vp.screen_to_ndc(800.0, 600.0), Some((1.0, -1.0)));
        assert_eq!(vp.screen_to_ndc(400.0, 300.0), Some((0.0, 0.0)));
        assert_eq!(Viewport::new(0.0, 600.0).screen_to_ndc(1.0, 1.0), None);
    }

    #[test]
    fn centre_pixel_ray_points_at_target() {
        let cam = Camera::look_at(Vec3::new(0.0, -10.0, 10.0), Vec3::ZERO, 1.0);
        let ray = cam
            .ray_from_screen(Viewport::new(640.0, 480.0), 320.0, 240.0)
            .expect("ray");
        let dir = ray.dir.normalized().expect("dir");
        let expected = (Vec3::ZERO - cam.eye).normalized().expect("expected");
        assert_close(dir.x, expected.x);
        assert_close(dir.y, expected.y);
        assert_close(dir.z, expected.z);
    }

    #[test]
    fn straight_down_camera_has_no_basis() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0);
        assert!(cam.basis().is_none());
    }
}
