//! Thin-lens camera.

use crate::sampling::{concentric_disk, gen_f32};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use solis_math::{Ray, Vec3};

/// Perspective camera with optional depth of field.
///
/// Image positions start at the top-left corner, `x` to the right and `y`
/// down. Call [`Camera::initialize`] after changing any field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub image_width: u32,
    pub image_height: u32,

    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,

    /// Vertical field of view, degrees
    pub vfov: f32,
    /// Cone angle of the lens aperture seen from the focus plane, degrees.
    /// Zero is a pinhole.
    pub defocus_angle: f32,
    pub focus_dist: f32,

    #[serde(skip)]
    frame: Frame,
}

/// World-space quantities derived by `initialize`.
#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    origin: Vec3,
    /// Top-left corner of the image on the focus plane
    corner: Vec3,
    step_x: Vec3,
    step_y: Vec3,
    lens_u: Vec3,
    lens_v: Vec3,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            image_width: 800,
            image_height: 450,
            look_from: Vec3::ZERO,
            look_at: Vec3::NEG_Z,
            vup: Vec3::Y,
            vfov: 90.0,
            defocus_angle: 0.0,
            focus_dist: 1.0,
            frame: Frame::default(),
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.image_width = width;
        self.image_height = height;
        self
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_lens(mut self, vfov: f32, defocus_angle: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.defocus_angle = defocus_angle;
        self.focus_dist = focus_dist;
        self
    }

    /// Recompute the image plane and lens frame.
    pub fn initialize(&mut self) {
        let width = self.image_width.max(1) as f32;
        let height = self.image_height.max(1) as f32;
        let focus = if self.focus_dist > 0.0 { self.focus_dist } else { 1.0 };

        let back = (self.look_from - self.look_at).normalize_or_zero();
        let right = self.vup.cross(back).normalize_or_zero();
        let up = back.cross(right);

        let plane_height = 2.0 * focus * (0.5 * self.vfov.to_radians()).tan();
        let plane_width = plane_height * width / height;
        let across = plane_width * right;
        let down = -plane_height * up;

        let lens_radius = focus * (0.5 * self.defocus_angle).to_radians().tan();

        self.frame = Frame {
            origin: self.look_from,
            corner: self.look_from - focus * back - 0.5 * (across + down),
            step_x: across / width,
            step_y: down / height,
            lens_u: lens_radius * right,
            lens_v: lens_radius * up,
        };
    }

    /// Ray through the continuous image position `(x, y)`.
    ///
    /// Integer coordinates are pixel corners; `(i + 0.5, j + 0.5)` is the
    /// center of pixel `(i, j)`. The rng is only drawn from when the lens
    /// has an aperture.
    pub fn get_ray(&self, x: f32, y: f32, rng: &mut dyn RngCore) -> Ray {
        let f = &self.frame;
        let target = f.corner + x * f.step_x + y * f.step_y;
        let origin = if self.defocus_angle > 0.0 {
            let (dx, dy) = concentric_disk(gen_f32(rng), gen_f32(rng));
            f.origin + dx * f.lens_u + dy * f.lens_v
        } else {
            f.origin
        };
        Ray::new(origin, target - origin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new()
            .with_resolution(width, height)
            .with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
            .with_lens(90.0, 0.0, 1.0);
        camera.initialize();
        camera
    }

    #[test]
    fn test_initialize_sizes_image_plane() {
        let camera = camera(800, 600);
        assert_eq!(camera.frame.origin, Vec3::ZERO);
        // Width of the viewport at focus distance 1 with a 90 degree fov
        assert!((camera.frame.step_x.x * 800.0 - 2.0 * 800.0 / 600.0).abs() < 1e-4);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = camera(100, 100);
        let mut rng = StdRng::seed_from_u64(42);

        let ray = camera.get_ray(50.0, 50.0, &mut rng);
        assert!((ray.direction - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_top_left_origin() {
        let camera = camera(100, 100);
        let mut rng = StdRng::seed_from_u64(42);

        let ray = camera.get_ray(0.0, 0.0, &mut rng);
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
        // 90 degree fov: the corner is at 45 degrees on both axes
        let expected = Vec3::new(-1.0, 1.0, -1.0).normalize();
        assert!((ray.direction - expected).length() < 1e-5);
    }

    #[test]
    fn test_defocus_moves_origin_inside_disk() {
        let mut camera = Camera::new()
            .with_resolution(64, 64)
            .with_lens(40.0, 10.0, 5.0);
        camera.initialize();
        let mut rng = StdRng::seed_from_u64(3);
        let radius = 5.0 * (5.0f32).to_radians().tan();

        for _ in 0..100 {
            let ray = camera.get_ray(32.0, 32.0, &mut rng);
            assert!(ray.origin.length() <= radius + 1e-5);
            assert_eq!(ray.origin.z, 0.0);
        }
    }

    #[test]
    fn test_camera_serde_skips_cache() {
        let camera: Camera = serde_json::from_str(r#"{"vfov":40.0,"look_from":[0,1,5]}"#).unwrap();
        assert_eq!(camera.vfov, 40.0);
        assert_eq!(camera.look_from, Vec3::new(0.0, 1.0, 5.0));
        assert_eq!(camera.image_width, 800);
        let json = serde_json::to_string(&camera).unwrap();
        assert!(!json.contains("frame"));
    }
}
