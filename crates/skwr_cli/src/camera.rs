//! Pinhole camera for primary ray generation.

use serde::{Deserialize, Serialize};
use skwr_math::Vec3;
use skwr_renderer::{Ray, RayGenerator, Sampler};

/// Camera placement as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub look_from: [f32; 3],
    pub look_at: [f32; 3],
    pub vup: [f32; 3],
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Medium the camera sits in
    pub medium: Option<String>,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            look_from: [0.0, 0.0, 0.0],
            look_at: [0.0, 0.0, -1.0],
            vup: [0.0, 1.0, 0.0],
            vfov: 90.0,
            medium: None,
        }
    }
}

/// Pinhole camera with per-sample jitter inside each pixel.
#[derive(Debug, Clone)]
pub struct Camera {
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
}

impl Camera {
    pub fn new(description: &CameraDescription, image_width: u32, image_height: u32) -> Self {
        let look_from = Vec3::from(description.look_from);
        let look_at = Vec3::from(description.look_at);
        let vup = Vec3::from(description.vup);

        // Viewport on the plane one unit in front of the camera
        let theta = description.vfov.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = viewport_height * (image_width as f32 / image_height.max(1) as f32);

        let w = (look_from - look_at).normalize();
        let u = vup.cross(w).normalize();
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;
        let pixel_delta_u = viewport_u / image_width.max(1) as f32;
        let pixel_delta_v = viewport_v / image_height.max(1) as f32;

        let viewport_upper_left = look_from - w - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00_loc = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        Self {
            center: look_from,
            pixel00_loc,
            pixel_delta_u,
            pixel_delta_v,
        }
    }
}

impl RayGenerator for Camera {
    fn generate_ray(&self, x: u32, y: u32, sampler: &mut Sampler) -> Option<Ray> {
        let offset_x = sampler.uniform_float() - 0.5;
        let offset_y = sampler.uniform_float() - 0.5;
        let pixel_sample = self.pixel00_loc
            + (x as f32 + offset_x) * self.pixel_delta_u
            + (y as f32 + offset_y) * self.pixel_delta_v;

        let direction = pixel_sample - self.center;
        // Degenerate placement (look_from == look_at)
        if !direction.is_finite() || direction.length_squared() == 0.0 {
            return None;
        }
        Some(Ray::new(self.center, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_pixel_looks_forward() {
        let camera = Camera::new(&CameraDescription::default(), 101, 101);
        let mut sampler = Sampler::with_seed(1);
        let ray = camera.generate_ray(50, 50, &mut sampler).unwrap();
        assert_eq!(ray.origin(), Vec3::ZERO);
        // Jitter stays within one pixel of the axis
        assert!(ray.direction().dot(-Vec3::Z) > 0.999);
    }

    #[test]
    fn test_corners_span_field_of_view() {
        let description = CameraDescription {
            vfov: 90.0,
            ..Default::default()
        };
        let camera = Camera::new(&description, 2, 2);
        let mut sampler = Sampler::with_seed(2);

        // Top-left pixel points up and to the left
        let d = camera.generate_ray(0, 0, &mut sampler).unwrap().direction();
        assert!(d.x < 0.0 && d.y > 0.0 && d.z < 0.0);
        let d = camera.generate_ray(1, 1, &mut sampler).unwrap().direction();
        assert!(d.x >= 0.0 && d.y <= 0.0 && d.z < 0.0);
    }

    #[test]
    fn test_degenerate_camera_yields_no_rays() {
        let description = CameraDescription {
            look_at: [0.0, 0.0, 0.0],
            ..Default::default()
        };
        let camera = Camera::new(&description, 4, 4);
        assert!(camera.generate_ray(1, 1, &mut Sampler::with_seed(3)).is_none());
    }
}
