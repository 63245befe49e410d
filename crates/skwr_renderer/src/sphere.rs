//! Sphere primitive.

use crate::medium::MediumInterface;
use crate::primitive::{Primitive, SurfaceInteraction};
use crate::{Material, Ray};
use skwr_math::{Interval, Vec3};

#[derive(Debug, Clone)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: Material,
    medium_interface: Option<MediumInterface>,
}

impl Sphere {
    /// Create a new sphere. Negative radii are clamped to zero, which never
    /// intersects.
    pub fn new(center: Vec3, radius: f32, material: Material) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            material,
            medium_interface: None,
        }
    }

    /// Mark the sphere as the boundary between two media.
    pub fn with_medium_interface(mut self, interface: MediumInterface) -> Self {
        self.medium_interface = Some(interface);
        self
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Primitive for Sphere {
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceInteraction<'_>> {
        // Degenerate
        if !(self.radius > 0.0) || !self.radius.is_finite() {
            return None;
        }

        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Find the nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(SurfaceInteraction::new(
            ray,
            root,
            outward_normal,
            &self.material,
            self.medium_interface,
        ))
    }
}
