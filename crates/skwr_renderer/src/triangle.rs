//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.

use crate::medium::MediumInterface;
use crate::primitive::{Primitive, SurfaceInteraction};
use crate::{Material, Ray};
use skwr_math::{Interval, Vec3};

#[derive(Debug, Clone)]
pub struct Triangle {
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Unit face normal, zero for degenerate triangles
    normal: Vec3,
    material: Material,
    medium_interface: Option<MediumInterface>,
}

impl Triangle {
    /// Create a new triangle. The winding `v0, v1, v2` sets the front side.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: Material) -> Self {
        let normal = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            v0,
            v1,
            v2,
            normal,
            material,
            medium_interface: None,
        }
    }

    pub fn with_medium_interface(mut self, interface: MediumInterface) -> Self {
        self.medium_interface = Some(interface);
        self
    }

    /// Zero-area triangles never intersect.
    pub fn is_degenerate(&self) -> bool {
        self.normal == Vec3::ZERO
    }
}

impl Primitive for Triangle {
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceInteraction<'_>> {
        if self.is_degenerate() {
            return None;
        }

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.surrounds(t) {
            return None;
        }

        Some(SurfaceInteraction::new(
            ray,
            t,
            self.normal,
            &self.material,
            self.medium_interface,
        ))
    }
}
