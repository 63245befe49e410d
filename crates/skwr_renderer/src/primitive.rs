//! Surface interactions and the nearest-hit query contract.

use crate::medium::{MediumInterface, MediumStack};
use crate::{Material, Ray};
use skwr_math::{Interval, Vec3};

/// Record of a ray-surface intersection.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceInteraction<'a> {
    /// Point of intersection
    pub p: Vec3,
    /// Points back toward the ray origin
    pub wo: Vec3,
    /// Surface normal, always facing against the incoming ray
    pub normal: Vec3,
    /// Ray parameter of the hit
    pub t: f32,
    /// Whether the ray hit the outside of the surface
    pub front_face: bool,
    pub material: &'a Material,
    /// `None` when the surface does not separate media
    pub medium_interface: Option<MediumInterface>,
}

impl<'a> SurfaceInteraction<'a> {
    /// Build an interaction, orienting `outward_normal` against the ray.
    pub fn new(
        ray: &Ray,
        t: f32,
        outward_normal: Vec3,
        material: &'a Material,
        medium_interface: Option<MediumInterface>,
    ) -> Self {
        // If the ray and normal point in the same direction, we're inside
        let front_face = ray.direction().dot(outward_normal) < 0.0;
        let normal = if front_face {
            outward_normal
        } else {
            -outward_normal
        };

        Self {
            p: ray.at(t),
            wo: -ray.direction(),
            normal,
            t,
            front_face,
            material,
            medium_interface,
        }
    }

    pub fn outward_normal(&self) -> Vec3 {
        if self.front_face {
            self.normal
        } else {
            -self.normal
        }
    }

    /// Medium entered by a ray leaving this surface along `direction`.
    ///
    /// Surfaces without an interface keep `current`.
    pub fn medium_for(&self, direction: Vec3, current: MediumStack) -> MediumStack {
        match self.medium_interface {
            Some(interface) if direction.dot(self.outward_normal()) > 0.0 => interface.outside,
            Some(interface) => interface.inside,
            None => current,
        }
    }
}

/// A single piece of scene geometry.
pub trait Primitive: Send + Sync {
    /// Nearest hit with `t` strictly inside `ray_t`.
    fn intersect(&self, ray: &Ray, ray_t: Interval) -> Option<SurfaceInteraction<'_>>;
}

/// Nearest-hit query over a whole scene.
///
/// Implementations may be a plain scan or any spatial index; callers only
/// rely on this contract.
pub trait Intersect: Send + Sync {
    /// Closest hit with `t` in `(t_min, t_max)`. An empty or inverted range
    /// never hits.
    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<SurfaceInteraction<'_>>;
}

/// Linear scan over every primitive.
#[derive(Default)]
pub struct PrimitiveList {
    primitives: Vec<Box<dyn Primitive>>,
}

impl PrimitiveList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, primitive: Box<dyn Primitive>) {
        self.primitives.push(primitive);
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

impl Intersect for PrimitiveList {
    fn intersect(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<SurfaceInteraction<'_>> {
        let ray_t = Interval::new(t_min, t_max);
        if ray_t.is_empty() {
            return None;
        }

        let mut closest: Option<SurfaceInteraction<'_>> = None;
        let mut closest_so_far = ray_t.max;

        // Strict interval, so an equal t never replaces the first hit
        for primitive in &self.primitives {
            if let Some(si) = primitive.intersect(ray, Interval::new(ray_t.min, closest_so_far)) {
                closest_so_far = si.t;
                closest = Some(si);
            }
        }

        closest
    }
}
