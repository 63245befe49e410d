//! Ray type for path tracing.
//!
//! A ray carries the packed id of the medium it is travelling through.
//! Rays are never mutated after construction; every scatter event makes a
//! new one.

use crate::medium::MediumStack;
use skwr_math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Vec3,
    /// Always unit length
    direction: Vec3,
    medium: MediumStack,
}

impl Ray {
    /// Create a ray in vacuum. `direction` is normalized.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self::in_medium(origin, direction, MediumStack::VACUUM)
    }

    /// Create a ray travelling through `medium`. `direction` is normalized.
    #[inline]
    pub fn in_medium(origin: Vec3, direction: Vec3, medium: MediumStack) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            medium,
        }
    }

    /// The same ray, travelling through `medium` instead.
    #[inline]
    pub fn with_medium(self, medium: MediumStack) -> Self {
        Self { medium, ..self }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn medium(&self) -> MediumStack {
        self.medium
    }

    /// P(t) = origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + t * self.direction
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
            medium: MediumStack::VACUUM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medium::MediumType;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.5), Vec3::new(2.5, 0.0, 0.0));
    }

    #[test]
    fn test_direction_is_normalized() {
        let ray = Ray::new(Vec3::ONE, Vec3::new(0.0, 3.0, 4.0));
        assert!((ray.direction().length() - 1.0).abs() < 1e-6);
        assert_eq!(ray.medium(), MediumStack::VACUUM);
    }

    #[test]
    fn test_with_medium_leaves_original_untouched() {
        let fog = MediumStack::new(MediumType::Homogeneous, 3);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let foggy = ray.with_medium(fog);

        assert_eq!(ray.medium(), MediumStack::VACUUM);
        assert_eq!(foggy.medium(), fog);
        assert_eq!(foggy.origin(), ray.origin());
        assert_eq!(foggy.direction(), ray.direction());
    }
}
