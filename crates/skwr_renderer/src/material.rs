//! Surface materials and BSDF sampling.
//!
//! Materials are a closed set dispatched by `match`. Each variant only
//! knows its own sampling rule.

use crate::primitive::SurfaceInteraction;
use crate::sampler::{random_cosine_direction, random_in_unit_sphere, Sampler};
use crate::Ray;
use skwr_math::{Onb, Spectrum, Vec3};

/// Distance scattered rays are pushed off the surface along their direction.
pub const SHADOW_EPSILON: f32 = 1e-4;

/// Outcome of a successful surface scatter.
#[derive(Debug, Clone, Copy)]
pub struct ScatterResult {
    pub attenuation: Spectrum,
    pub scattered: Ray,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Ideal diffuse reflector.
    Lambertian { albedo: Spectrum },
    /// Mirror with optional fuzz; `roughness` in [0, 1].
    Metal { albedo: Spectrum, roughness: f32 },
    /// Clear glass-like interface.
    Dielectric { ior: f32 },
}

impl Material {
    pub fn lambertian(albedo: Spectrum) -> Self {
        Material::Lambertian { albedo }
    }

    pub fn metal(albedo: Spectrum, roughness: f32) -> Self {
        Material::Metal {
            albedo,
            roughness: roughness.clamp(0.0, 1.0),
        }
    }

    /// - `ior`: Index of refraction (1.0 = air, 1.5 = glass, 2.4 = diamond)
    pub fn dielectric(ior: f32) -> Self {
        Material::Dielectric { ior }
    }

    /// Sample an outgoing ray. `None` means the path is absorbed.
    ///
    /// The scattered ray keeps the incoming ray's medium; crossing into
    /// another medium is resolved by the caller.
    pub fn scatter(
        &self,
        ray_in: &Ray,
        si: &SurfaceInteraction,
        sampler: &mut Sampler,
    ) -> Option<ScatterResult> {
        match *self {
            Material::Lambertian { albedo } => scatter_lambertian(albedo, ray_in, si, sampler),
            Material::Metal { albedo, roughness } => {
                scatter_metal(albedo, roughness, ray_in, si, sampler)
            }
            Material::Dielectric { ior } => scatter_dielectric(ior, ray_in, si, sampler),
        }
    }
}

fn offset_ray(ray_in: &Ray, p: Vec3, direction: Vec3) -> Ray {
    let direction = direction.normalize();
    Ray::in_medium(p + direction * SHADOW_EPSILON, direction, ray_in.medium())
}

fn scatter_lambertian(
    albedo: Spectrum,
    ray_in: &Ray,
    si: &SurfaceInteraction,
    sampler: &mut Sampler,
) -> Option<ScatterResult> {
    let frame = Onb::from_w(si.normal);
    let direction = frame.local(random_cosine_direction(sampler));

    Some(ScatterResult {
        attenuation: albedo,
        scattered: offset_ray(ray_in, si.p, direction),
    })
}

fn scatter_metal(
    albedo: Spectrum,
    roughness: f32,
    ray_in: &Ray,
    si: &SurfaceInteraction,
    sampler: &mut Sampler,
) -> Option<ScatterResult> {
    let reflected = reflect(-si.wo, si.normal);
    let mut direction = reflected;
    if roughness > 0.0 {
        let fuzzed = reflected + roughness * random_in_unit_sphere(sampler);
        // Catch degenerate fuzz
        if fuzzed.length_squared() > 1e-8 {
            direction = fuzzed.normalize();
        }
    }

    // Fuzz that dips below the surface is absorbed
    if direction.dot(si.normal) <= 0.0 {
        return None;
    }

    Some(ScatterResult {
        attenuation: albedo,
        scattered: offset_ray(ray_in, si.p, direction),
    })
}

fn scatter_dielectric(
    ior: f32,
    ray_in: &Ray,
    si: &SurfaceInteraction,
    sampler: &mut Sampler,
) -> Option<ScatterResult> {
    let refraction_ratio = if si.front_face { 1.0 / ior } else { ior };

    let unit_direction = -si.wo;
    let cos_theta = si.wo.dot(si.normal).min(1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    // Check for total internal reflection
    let cannot_refract = refraction_ratio * sin_theta > 1.0;

    let direction = if cannot_refract
        || reflectance(cos_theta, refraction_ratio) > sampler.uniform_float()
    {
        reflect(unit_direction, si.normal)
    } else {
        refract(unit_direction, si.normal, refraction_ratio)
    };

    Some(ScatterResult {
        attenuation: Spectrum::ONE,
        scattered: offset_ray(ray_in, si.p, direction),
    })
}

/// Reflect a vector about a normal.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract a unit vector through a surface.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// Schlick's approximation for reflectance
#[inline]
pub fn reflectance(cosine: f32, refraction_ratio: f32) -> f32 {
    let r0 = ((1.0 - refraction_ratio) / (1.0 + refraction_ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
