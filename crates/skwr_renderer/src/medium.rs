//! Participating media and the packed active-medium id carried by rays.

use crate::sampler::Sampler;
use skwr_math::{spectrum_average, Aabb, Onb, Spectrum, Vec3};
use std::f32::consts::PI;
use thiserror::Error;

/// Bit position of the type tag inside a [`MediumStack`] value.
pub const MEDIUM_TYPE_SHIFT: u16 = 12;
/// Mask selecting the per-type index inside a [`MediumStack`] value.
pub const MEDIUM_INDEX_MASK: u16 = (1 << MEDIUM_TYPE_SHIFT) - 1;
/// Largest per-type medium index a [`MediumStack`] can address.
pub const MAX_MEDIUM_INDEX: usize = MEDIUM_INDEX_MASK as usize;

/// Kind of participating medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MediumType {
    Vacuum = 0,
    Homogeneous = 1,
    Grid = 2,
}

impl MediumType {
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            0 => Some(MediumType::Vacuum),
            1 => Some(MediumType::Homogeneous),
            2 => Some(MediumType::Grid),
            _ => None,
        }
    }

    pub fn tag(self) -> u16 {
        self as u16
    }
}

/// Packed id of the medium a ray currently travels through.
///
/// High bits hold the [`MediumType`] tag, low bits the index into that
/// type's medium array. Index range is `0..=MAX_MEDIUM_INDEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MediumStack(u16);

impl MediumStack {
    pub const VACUUM: MediumStack = MediumStack(0);

    /// Pack a (type, index) pair.
    ///
    /// # Panics
    ///
    /// If `index` exceeds [`MAX_MEDIUM_INDEX`].
    pub fn new(kind: MediumType, index: usize) -> Self {
        assert!(
            index <= MAX_MEDIUM_INDEX,
            "medium index {index} exceeds maximum {MAX_MEDIUM_INDEX}"
        );
        Self((kind.tag() << MEDIUM_TYPE_SHIFT) | index as u16)
    }

    /// Reinterpret a raw packed value. The tag is not validated.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Type tag bits, possibly not a known [`MediumType`].
    #[inline]
    pub const fn type_tag(self) -> u16 {
        self.0 >> MEDIUM_TYPE_SHIFT
    }

    /// `None` for tags that name no known medium type.
    #[inline]
    pub fn medium_type(self) -> Option<MediumType> {
        MediumType::from_tag(self.type_tag())
    }

    #[inline]
    pub const fn index(self) -> usize {
        (self.0 & MEDIUM_INDEX_MASK) as usize
    }

    pub fn is_vacuum(self) -> bool {
        self.medium_type() == Some(MediumType::Vacuum)
    }
}

/// Media on either side of a primitive's surface.
///
/// `inside` is the side the outward normal points away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediumInterface {
    pub inside: MediumStack,
    pub outside: MediumStack,
}

impl MediumInterface {
    pub fn new(inside: MediumStack, outside: MediumStack) -> Self {
        Self { inside, outside }
    }

    /// Same medium on both sides.
    pub fn uniform(medium: MediumStack) -> Self {
        Self::new(medium, medium)
    }

    pub fn is_transition(&self) -> bool {
        self.inside != self.outside
    }
}

/// A scattering event inside a medium.
#[derive(Debug, Clone, Copy)]
pub struct MediumInteraction {
    pub point: Vec3,
    /// Points back toward the ray origin
    pub wo: Vec3,
    /// Distance along the ray
    pub t: f32,
    /// Opacity accumulated up to the event
    pub alpha: f32,
    /// Henyey-Greenstein anisotropy
    pub g: f32,
    pub sigma_s: Spectrum,
}

#[derive(Error, Debug)]
pub enum MediumError {
    #[error("density grid has {got} voxels, expected {expected}")]
    GridSize { expected: usize, got: usize },

    #[error("density grid resolution must be nonzero on every axis")]
    EmptyGrid,

    #[error("density values must be finite and non-negative")]
    InvalidDensity,
}

/// Uniform fog with constant coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HomogeneousMedium {
    pub sigma_a: Spectrum,
    pub sigma_s: Spectrum,
    pub g: f32,
}

impl HomogeneousMedium {
    pub fn new(sigma_a: Spectrum, sigma_s: Spectrum, g: f32) -> Self {
        Self {
            sigma_a: sigma_a.max(Spectrum::ZERO),
            sigma_s: sigma_s.max(Spectrum::ZERO),
            g: g.clamp(-1.0, 1.0),
        }
    }

    /// Extinction coefficient.
    pub fn sigma_t(&self) -> Spectrum {
        self.sigma_a + self.sigma_s
    }
}

/// Heterogeneous medium defined by a density voxel grid over a box.
///
/// Coefficients are scaled by the trilinearly interpolated density. The
/// extinction used for tracking is the channel average of `sigma_a + sigma_s`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMedium {
    bounds: Aabb,
    resolution: [usize; 3],
    density: Vec<f32>,
    sigma_s: Spectrum,
    sigma_t: f32,
    g: f32,
    max_density: f32,
}

impl GridMedium {
    /// `density` is laid out x-fastest, then y, then z.
    pub fn new(
        bounds: Aabb,
        resolution: [usize; 3],
        density: Vec<f32>,
        sigma_a: Spectrum,
        sigma_s: Spectrum,
        g: f32,
    ) -> Result<Self, MediumError> {
        if resolution.contains(&0) {
            return Err(MediumError::EmptyGrid);
        }
        let expected = resolution[0] * resolution[1] * resolution[2];
        if density.len() != expected {
            return Err(MediumError::GridSize {
                expected,
                got: density.len(),
            });
        }
        if density.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(MediumError::InvalidDensity);
        }

        let sigma_a = sigma_a.max(Spectrum::ZERO);
        let sigma_s = sigma_s.max(Spectrum::ZERO);
        let sigma_t = sigma_a + sigma_s;
        if sigma_t.max_element() - sigma_t.min_element() > 1e-6 {
            log::warn!(
                "Grid medium extinction {:?} is not spectrally uniform, tracking with its average",
                sigma_t
            );
        }
        let max_density = density.iter().copied().fold(0.0, f32::max);

        Ok(Self {
            bounds,
            resolution,
            density,
            sigma_s,
            sigma_t: spectrum_average(sigma_t),
            g: g.clamp(-1.0, 1.0),
            max_density,
        })
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn sigma_s(&self) -> Spectrum {
        self.sigma_s
    }

    pub fn sigma_t(&self) -> f32 {
        self.sigma_t
    }

    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn max_density(&self) -> f32 {
        self.max_density
    }

    fn voxel(&self, x: i64, y: i64, z: i64) -> f32 {
        let [nx, ny, nz] = self.resolution;
        if x < 0 || y < 0 || z < 0 || x >= nx as i64 || y >= ny as i64 || z >= nz as i64 {
            return 0.0;
        }
        self.density[(z as usize * ny + y as usize) * nx + x as usize]
    }

    /// Trilinearly interpolated density at world point `p`.
    ///
    /// Voxel values sit at cell centers; points outside the box have zero
    /// density.
    pub fn density(&self, p: Vec3) -> f32 {
        let min = self.bounds.min();
        let extent = self.bounds.extent();
        let local = (p - min) / extent;
        if !(0.0..=1.0).contains(&local.x)
            || !(0.0..=1.0).contains(&local.y)
            || !(0.0..=1.0).contains(&local.z)
        {
            return 0.0;
        }

        let [nx, ny, nz] = self.resolution;
        let g = Vec3::new(
            local.x * nx as f32 - 0.5,
            local.y * ny as f32 - 0.5,
            local.z * nz as f32 - 0.5,
        );
        let base = g.floor();
        let d = g - base;
        let (x, y, z) = (base.x as i64, base.y as i64, base.z as i64);

        let lerp = |t: f32, a: f32, b: f32| (1.0 - t) * a + t * b;
        let d00 = lerp(d.x, self.voxel(x, y, z), self.voxel(x + 1, y, z));
        let d10 = lerp(d.x, self.voxel(x, y + 1, z), self.voxel(x + 1, y + 1, z));
        let d01 = lerp(d.x, self.voxel(x, y, z + 1), self.voxel(x + 1, y, z + 1));
        let d11 = lerp(d.x, self.voxel(x, y + 1, z + 1), self.voxel(x + 1, y + 1, z + 1));
        let d0 = lerp(d.y, d00, d10);
        let d1 = lerp(d.y, d01, d11);
        lerp(d.z, d0, d1)
    }
}

/// Sample an incident direction from the Henyey-Greenstein phase function.
///
/// `wo` points back along the incoming ray; positive `g` favors continuing
/// along `-wo`.
pub fn sample_henyey_greenstein(wo: Vec3, g: f32, sampler: &mut Sampler) -> Vec3 {
    let u1 = sampler.uniform_float();
    let u2 = sampler.uniform_float();

    let cos_theta = if g.abs() < 1e-3 {
        1.0 - 2.0 * u1
    } else {
        let sqr = (1.0 - g * g) / (1.0 + g - 2.0 * g * u1);
        -(1.0 + g * g - sqr * sqr) / (2.0 * g)
    };
    let cos_theta = cos_theta.clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * u2;

    // cos_theta is measured against wo, so positive g lands near -wo
    let frame = Onb::from_w(wo);
    frame
        .local(Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta))
        .normalize()
}
