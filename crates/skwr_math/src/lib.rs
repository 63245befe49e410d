// Re-export glam for convenience
pub use glam::*;

// Skewer math types
mod aabb;
mod interval;
mod onb;

pub use aabb::Aabb;
pub use interval::Interval;
pub use onb::Onb;

/// Radiometric quantity carried per color band (linear RGB).
///
/// Elementwise `+`, `*` and scalar scaling come from glam.
pub type Spectrum = Vec3;

/// Average of the three bands.
#[inline]
pub fn spectrum_average(s: Spectrum) -> f32 {
    (s.x + s.y + s.z) / 3.0
}
