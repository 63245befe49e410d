//! Skewer renderer - CPU deep path tracing
//!
//! Traces stochastic light paths through surfaces and participating media
//! and records one depth-resolved sample per camera path into a
//! [`DeepImageBuffer`](skwr_core::DeepImageBuffer).

mod integrator;
mod material;
pub mod medium;
mod primitive;
mod ray;
mod renderer;
pub mod sampler;
mod scene;
mod sphere;
mod triangle;
pub mod volume;

pub use integrator::trace_path;
pub use material::{reflect, reflectance, refract, Material, ScatterResult, SHADOW_EPSILON};
pub use medium::{
    GridMedium, HomogeneousMedium, MediumError, MediumInteraction, MediumInterface, MediumStack,
    MediumType,
};
pub use primitive::{Intersect, Primitive, PrimitiveList, SurfaceInteraction};
pub use ray::Ray;
pub use renderer::{render_deep, render_job, RayGenerator, RenderConfig, RenderError, RenderResult};
pub use sampler::Sampler;
pub use scene::{MediaSet, Scene};
pub use sphere::Sphere;
pub use triangle::Triangle;
pub use volume::sample_medium;

/// Re-export common math types from skwr_math
pub use skwr_math::{Spectrum, Vec3};
