//! Parallel deep render driver.
//!
//! Rows of the deep buffer are handed to rayon workers, so each worker owns
//! a disjoint set of pixels and its own sampler. Scene data is only read.

use crate::integrator::trace_path;
use crate::primitive::Intersect;
use crate::sampler::{mix_seed, Sampler};
use crate::{Ray, Scene};
use rayon::prelude::*;
use skwr_core::deep_io::{save_deep_image_with, DeepImageError, SaveOptions};
use skwr_core::job::{JobError, RenderJobRequest};
use skwr_core::{DeepImageBuffer, DeepPixel};
use skwr_math::Spectrum;
use std::time::Instant;
use thiserror::Error;

/// Errors that can occur while setting up or finishing a render.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid render settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to write deep image: {0}")]
    Io(#[from] DeepImageError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Render configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Camera paths traced per pixel
    pub samples_per_pixel: u32,
    /// Maximum number of events along one path
    pub max_depth: u32,
    /// Worker threads, 0 for one per core
    pub num_threads: usize,
    /// Fixed seed for reproducible renders; fresh entropy when `None`
    pub seed: Option<u64>,
    /// Radiance of rays that escape the scene
    pub background: Spectrum,
    /// Minimum hit distance, guards against self-intersection
    pub ray_epsilon: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            samples_per_pixel: 16,
            max_depth: 16,
            num_threads: 0,
            seed: None,
            background: Spectrum::ONE,
            ray_epsilon: 1e-3,
        }
    }
}

impl RenderConfig {
    /// Settings carried by a render job; everything else keeps its default.
    pub fn from_job(request: &RenderJobRequest) -> Self {
        Self::default().with_job(request)
    }

    /// Replace the fields a render job controls.
    pub fn with_job(self, request: &RenderJobRequest) -> Self {
        Self {
            samples_per_pixel: request.samples_per_pixel,
            max_depth: request.max_depth,
            num_threads: request.num_threads as usize,
            ..self
        }
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidSettings(
                "samples per pixel must be at least 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidSettings(
                "max depth must be at least 1".into(),
            ));
        }
        if !(self.ray_epsilon >= 0.0) {
            return Err(RenderError::InvalidSettings(format!(
                "ray epsilon must be non-negative, got {}",
                self.ray_epsilon
            )));
        }
        Ok(())
    }
}

/// Source of primary rays for pixel (x, y).
///
/// Returning `None` skips that camera sample.
pub trait RayGenerator: Sync {
    fn generate_ray(&self, x: u32, y: u32, sampler: &mut Sampler) -> Option<Ray>;
}

impl<F> RayGenerator for F
where
    F: Fn(u32, u32, &mut Sampler) -> Option<Ray> + Sync,
{
    fn generate_ray(&self, x: u32, y: u32, sampler: &mut Sampler) -> Option<Ray> {
        self(x, y, sampler)
    }
}

/// Render `scene` into a fresh deep buffer.
///
/// Primary rays start in the scene's camera medium.
pub fn render_deep<A, G>(
    scene: &Scene<A>,
    camera: &G,
    width: u32,
    height: u32,
    config: &RenderConfig,
) -> RenderResult<DeepImageBuffer>
where
    A: Intersect,
    G: RayGenerator + ?Sized,
{
    config.validate()?;
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSettings(format!(
            "image size must be nonzero, got {width}x{height}"
        )));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()?;

    log::info!(
        "Rendering {}x{} at {} spp, max depth {}, {} threads",
        width,
        height,
        config.samples_per_pixel,
        config.max_depth,
        pool.current_num_threads()
    );
    let start = Instant::now();

    let mut buffer = DeepImageBuffer::new(width, height);
    pool.install(|| {
        buffer
            .pixels_mut()
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each_init(
                || Sampler::for_worker(rayon::current_thread_index().unwrap_or(0) as u64),
                |worker_sampler, (y, row)| match config.seed {
                    Some(seed) => {
                        let mut row_sampler = Sampler::with_seed(mix_seed(seed, y as u64));
                        render_row(scene, camera, y as u32, row, config, &mut row_sampler);
                    }
                    None => render_row(scene, camera, y as u32, row, config, worker_sampler),
                },
            );
    });

    log::info!(
        "Rendered {} deep samples in {:.2?}",
        buffer.total_sample_count(),
        start.elapsed()
    );
    Ok(buffer)
}

fn render_row<A, G>(
    scene: &Scene<A>,
    camera: &G,
    y: u32,
    row: &mut [DeepPixel],
    config: &RenderConfig,
    sampler: &mut Sampler,
) where
    A: Intersect,
    G: RayGenerator + ?Sized,
{
    for (x, pixel) in row.iter_mut().enumerate() {
        for _ in 0..config.samples_per_pixel {
            let Some(ray) = camera.generate_ray(x as u32, y, sampler) else {
                continue;
            };
            let ray = ray.with_medium(scene.camera_medium());
            if let Some(sample) = trace_path(ray, scene, config, sampler) {
                pixel.push(sample);
            }
        }
    }
}

/// Render a job request and write the deep image to its output target.
///
/// The request overrides sample count, depth and thread count in `config`.
pub fn render_job<A, G>(
    scene: &Scene<A>,
    camera: &G,
    request: &RenderJobRequest,
    config: &RenderConfig,
    options: &SaveOptions,
) -> RenderResult<DeepImageBuffer>
where
    A: Intersect,
    G: RayGenerator + ?Sized,
{
    request.validate()?;
    if let Some(layer) = &request.layer_name {
        log::info!("Rendering layer {layer}");
    }
    let config = config.clone().with_job(request);
    let buffer = render_deep(scene, camera, request.width, request.height, &config)?;
    save_deep_image_with(&buffer, &request.output_target, options)?;
    Ok(buffer)
}
