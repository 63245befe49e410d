//! One render job from request to files on disk.

use anyhow::{Context, Result};
use skwr_core::deep_io::{load_deep_image, read_deep_header, SaveOptions, ZBackMode};
use skwr_core::preview::save_preview_png;
use skwr_core::{RenderJobRequest, RenderJobResponse};
use skwr_renderer::{render_job, RenderConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::camera::Camera;
use crate::scene_file::SceneDescription;

/// Session settings that are not part of a job request.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub seed: Option<u64>,
    pub preview: Option<PathBuf>,
    pub save: SaveOptions,
}

impl SessionOptions {
    pub fn new(seed: Option<u64>, preview: Option<PathBuf>, lines_per_chunk: u32, always_zback: bool) -> Self {
        Self {
            seed,
            preview,
            save: SaveOptions {
                lines_per_chunk,
                z_back: if always_zback {
                    ZBackMode::Always
                } else {
                    ZBackMode::Auto
                },
            },
        }
    }
}

/// Read a JSON job request.
pub fn load_job(path: &Path) -> Result<RenderJobRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse job {}", path.display()))
}

/// Render `request` and return where the deep image was written.
pub fn run_job(request: &RenderJobRequest, options: &SessionOptions) -> Result<String> {
    request.validate()?;

    let description = SceneDescription::load(Path::new(&request.scene_file))?;
    let loaded = description.build()?;
    let camera = Camera::new(&loaded.camera, request.width, request.height);

    let config = RenderConfig {
        seed: options.seed,
        background: loaded.background,
        ..Default::default()
    };
    let buffer = render_job(&loaded.scene, &camera, request, &config, &options.save)
        .context("Render failed")?;

    if let Some(preview) = &options.preview {
        save_preview_png(&buffer, preview)
            .with_context(|| format!("Failed to write preview {}", preview.display()))?;
        log::info!("Wrote preview {}", preview.display());
    }

    Ok(request.output_target.clone())
}

/// Run a job and fold the outcome into a response.
pub fn execute(request: &RenderJobRequest, options: &SessionOptions) -> RenderJobResponse {
    match run_job(request, options) {
        Ok(uri) => RenderJobResponse::succeeded(uri),
        Err(err) => {
            log::error!("Render job failed: {err:#}");
            RenderJobResponse::failed(format!("{err:#}"))
        }
    }
}

/// What `skwr inspect` reports about a deep file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepFileSummary {
    pub width: u32,
    pub height: u32,
    pub total_samples: usize,
    pub covered_pixels: usize,
    pub max_per_pixel: usize,
    /// `ZBack` is declared in the file's channel list
    pub has_z_back: bool,
    /// Some sample has a nonzero depth extent
    pub volumetric: bool,
}

pub fn inspect_deep(path: &Path) -> Result<DeepFileSummary> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let header = read_deep_header(BufReader::new(file))
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    let buffer =
        load_deep_image(path).with_context(|| format!("Failed to load {}", path.display()))?;

    Ok(DeepFileSummary {
        width: buffer.width(),
        height: buffer.height(),
        total_samples: buffer.total_sample_count(),
        covered_pixels: buffer.sample_counts().iter().filter(|&&c| c > 0).count(),
        max_per_pixel: buffer.max_samples_per_pixel(),
        has_z_back: header.has_channel("ZBack"),
        volumetric: buffer.has_volumetric_samples(),
    })
}
