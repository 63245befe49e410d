use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use skwr_core::RenderJobRequest;
use std::path::PathBuf;

/// Log levels selectable on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser)]
#[command(name = "skwr")]
#[command(version, about = "Deep image path tracer")]
pub struct Cli {
    /// Set the logging level (RUST_LOG still applies per module)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a scene into a deep image
    Render(RenderArgs),
    /// Print a summary of a deep image file
    Inspect {
        /// Deep image to read
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON render job; replaces the scene and image flags below
    #[arg(long, conflicts_with_all = ["scene", "width", "height", "samples_per_pixel", "threads", "max_depth", "output"])]
    pub job: Option<PathBuf>,

    /// JSON scene description
    #[arg(long, required_unless_present = "job")]
    pub scene: Option<PathBuf>,

    /// Image width in pixels
    #[arg(long, default_value_t = 400)]
    pub width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 225)]
    pub height: u32,

    /// Camera paths per pixel
    #[arg(long = "spp", short = 's', default_value_t = 16)]
    pub samples_per_pixel: u32,

    /// Worker threads, 0 for one per core
    #[arg(long, short = 't', default_value_t = 0)]
    pub threads: u32,

    /// Maximum events per path
    #[arg(long, default_value_t = 16)]
    pub max_depth: u32,

    /// Deep image output path
    #[arg(short, long, default_value = "render.deep")]
    pub output: String,

    /// Also write a flattened 8-bit PNG
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Fixed seed for a reproducible render
    #[arg(long)]
    pub seed: Option<u64>,

    /// Scanlines per chunk in the deep file
    #[arg(long, default_value_t = 16)]
    pub lines_per_chunk: u32,

    /// Write the ZBack channel even for flat samples
    #[arg(long)]
    pub always_zback: bool,

    /// Layer label for logs
    #[arg(long)]
    pub layer: Option<String>,
}

impl RenderArgs {
    /// The job described by the image flags.
    ///
    /// Only meaningful when `--job` is absent.
    pub fn flag_request(&self) -> Option<RenderJobRequest> {
        let scene = self.scene.as_ref()?;
        Some(RenderJobRequest {
            scene_file: scene.to_string_lossy().into_owned(),
            width: self.width,
            height: self.height,
            samples_per_pixel: self.samples_per_pixel,
            num_threads: self.threads,
            max_depth: self.max_depth,
            output_target: self.output.clone(),
            layer_name: self.layer.clone(),
        })
    }
}
