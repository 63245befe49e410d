//! skwr - command line session for the deep renderer.

mod camera;
mod cli;
mod scene_file;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

use cli::{Cli, Command, RenderArgs};
use session::SessionOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level.into())
        .init();

    match cli.command {
        Command::Render(args) => render(&args),
        Command::Inspect { path } => inspect(&path),
    }
}

fn render(args: &RenderArgs) -> Result<()> {
    let request = match &args.job {
        Some(job) => session::load_job(job)?,
        None => args
            .flag_request()
            .context("--scene is required without --job")?,
    };
    let options = SessionOptions::new(
        args.seed,
        args.preview.clone(),
        args.lines_per_chunk,
        args.always_zback,
    );

    log::info!("Starting render of {}", request.scene_file);
    let response = session::execute(&request, &options);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.success {
        Ok(())
    } else {
        anyhow::bail!("render job failed")
    }
}

fn inspect(path: &Path) -> Result<()> {
    let summary = session::inspect_deep(path)?;

    println!("{}", path.display());
    println!("  resolution:     {}x{}", summary.width, summary.height);
    println!("  total samples:  {}", summary.total_samples);
    println!(
        "  covered pixels: {} of {}",
        summary.covered_pixels,
        summary.width as usize * summary.height as usize
    );
    println!("  max per pixel:  {}", summary.max_per_pixel);
    println!("  ZBack channel:  {}", summary.has_z_back);
    println!("  volumetric:     {}", summary.volumetric);
    Ok(())
}
