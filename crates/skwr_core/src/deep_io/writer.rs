//! Deep image encoding.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::DeepImageBuffer;

use super::format::{ChannelDesc, DeepHeader, PixelType};
use super::{DeepImageError, DeepImageResult, SampleLayout};

/// When to emit the `ZBack` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZBackMode {
    /// Only if some sample has a nonzero depth extent.
    #[default]
    Auto,
    /// Always, even for flat samples.
    Always,
}

/// Encoder settings.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Scanlines grouped under one sample-count table.
    pub lines_per_chunk: u32,
    pub z_back: ZBackMode,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            lines_per_chunk: 16,
            z_back: ZBackMode::Auto,
        }
    }
}

/// Save a deep image to disk with default options.
pub fn save_deep_image(buffer: &DeepImageBuffer, path: impl AsRef<Path>) -> DeepImageResult<()> {
    save_deep_image_with(buffer, path, &SaveOptions::default())
}

/// Save a deep image to disk.
pub fn save_deep_image_with(
    buffer: &DeepImageBuffer,
    path: impl AsRef<Path>,
    options: &SaveOptions,
) -> DeepImageResult<()> {
    let path = path.as_ref();
    log::info!(
        "Saving deep image {} ({}x{}, {} samples)",
        path.display(),
        buffer.width(),
        buffer.height(),
        buffer.total_sample_count()
    );
    let mut writer = BufWriter::new(File::create(path)?);
    write_deep_image(buffer, &mut writer, options)?;
    writer.flush()?;
    Ok(())
}

/// Encode a deep image to any byte sink.
///
/// Nothing is written if a sample has a NaN depth or `z_back < z_front`.
pub fn write_deep_image<W: Write>(
    buffer: &DeepImageBuffer,
    mut writer: W,
    options: &SaveOptions,
) -> DeepImageResult<()> {
    if options.lines_per_chunk == 0 {
        return Err(DeepImageError::InvalidHeader(
            "lines per chunk must be nonzero".into(),
        ));
    }

    let write_z_back = match options.z_back {
        ZBackMode::Always => true,
        ZBackMode::Auto => buffer.has_volumetric_samples(),
    };

    let mut channels = vec![
        ChannelDesc::new("R", PixelType::Half),
        ChannelDesc::new("G", PixelType::Half),
        ChannelDesc::new("B", PixelType::Half),
        ChannelDesc::new("A", PixelType::Half),
        ChannelDesc::new("Z", PixelType::Float),
    ];
    if write_z_back {
        channels.push(ChannelDesc::new("ZBack", PixelType::Float));
    }

    let header = DeepHeader {
        min_x: 0,
        min_y: 0,
        width: buffer.width(),
        height: buffer.height(),
        lines_per_chunk: options.lines_per_chunk,
        channels,
    };

    // Flat channel arrays in the same prefix-sum layout the reader uses.
    let layout = SampleLayout::from_buffer(buffer);
    let total = layout.total();
    let mut planes: Vec<Vec<f32>> = vec![vec![0.0; total]; header.channels.len()];

    for (y, row) in buffer.rows().enumerate() {
        for (x, pixel) in row.iter().enumerate() {
            let span = layout.range(x as i64, y as i64);
            for (slot, sample) in span.zip(pixel.iter()) {
                if !(sample.z_back >= sample.z_front) {
                    return Err(DeepImageError::InvalidDepth {
                        x: x as i64,
                        y: y as i64,
                        z_front: sample.z_front,
                        z_back: sample.z_back,
                    });
                }
                planes[0][slot] = sample.color.x;
                planes[1][slot] = sample.color.y;
                planes[2][slot] = sample.color.z;
                planes[3][slot] = sample.alpha;
                planes[4][slot] = sample.z_front;
                if write_z_back {
                    planes[5][slot] = sample.z_back;
                }
            }
        }
    }

    header.write_to(&mut writer)?;

    let width = buffer.width() as usize;
    let height = buffer.height() as usize;
    let lines_per_chunk = options.lines_per_chunk as usize;
    let chunk_count = height.div_ceil(lines_per_chunk);
    writer.write_all(&(chunk_count as u32).to_le_bytes())?;

    let counts = layout.counts();
    let mut bytes = Vec::new();
    for first_line in (0..height).step_by(lines_per_chunk) {
        let lines = lines_per_chunk.min(height - first_line);
        bytes.clear();
        bytes.extend_from_slice(&(first_line as u32).to_le_bytes());
        bytes.extend_from_slice(&(lines as u32).to_le_bytes());
        for count in &counts[first_line * width..(first_line + lines) * width] {
            bytes.extend_from_slice(&count.to_le_bytes());
        }

        let span = layout.rows_range(first_line, lines);
        for (channel, plane) in header.channels.iter().zip(&planes) {
            channel.pixel_type.encode(&plane[span.clone()], &mut bytes);
        }
        writer.write_all(&bytes)?;
    }

    Ok(())
}
