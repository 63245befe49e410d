//! Deep image decoding.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use skwr_math::Spectrum;

use crate::{DeepImageBuffer, DeepSample};

use super::format::{ByteReader, DeepHeader, CHANNEL_NAMES};
use super::{DeepImageError, DeepImageResult, SampleLayout};

/// Load a deep image from disk.
///
/// Fails without producing a buffer if the file is unreadable, malformed,
/// or lacks any of the `R`, `G`, `B`, `A`, `Z` channels.
pub fn load_deep_image(path: impl AsRef<Path>) -> DeepImageResult<DeepImageBuffer> {
    let path = path.as_ref();
    log::info!("Loading deep image {}", path.display());
    let file = File::open(path)?;
    read_deep_image(BufReader::new(file))
}

/// Read only the header (data window and channel list).
pub fn read_deep_header<R: Read>(reader: R) -> DeepImageResult<DeepHeader> {
    DeepHeader::read_from(&mut ByteReader::new(reader))
}

/// Decode a deep image from any byte stream.
pub fn read_deep_image<R: Read>(reader: R) -> DeepImageResult<DeepImageBuffer> {
    let mut r = ByteReader::new(reader);
    let header = DeepHeader::read_from(&mut r)?;

    let missing = header.missing_required();
    if !missing.is_empty() {
        return Err(DeepImageError::MissingChannels(missing));
    }

    log::info!("    Resolution: {}x{}", header.width, header.height);
    log::debug!(
        "    Data window: ({}, {}) - ({}, {})",
        header.min_x,
        header.min_y,
        header.max_x(),
        header.max_y()
    );

    let has_z_back = header.has_channel("ZBack");
    if has_z_back {
        log::info!("    Volumetric samples detected (ZBack channel present)");
    }
    for channel in &header.channels {
        if !CHANNEL_NAMES.contains(&channel.name.as_str()) {
            log::warn!("    Skipping unknown channel {}", channel.name);
        }
    }

    // Counts for the whole image plus the raw channel bytes of every chunk.
    let (counts, chunks) = read_chunks(&mut r, &header)?;
    let layout = SampleLayout::from_counts(
        header.min_x,
        header.min_y,
        header.width,
        header.height,
        counts,
    )?;
    let total = layout.total();
    log::info!("    Total samples: {}", total);

    // Flat per-channel arrays, allocated once for the grand total.
    let mut planes = Planes::new(total, has_z_back);
    for chunk in &chunks {
        let span = layout.rows_range(chunk.first_line, chunk.lines);
        for (channel, bytes) in header.channels.iter().zip(&chunk.channel_bytes) {
            let Some(bytes) = bytes else { continue };
            if let Some(plane) = planes.plane_mut(&channel.name) {
                channel.pixel_type.decode(bytes, &mut plane[span.clone()]);
            }
        }
    }
    drop(chunks);

    planes.into_buffer(&header, &layout)
}

/// Raw payload of one chunk. Unknown channels keep `None`.
struct RawChunk {
    first_line: usize,
    lines: usize,
    channel_bytes: Vec<Option<Vec<u8>>>,
}

fn read_chunks<R: Read>(
    r: &mut ByteReader<R>,
    header: &DeepHeader,
) -> DeepImageResult<(Vec<u32>, Vec<RawChunk>)> {
    let width = header.width as usize;
    let height = header.height as usize;
    let mut counts: Vec<u32> = Vec::with_capacity(header.pixel_count()?.min(1 << 24));
    let mut chunks = Vec::new();

    let chunk_count = r.read_u32("chunk count")?;
    let mut next_line = 0usize;

    for _ in 0..chunk_count {
        let first_line = r.read_u32("chunk position")? as usize;
        let lines = r.read_u32("chunk line count")? as usize;
        if first_line != next_line
            || lines == 0
            || lines > header.lines_per_chunk as usize
            || first_line + lines > height
        {
            return Err(DeepImageError::InvalidHeader(format!(
                "chunk covering lines {first_line}..{} out of sequence",
                first_line + lines
            )));
        }
        next_line += lines;

        let table_len = lines
            .checked_mul(width)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| {
                DeepImageError::InvalidHeader("sample count table size overflows".into())
            })?;
        let table = r.read_vec(table_len, "sample count table")?;
        let mut chunk_total = 0u64;
        for b in table.chunks_exact(4) {
            let count = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            chunk_total += count as u64;
            counts.push(count);
        }
        log::trace!(
            "    Chunk lines {}..{}: {} samples",
            first_line,
            first_line + lines,
            chunk_total
        );

        let mut channel_bytes = Vec::with_capacity(header.channels.len());
        for channel in &header.channels {
            let len = usize::try_from(chunk_total)
                .ok()
                .and_then(|n| n.checked_mul(channel.pixel_type.size()))
                .ok_or_else(|| {
                    DeepImageError::InvalidHeader("chunk sample count overflows".into())
                })?;
            let bytes = r.read_vec(len, &channel.name)?;
            if CHANNEL_NAMES.contains(&channel.name.as_str()) {
                channel_bytes.push(Some(bytes));
            } else {
                channel_bytes.push(None);
            }
        }

        chunks.push(RawChunk {
            first_line,
            lines,
            channel_bytes,
        });
    }

    if next_line != height {
        return Err(DeepImageError::Truncated(format!(
            "chunks cover {next_line} of {height} lines"
        )));
    }

    Ok((counts, chunks))
}

/// Decoded channel arrays in the flat sample layout.
struct Planes {
    r: Vec<f32>,
    g: Vec<f32>,
    b: Vec<f32>,
    a: Vec<f32>,
    z: Vec<f32>,
    z_back: Option<Vec<f32>>,
}

impl Planes {
    fn new(total: usize, has_z_back: bool) -> Self {
        Self {
            r: vec![0.0; total],
            g: vec![0.0; total],
            b: vec![0.0; total],
            a: vec![0.0; total],
            z: vec![0.0; total],
            z_back: has_z_back.then(|| vec![0.0; total]),
        }
    }

    fn plane_mut(&mut self, name: &str) -> Option<&mut Vec<f32>> {
        match name {
            "R" => Some(&mut self.r),
            "G" => Some(&mut self.g),
            "B" => Some(&mut self.b),
            "A" => Some(&mut self.a),
            "Z" => Some(&mut self.z),
            "ZBack" => self.z_back.as_mut(),
            _ => None,
        }
    }

    /// Regroup the flat arrays into per-pixel sample lists.
    ///
    /// Depths are kept exactly as stored. A NaN depth or a `ZBack` in front
    /// of `Z` is rejected.
    fn into_buffer(
        self,
        header: &DeepHeader,
        layout: &SampleLayout,
    ) -> DeepImageResult<DeepImageBuffer> {
        let mut buffer = DeepImageBuffer::new(header.width, header.height);
        let (min_x, min_y) = (header.min_x as i64, header.min_y as i64);

        for y in min_y..=header.max_y() {
            for x in min_x..=header.max_x() {
                let span = layout.range(x, y);
                if span.is_empty() {
                    continue;
                }

                let pixel = buffer.pixel_mut((x - min_x) as u32, (y - min_y) as u32);
                pixel.samples.reserve(span.len());
                for i in span {
                    let color = Spectrum::new(self.r[i], self.g[i], self.b[i]);
                    let z_front = self.z[i];
                    let z_back = self.z_back.as_ref().map_or(z_front, |z_back| z_back[i]);
                    if !(z_back >= z_front) {
                        return Err(DeepImageError::InvalidDepth {
                            x,
                            y,
                            z_front,
                            z_back,
                        });
                    }
                    pixel.push(DeepSample {
                        color,
                        alpha: self.a[i],
                        z_front,
                        z_back,
                    });
                }
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;
    use std::io::Cursor;

    /// Hand-assembled file bytes, independent of the writer.
    struct FileBuilder {
        bytes: Vec<u8>,
    }

    impl FileBuilder {
        fn new(min_x: i32, min_y: i32, width: u32, height: u32, lines_per_chunk: u32) -> Self {
            let mut bytes = b"SKWRDEEP".to_vec();
            bytes.extend_from_slice(&1u32.to_le_bytes()); // version
            bytes.extend_from_slice(&min_x.to_le_bytes());
            bytes.extend_from_slice(&min_y.to_le_bytes());
            bytes.extend_from_slice(&width.to_le_bytes());
            bytes.extend_from_slice(&height.to_le_bytes());
            bytes.extend_from_slice(&lines_per_chunk.to_le_bytes());
            Self { bytes }
        }

        fn u32(mut self, v: u32) -> Self {
            self.bytes.extend_from_slice(&v.to_le_bytes());
            self
        }

        fn channels(mut self, channels: &[(&str, u32)]) -> Self {
            self = self.u32(channels.len() as u32);
            for (name, code) in channels {
                self.bytes
                    .extend_from_slice(&(name.len() as u16).to_le_bytes());
                self.bytes.extend_from_slice(name.as_bytes());
                self = self.u32(*code);
            }
            self
        }

        fn halves(mut self, values: &[f32]) -> Self {
            for v in values {
                self.bytes
                    .extend_from_slice(&f16::from_f32(*v).to_le_bytes());
            }
            self
        }

        fn floats(mut self, values: &[f32]) -> Self {
            for v in values {
                self.bytes.extend_from_slice(&v.to_le_bytes());
            }
            self
        }

        fn finish(self) -> Cursor<Vec<u8>> {
            Cursor::new(self.bytes)
        }
    }

    const RGBAZ: [(&str, u32); 5] = [("R", 1), ("G", 1), ("B", 1), ("A", 1), ("Z", 2)];

    #[test]
    fn test_two_by_one_with_empty_pixel() {
        let file = FileBuilder::new(0, 0, 2, 1, 1)
            .channels(&RGBAZ)
            .u32(1) // chunk count
            .u32(0) // first line
            .u32(1) // line count
            .u32(2) // pixel (0, 0)
            .u32(0) // pixel (1, 0)
            .halves(&[0.5, 1.0]) // R
            .halves(&[0.25, 0.0]) // G
            .halves(&[0.0, 2.0]) // B
            .halves(&[1.0, 0.5]) // A
            .floats(&[3.0, 1.5]) // Z
            .finish();

        let buffer = read_deep_image(file).unwrap();
        assert_eq!(buffer.width(), 2);
        assert_eq!(buffer.height(), 1);
        assert_eq!(buffer.pixel(0, 0).len(), 2);
        assert_eq!(buffer.pixel(1, 0).len(), 0);
        assert_eq!(buffer.total_sample_count(), 2);

        let samples = &buffer.pixel(0, 0).samples;
        assert_eq!(samples[0].color, Spectrum::new(0.5, 0.25, 0.0));
        assert_eq!(samples[0].alpha, 1.0);
        assert_eq!(samples[0].z_front, 3.0);
        assert_eq!(samples[0].z_back, 3.0);
        assert_eq!(samples[1].color, Spectrum::new(1.0, 0.0, 2.0));
        assert_eq!(samples[1].alpha, 0.5);
        assert_eq!(samples[1].z_front, 1.5);
        assert_eq!(samples[1].z_back, samples[1].z_front);
    }

    #[test]
    fn test_missing_z_is_format_error() {
        let file = FileBuilder::new(0, 0, 2, 1, 1)
            .channels(&[("R", 1), ("G", 1), ("B", 1), ("A", 1)])
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(1)
            .u32(0)
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .finish();

        let err = read_deep_image(file).unwrap_err();
        assert!(err.is_format_error());
        assert_eq!(err.missing_channels(), ["Z".to_string()]);
        assert!(err.to_string().contains('Z'));
    }

    #[test]
    fn test_every_missing_channel_is_named() {
        let file = FileBuilder::new(0, 0, 1, 1, 1)
            .channels(&[("G", 1), ("Z", 2)])
            .finish();

        let err = read_deep_image(file).unwrap_err();
        assert_eq!(err.missing_channels(), ["R", "B", "A"]);
        assert_eq!(err.to_string(), "Missing required channels: R, B, A");
    }

    #[test]
    fn test_zback_and_extra_channel() {
        // Channel order differs from the writer's; an unknown channel sits
        // between known ones and must be skipped.
        let file = FileBuilder::new(0, 0, 1, 1, 4)
            .channels(&[
                ("Z", 2),
                ("A", 1),
                ("N.x", 2),
                ("B", 1),
                ("G", 1),
                ("R", 1),
                ("ZBack", 2),
            ])
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(1)
            .floats(&[2.0]) // Z
            .halves(&[0.5]) // A
            .floats(&[99.0]) // N.x
            .halves(&[0.75]) // B
            .halves(&[0.5]) // G
            .halves(&[0.25]) // R
            .floats(&[4.0]) // ZBack
            .finish();

        let buffer = read_deep_image(file).unwrap();
        let s = buffer.pixel(0, 0).samples[0];
        assert_eq!(s.color, Spectrum::new(0.25, 0.5, 0.75));
        assert_eq!(s.alpha, 0.5);
        assert_eq!(s.z_front, 2.0);
        assert_eq!(s.z_back, 4.0);
    }

    #[test]
    fn test_data_window_origin_and_multiple_chunks() {
        // 2x3 image whose data window starts at (-1, 5), one line per chunk
        let file = FileBuilder::new(-1, 5, 2, 3, 1)
            .channels(&RGBAZ)
            .u32(3)
            // line 0: counts 0, 1
            .u32(0)
            .u32(1)
            .u32(0)
            .u32(1)
            .halves(&[0.1])
            .halves(&[0.2])
            .halves(&[0.3])
            .halves(&[1.0])
            .floats(&[10.0])
            // line 1: empty
            .u32(1)
            .u32(1)
            .u32(0)
            .u32(0)
            // line 2: counts 2, 0
            .u32(2)
            .u32(1)
            .u32(2)
            .u32(0)
            .halves(&[1.0, 2.0])
            .halves(&[1.0, 2.0])
            .halves(&[1.0, 2.0])
            .halves(&[1.0, 1.0])
            .floats(&[20.0, 30.0])
            .finish();

        let buffer = read_deep_image(file).unwrap();
        assert_eq!(buffer.sample_counts(), vec![0, 1, 0, 0, 2, 0]);
        assert_eq!(buffer.pixel(1, 0).samples[0].z_front, 10.0);
        assert_eq!(buffer.pixel(0, 2).samples[0].z_front, 20.0);
        assert_eq!(buffer.pixel(0, 2).samples[1].z_front, 30.0);
        assert_eq!(buffer.pixel(0, 2).samples[1].color, Spectrum::splat(2.0));
    }

    #[test]
    fn test_uint_and_float_color_channels_widen() {
        let file = FileBuilder::new(0, 0, 1, 1, 1)
            .channels(&[("R", 2), ("G", 0), ("B", 1), ("A", 1), ("Z", 1)])
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(1)
            .floats(&[0.123_456_7])
            .u32(3)
            .halves(&[0.5])
            .halves(&[1.0])
            .halves(&[8.0])
            .finish();

        let s = read_deep_image(file).unwrap().pixel(0, 0).samples[0];
        assert_eq!(s.color.x, 0.123_456_7);
        assert_eq!(s.color.y, 3.0);
        assert_eq!(s.z_front, 8.0);
    }

    #[test]
    fn test_truncated_channel_data() {
        let file = FileBuilder::new(0, 0, 1, 1, 1)
            .channels(&RGBAZ)
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(3)
            .halves(&[1.0, 1.0, 1.0])
            .halves(&[1.0])
            .finish();

        assert!(matches!(
            read_deep_image(file),
            Err(DeepImageError::Truncated(_))
        ));
    }

    #[test]
    fn test_missing_chunks() {
        let file = FileBuilder::new(0, 0, 1, 2, 1)
            .channels(&RGBAZ)
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(0)
            .finish();

        assert!(matches!(
            read_deep_image(file),
            Err(DeepImageError::Truncated(_))
        ));
    }

    #[test]
    fn test_out_of_order_chunk() {
        let file = FileBuilder::new(0, 0, 1, 2, 1)
            .channels(&RGBAZ)
            .u32(2)
            .u32(1)
            .u32(1)
            .u32(0)
            .finish();

        assert!(matches!(
            read_deep_image(file),
            Err(DeepImageError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_zback_in_front_of_z_is_rejected() {
        let file = FileBuilder::new(3, 7, 1, 1, 1)
            .channels(&[("R", 1), ("G", 1), ("B", 1), ("A", 1), ("Z", 2), ("ZBack", 2)])
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(1)
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .floats(&[5.0]) // Z
            .floats(&[2.0]) // ZBack
            .finish();

        let err = read_deep_image(file).unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(
            err,
            DeepImageError::InvalidDepth {
                x: 3,
                y: 7,
                z_front,
                z_back,
            } if z_front == 5.0 && z_back == 2.0
        ));
    }

    #[test]
    fn test_nan_depth_is_rejected() {
        let file = FileBuilder::new(0, 0, 1, 1, 1)
            .channels(&RGBAZ)
            .u32(1)
            .u32(0)
            .u32(1)
            .u32(1)
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .halves(&[1.0])
            .floats(&[f32::NAN])
            .finish();

        assert!(matches!(
            read_deep_image(file),
            Err(DeepImageError::InvalidDepth { .. })
        ));
    }

    #[test]
    fn test_oversized_count_table_is_header_error() {
        let huge = 1u32 << 31;
        let file = FileBuilder::new(0, 0, huge, huge, huge)
            .channels(&RGBAZ)
            .u32(1)
            .u32(0)
            .u32(huge)
            .finish();

        assert!(matches!(
            read_deep_image(file),
            Err(DeepImageError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_empty_image() {
        let file = FileBuilder::new(0, 0, 0, 0, 1)
            .channels(&RGBAZ)
            .u32(0)
            .finish();

        let buffer = read_deep_image(file).unwrap();
        assert_eq!(buffer.total_sample_count(), 0);
        assert_eq!((buffer.width(), buffer.height()), (0, 0));
    }
}
