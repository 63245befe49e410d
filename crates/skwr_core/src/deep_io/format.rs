//! Header, channel list and scalar encodings of the deep image format.

use std::io::{Read, Write};

use half::f16;

use super::{DeepImageError, DeepImageResult};

pub(crate) const MAGIC: &[u8; 8] = b"SKWRDEEP";
pub(crate) const VERSION: u32 = 1;

/// Channels this codec understands, in the order they are written.
pub const CHANNEL_NAMES: [&str; 6] = ["R", "G", "B", "A", "Z", "ZBack"];

/// Channels every deep image must carry.
pub const REQUIRED_CHANNELS: [&str; 5] = ["R", "G", "B", "A", "Z"];

/// Longest channel name accepted in a header.
const MAX_NAME_LEN: usize = 255;

/// Storage type of one channel's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Uint,
    Half,
    Float,
}

impl PixelType {
    pub fn code(self) -> u32 {
        match self {
            PixelType::Uint => 0,
            PixelType::Half => 1,
            PixelType::Float => 2,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(PixelType::Uint),
            1 => Some(PixelType::Half),
            2 => Some(PixelType::Float),
            _ => None,
        }
    }

    /// Bytes per sample.
    pub fn size(self) -> usize {
        match self {
            PixelType::Uint => 4,
            PixelType::Half => 2,
            PixelType::Float => 4,
        }
    }

    /// Append `values` to `out` in this storage type, little-endian.
    pub(crate) fn encode(self, values: &[f32], out: &mut Vec<u8>) {
        out.reserve(values.len() * self.size());
        match self {
            PixelType::Uint => {
                for &v in values {
                    out.extend_from_slice(&(v.max(0.0) as u32).to_le_bytes());
                }
            }
            PixelType::Half => {
                for &v in values {
                    out.extend_from_slice(&f16::from_f32(v).to_le_bytes());
                }
            }
            PixelType::Float => {
                for &v in values {
                    out.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }

    /// Decode `bytes` into `out`, widening every value to f32.
    ///
    /// `bytes.len()` must equal `out.len() * self.size()`.
    pub(crate) fn decode(self, bytes: &[u8], out: &mut [f32]) {
        debug_assert_eq!(bytes.len(), out.len() * self.size());
        match self {
            PixelType::Uint => {
                for (v, b) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    *v = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32;
                }
            }
            PixelType::Half => {
                for (v, b) in out.iter_mut().zip(bytes.chunks_exact(2)) {
                    *v = f16::from_le_bytes([b[0], b[1]]).to_f32();
                }
            }
            PixelType::Float => {
                for (v, b) in out.iter_mut().zip(bytes.chunks_exact(4)) {
                    *v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                }
            }
        }
    }
}

/// A named channel in the file's channel list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDesc {
    pub name: String,
    pub pixel_type: PixelType,
}

impl ChannelDesc {
    pub fn new(name: impl Into<String>, pixel_type: PixelType) -> Self {
        Self {
            name: name.into(),
            pixel_type,
        }
    }
}

/// Everything stored ahead of the chunk table.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepHeader {
    /// Absolute coordinates of the data window's top-left pixel.
    pub min_x: i32,
    pub min_y: i32,
    pub width: u32,
    pub height: u32,
    pub lines_per_chunk: u32,
    pub channels: Vec<ChannelDesc>,
}

impl DeepHeader {
    pub fn channel(&self, name: &str) -> Option<&ChannelDesc> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channel(name).is_some()
    }

    /// Required channels absent from the channel list, in canonical order.
    pub fn missing_required(&self) -> Vec<String> {
        REQUIRED_CHANNELS
            .iter()
            .filter(|name| !self.has_channel(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// Inclusive absolute bounds of the data window.
    pub fn max_x(&self) -> i64 {
        self.min_x as i64 + self.width as i64 - 1
    }

    pub fn max_y(&self) -> i64 {
        self.min_y as i64 + self.height as i64 - 1
    }

    pub fn pixel_count(&self) -> DeepImageResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .ok_or_else(|| DeepImageError::InvalidHeader("image dimensions overflow".into()))
    }

    pub(crate) fn write_to<W: Write>(&self, w: &mut W) -> DeepImageResult<()> {
        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&self.min_x.to_le_bytes())?;
        w.write_all(&self.min_y.to_le_bytes())?;
        w.write_all(&self.width.to_le_bytes())?;
        w.write_all(&self.height.to_le_bytes())?;
        w.write_all(&self.lines_per_chunk.to_le_bytes())?;
        w.write_all(&(self.channels.len() as u32).to_le_bytes())?;
        for channel in &self.channels {
            let name = channel.name.as_bytes();
            w.write_all(&(name.len() as u16).to_le_bytes())?;
            w.write_all(name)?;
            w.write_all(&channel.pixel_type.code().to_le_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn read_from<R: Read>(r: &mut ByteReader<R>) -> DeepImageResult<Self> {
        let mut magic = [0u8; 8];
        r.read_exact(&mut magic, "magic")?;
        if &magic != MAGIC {
            return Err(DeepImageError::InvalidHeader("not a deep image file".into()));
        }

        let version = r.read_u32("version")?;
        if version != VERSION {
            return Err(DeepImageError::InvalidHeader(format!(
                "unsupported version {version}"
            )));
        }

        let min_x = r.read_i32("data window")?;
        let min_y = r.read_i32("data window")?;
        let width = r.read_u32("data window")?;
        let height = r.read_u32("data window")?;
        let lines_per_chunk = r.read_u32("lines per chunk")?;
        if lines_per_chunk == 0 {
            return Err(DeepImageError::InvalidHeader(
                "lines per chunk must be nonzero".into(),
            ));
        }

        let channel_count = r.read_u32("channel list")? as usize;
        let mut channels: Vec<ChannelDesc> = Vec::with_capacity(channel_count.min(64));
        for _ in 0..channel_count {
            let name_len = r.read_u16("channel name")? as usize;
            if name_len == 0 || name_len > MAX_NAME_LEN {
                return Err(DeepImageError::InvalidHeader(format!(
                    "bad channel name length {name_len}"
                )));
            }
            let mut name = vec![0u8; name_len];
            r.read_exact(&mut name, "channel name")?;
            let name = String::from_utf8(name)
                .map_err(|_| DeepImageError::InvalidHeader("channel name is not UTF-8".into()))?;

            let code = r.read_u32("channel type")?;
            let pixel_type = PixelType::from_code(code).ok_or_else(|| {
                DeepImageError::UnknownPixelType {
                    channel: name.clone(),
                    code,
                }
            })?;

            if channels.iter().any(|c| c.name == name) {
                return Err(DeepImageError::InvalidHeader(format!(
                    "duplicate channel {name}"
                )));
            }
            channels.push(ChannelDesc { name, pixel_type });
        }

        let header = Self {
            min_x,
            min_y,
            width,
            height,
            lines_per_chunk,
            channels,
        };
        header.pixel_count()?;
        Ok(header)
    }
}

/// Little-endian reads that report short input as `Truncated`.
pub(crate) struct ByteReader<R> {
    inner: R,
}

impl<R: Read> ByteReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner }
    }

    pub(crate) fn read_exact(&mut self, buf: &mut [u8], what: &str) -> DeepImageResult<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => DeepImageError::Truncated(format!("reading {what}")),
            _ => DeepImageError::Io(e),
        })
    }

    pub(crate) fn read_u16(&mut self, what: &str) -> DeepImageResult<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b, what)?;
        Ok(u16::from_le_bytes(b))
    }

    pub(crate) fn read_u32(&mut self, what: &str) -> DeepImageResult<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b, what)?;
        Ok(u32::from_le_bytes(b))
    }

    pub(crate) fn read_i32(&mut self, what: &str) -> DeepImageResult<i32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b, what)?;
        Ok(i32::from_le_bytes(b))
    }

    /// Read exactly `len` bytes without trusting `len` for the allocation.
    pub(crate) fn read_vec(&mut self, len: usize, what: &str) -> DeepImageResult<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if buf.len() != len {
            return Err(DeepImageError::Truncated(format!(
                "reading {what}: expected {len} bytes, got {}",
                buf.len()
            )));
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(channels: &[(&str, PixelType)]) -> DeepHeader {
        DeepHeader {
            min_x: -2,
            min_y: 7,
            width: 3,
            height: 4,
            lines_per_chunk: 2,
            channels: channels
                .iter()
                .map(|(n, t)| ChannelDesc::new(*n, *t))
                .collect(),
        }
    }

    #[test]
    fn test_header_write_read() {
        let h = header(&[("R", PixelType::Half), ("Z", PixelType::Float)]);
        let mut bytes = Vec::new();
        h.write_to(&mut bytes).unwrap();

        let mut r = ByteReader::new(Cursor::new(bytes));
        let back = DeepHeader::read_from(&mut r).unwrap();
        assert_eq!(back, h);
        assert_eq!(back.max_x(), 0);
        assert_eq!(back.max_y(), 10);
    }

    #[test]
    fn test_missing_required_in_canonical_order() {
        let h = header(&[("Z", PixelType::Float), ("G", PixelType::Half)]);
        assert_eq!(h.missing_required(), vec!["R", "B", "A"]);
    }

    #[test]
    fn test_bad_magic() {
        let mut r = ByteReader::new(Cursor::new(b"NOTADEEPFILE....".to_vec()));
        let err = DeepHeader::read_from(&mut r).unwrap_err();
        assert!(matches!(err, DeepImageError::InvalidHeader(_)));
    }

    #[test]
    fn test_unknown_pixel_type_names_channel() {
        let h = header(&[("R", PixelType::Half)]);
        let mut bytes = Vec::new();
        h.write_to(&mut bytes).unwrap();
        // Patch the last u32 (the channel's pixel type) to an unknown code
        let n = bytes.len();
        bytes[n - 4..].copy_from_slice(&9u32.to_le_bytes());

        let mut r = ByteReader::new(Cursor::new(bytes));
        match DeepHeader::read_from(&mut r) {
            Err(DeepImageError::UnknownPixelType { channel, code }) => {
                assert_eq!(channel, "R");
                assert_eq!(code, 9);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_header() {
        let h = header(&[("R", PixelType::Half)]);
        let mut bytes = Vec::new();
        h.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);

        let mut r = ByteReader::new(Cursor::new(bytes));
        assert!(matches!(
            DeepHeader::read_from(&mut r),
            Err(DeepImageError::Truncated(_))
        ));
    }

    #[test]
    fn test_half_encoding_is_exact_for_representable_values() {
        let values = [0.0f32, 1.0, -2.5, 0.125, 65504.0];
        let mut bytes = Vec::new();
        PixelType::Half.encode(&values, &mut bytes);
        assert_eq!(bytes.len(), values.len() * 2);

        let mut out = [0.0f32; 5];
        PixelType::Half.decode(&bytes, &mut out);
        assert_eq!(out, values);
    }

    #[test]
    fn test_float_encoding_keeps_full_precision() {
        let values = [1.000_000_1f32, 12345.678, -0.333_333_34];
        let mut bytes = Vec::new();
        PixelType::Float.encode(&values, &mut bytes);

        let mut out = [0.0f32; 3];
        PixelType::Float.decode(&bytes, &mut out);
        assert_eq!(out, values);
    }

    #[test]
    fn test_read_vec_short_input() {
        let mut r = ByteReader::new(Cursor::new(vec![1u8, 2, 3]));
        assert!(matches!(r.read_vec(8, "samples"), Err(DeepImageError::Truncated(_))));
    }
}
