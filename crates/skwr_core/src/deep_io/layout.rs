//! Flat sample layout shared by the reader and writer.
//!
//! Samples of every pixel are packed back to back in raster order, so each
//! channel is one contiguous array of `total` values. The offset table is
//! the exclusive prefix sum of the per-pixel counts.

use std::ops::Range;

use crate::DeepImageBuffer;

use super::{DeepImageError, DeepImageResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayout {
    min_x: i64,
    min_y: i64,
    width: usize,
    height: usize,
    counts: Vec<u32>,
    offsets: Vec<usize>,
    total: usize,
}

impl SampleLayout {
    /// Build the layout from a raster-order count table.
    ///
    /// `(min_x, min_y)` is the absolute coordinate of the first pixel.
    pub fn from_counts(
        min_x: i32,
        min_y: i32,
        width: u32,
        height: u32,
        counts: Vec<u32>,
    ) -> DeepImageResult<Self> {
        let (width, height) = (width as usize, height as usize);
        if counts.len() != width * height {
            return Err(DeepImageError::InvalidHeader(format!(
                "sample count table has {} entries, expected {}",
                counts.len(),
                width * height
            )));
        }

        let mut offsets = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &count in &counts {
            offsets.push(total);
            total = total.checked_add(count as usize).ok_or_else(|| {
                DeepImageError::InvalidHeader("total sample count overflows".into())
            })?;
        }

        Ok(Self {
            min_x: min_x as i64,
            min_y: min_y as i64,
            width,
            height,
            counts,
            offsets,
            total,
        })
    }

    /// Layout of an in-memory buffer, with its first pixel at (0, 0).
    pub fn from_buffer(buffer: &DeepImageBuffer) -> Self {
        let counts = buffer.sample_counts();
        let mut offsets = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &count in &counts {
            offsets.push(total);
            total += count as usize;
        }

        Self {
            min_x: 0,
            min_y: 0,
            width: buffer.width() as usize,
            height: buffer.height() as usize,
            counts,
            offsets,
            total,
        }
    }

    /// Total number of samples across all pixels.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Raster index of the pixel at absolute coordinates (x, y).
    #[inline]
    pub fn index(&self, x: i64, y: i64) -> usize {
        let lx = x - self.min_x;
        let ly = y - self.min_y;
        debug_assert!(lx >= 0 && (lx as usize) < self.width);
        debug_assert!(ly >= 0 && (ly as usize) < self.height);
        ly as usize * self.width + lx as usize
    }

    /// Sample count of the pixel at absolute coordinates (x, y).
    pub fn count(&self, x: i64, y: i64) -> u32 {
        self.counts[self.index(x, y)]
    }

    /// Slots of the pixel at absolute coordinates (x, y) in the flat arrays.
    ///
    /// Empty for pixels without samples.
    pub fn range(&self, x: i64, y: i64) -> Range<usize> {
        let idx = self.index(x, y);
        let start = self.offsets[idx];
        start..start + self.counts[idx] as usize
    }

    /// Slots covered by `lines` scanlines starting `first_line` rows into the
    /// data window.
    pub fn rows_range(&self, first_line: usize, lines: usize) -> Range<usize> {
        let first = first_line * self.width;
        let end_pixel = ((first_line + lines) * self.width).min(self.counts.len());
        if first >= end_pixel {
            return self.total..self.total;
        }
        let last = end_pixel - 1;
        self.offsets[first]..self.offsets[last] + self.counts[last] as usize
    }
}
