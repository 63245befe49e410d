//! Deep pixel store.
//!
//! A deep image keeps, per pixel, every partial sample that landed there
//! instead of one resolved color. Samples stay in the order they were
//! appended; nothing is removed except by replacing the whole buffer.

use skwr_math::Spectrum;

/// One partial contribution to a pixel.
///
/// `color` is premultiplied by `alpha`, following the usual deep
/// compositing convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeepSample {
    pub color: Spectrum,
    pub alpha: f32,
    pub z_front: f32,
    pub z_back: f32,
}

impl DeepSample {
    /// A zero-thickness sample at depth `z`.
    pub fn new(color: Spectrum, alpha: f32, z: f32) -> Self {
        Self {
            color,
            alpha,
            z_front: z,
            z_back: z,
        }
    }

    /// A sample covering the depth interval between `z_front` and `z_back`.
    ///
    /// The bounds are reordered if necessary so that `z_back >= z_front`.
    pub fn with_depth_range(color: Spectrum, alpha: f32, z_front: f32, z_back: f32) -> Self {
        Self {
            color,
            alpha,
            z_front: z_front.min(z_back),
            z_back: z_front.max(z_back),
        }
    }

    /// Depth extent of the sample.
    pub fn thickness(&self) -> f32 {
        self.z_back - self.z_front
    }

    /// True for samples with a nonzero depth extent.
    pub fn is_volumetric(&self) -> bool {
        self.z_back > self.z_front
    }
}

/// The ordered samples of a single pixel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepPixel {
    pub samples: Vec<DeepSample>,
}

impl DeepPixel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample, keeping arrival order.
    #[inline]
    pub fn push(&mut self, sample: DeepSample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeepSample> {
        self.samples.iter()
    }

    /// Copy of the samples ordered front to back.
    ///
    /// Ties on `z_front` are broken by `z_back`; the sort is stable so equal
    /// samples keep their arrival order.
    pub fn sorted_by_depth(&self) -> Vec<DeepSample> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| {
            a.z_front
                .total_cmp(&b.z_front)
                .then(a.z_back.total_cmp(&b.z_back))
        });
        sorted
    }

    /// Composite the samples front to back with the "over" operator.
    ///
    /// Returns the flat premultiplied color and its alpha.
    pub fn flatten(&self) -> (Spectrum, f32) {
        let mut color = Spectrum::ZERO;
        let mut alpha = 0.0f32;

        for sample in self.sorted_by_depth() {
            let remaining = 1.0 - alpha;
            color += remaining * sample.color;
            alpha += remaining * sample.alpha.clamp(0.0, 1.0);
            if alpha >= 1.0 {
                break;
            }
        }

        (color, alpha.min(1.0))
    }
}

/// A width × height grid of deep pixels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeepImageBuffer {
    width: u32,
    height: u32,
    pixels: Vec<DeepPixel>,
}

impl DeepImageBuffer {
    /// Create a buffer with no samples.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![DeepPixel::default(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} deep buffer",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &DeepPixel {
        &self.pixels[self.index(x, y)]
    }

    /// Mutable access to the pixel at (x, y).
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut DeepPixel {
        let idx = self.index(x, y);
        &mut self.pixels[idx]
    }

    /// Pixel at (x, y), or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<&DeepPixel> {
        if x < self.width && y < self.height {
            Some(&self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Append a sample to the pixel at (x, y).
    pub fn append(&mut self, x: u32, y: u32, sample: DeepSample) {
        self.pixel_mut(x, y).push(sample);
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[DeepPixel] {
        &self.pixels
    }

    /// All pixels in row-major order, mutably.
    ///
    /// Splitting this slice by rows gives each worker exclusive ownership of
    /// its pixels.
    pub fn pixels_mut(&mut self) -> &mut [DeepPixel] {
        &mut self.pixels
    }

    /// Iterate over rows of pixels.
    pub fn rows(&self) -> std::slice::Chunks<'_, DeepPixel> {
        self.pixels.chunks(self.width.max(1) as usize)
    }

    /// Per-pixel sample counts in row-major order.
    pub fn sample_counts(&self) -> Vec<u32> {
        self.pixels.iter().map(|p| p.len() as u32).collect()
    }

    /// Sum of all per-pixel sample counts.
    pub fn total_sample_count(&self) -> usize {
        self.pixels.iter().map(DeepPixel::len).sum()
    }

    /// Largest sample count of any pixel.
    pub fn max_samples_per_pixel(&self) -> usize {
        self.pixels.iter().map(DeepPixel::len).max().unwrap_or(0)
    }

    /// True if any sample has a nonzero depth extent.
    pub fn has_volumetric_samples(&self) -> bool {
        self.pixels
            .iter()
            .any(|p| p.iter().any(DeepSample::is_volumetric))
    }

    /// Drop every sample, keeping the resolution.
    pub fn clear(&mut self) {
        for pixel in &mut self.pixels {
            pixel.samples.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_without_back_depth_is_flat() {
        let s = DeepSample::new(Spectrum::ONE, 1.0, 3.5);
        assert_eq!(s.z_front, 3.5);
        assert_eq!(s.z_back, s.z_front);
        assert!(!s.is_volumetric());
    }

    #[test]
    fn test_depth_range_is_ordered() {
        let s = DeepSample::with_depth_range(Spectrum::ONE, 0.5, 4.0, 2.0);
        assert_eq!(s.z_front, 2.0);
        assert_eq!(s.z_back, 4.0);
        assert_eq!(s.thickness(), 2.0);
        assert!(s.is_volumetric());
    }

    #[test]
    fn test_append_preserves_order_and_counts() {
        let mut buf = DeepImageBuffer::new(3, 2);
        buf.append(1, 0, DeepSample::new(Spectrum::X, 1.0, 5.0));
        buf.append(1, 0, DeepSample::new(Spectrum::Y, 1.0, 1.0));
        buf.append(2, 1, DeepSample::new(Spectrum::Z, 1.0, 2.0));

        assert_eq!(buf.pixel(1, 0).len(), 2);
        assert_eq!(buf.pixel(1, 0).samples[0].z_front, 5.0);
        assert_eq!(buf.pixel(1, 0).samples[1].z_front, 1.0);
        assert_eq!(buf.pixel(0, 0).len(), 0);

        let counts = buf.sample_counts();
        assert_eq!(counts, vec![0, 2, 0, 0, 0, 1]);
        assert_eq!(buf.total_sample_count(), counts.iter().sum::<u32>() as usize);
        assert_eq!(buf.max_samples_per_pixel(), 2);
    }

    #[test]
    fn test_get_outside_image() {
        let buf = DeepImageBuffer::new(2, 2);
        assert!(buf.get(1, 1).is_some());
        assert!(buf.get(2, 0).is_none());
        assert!(buf.get(0, 2).is_none());
    }

    #[test]
    #[should_panic]
    fn test_pixel_out_of_bounds_panics() {
        let buf = DeepImageBuffer::new(2, 2);
        let _ = buf.pixel(2, 0);
    }

    #[test]
    fn test_rows_partition_pixels() {
        let mut buf = DeepImageBuffer::new(4, 3);
        buf.append(3, 2, DeepSample::new(Spectrum::ONE, 1.0, 1.0));
        let rows: Vec<_> = buf.rows().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 4));
        assert_eq!(rows[2][3].len(), 1);
    }

    #[test]
    fn test_sorted_by_depth_is_stable() {
        let mut pixel = DeepPixel::new();
        pixel.push(DeepSample::new(Spectrum::X, 1.0, 2.0));
        pixel.push(DeepSample::new(Spectrum::Y, 1.0, 1.0));
        pixel.push(DeepSample::new(Spectrum::Z, 1.0, 2.0));

        let sorted = pixel.sorted_by_depth();
        assert_eq!(sorted[0].color, Spectrum::Y);
        assert_eq!(sorted[1].color, Spectrum::X);
        assert_eq!(sorted[2].color, Spectrum::Z);
        // Original order is untouched
        assert_eq!(pixel.samples[0].color, Spectrum::X);
    }

    #[test]
    fn test_flatten_over() {
        let mut pixel = DeepPixel::new();
        // Back: opaque red. Front: half-transparent green (premultiplied).
        pixel.push(DeepSample::new(Spectrum::new(1.0, 0.0, 0.0), 1.0, 10.0));
        pixel.push(DeepSample::new(Spectrum::new(0.0, 0.5, 0.0), 0.5, 1.0));

        let (color, alpha) = pixel.flatten();
        assert!((alpha - 1.0).abs() < 1e-6);
        assert!((color - Spectrum::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_flatten_empty() {
        let (color, alpha) = DeepPixel::new().flatten();
        assert_eq!(color, Spectrum::ZERO);
        assert_eq!(alpha, 0.0);
    }

    #[test]
    fn test_clear_keeps_resolution() {
        let mut buf = DeepImageBuffer::new(2, 1);
        buf.append(0, 0, DeepSample::new(Spectrum::ONE, 1.0, 1.0));
        buf.clear();
        assert_eq!(buf.total_sample_count(), 0);
        assert_eq!((buf.width(), buf.height()), (2, 1));
    }
}
