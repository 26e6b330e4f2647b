//! Heightmap sample storage with dirty-region and extrema tracking.

use std::path::Path;

use image::GrayImage;

use crate::core::types::Result;
use crate::math::GridRect;

/// Square grid of height samples backing an editable terrain.
///
/// Tracks a running min/max height and a single coalescing dirty rectangle
/// covering every edit since the last [`mark_clean`](Heightmap::mark_clean).
/// Single-point writes grow the extrema in O(1) and never shrink them; bulk
/// operations finish with a full recompute. The bounds may therefore be
/// loose after overwriting an extreme sample, but they always satisfy
/// `min <= every sample <= max`. Call [`recompute_extrema`]
/// (Heightmap::recompute_extrema) to tighten them.
#[derive(Clone, Debug, Default)]
pub struct Heightmap {
    data: Vec<f32>,
    size: u32,
    min_height: f32,
    max_height: f32,
    modified: bool,
    dirty_region: GridRect,
}

impl Heightmap {
    /// Create an empty, invalid heightmap
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            size: 0,
            min_height: 0.0,
            max_height: 0.0,
            modified: false,
            dirty_region: GridRect::EMPTY,
        }
    }

    /// Allocate a `size x size` grid filled with `default_height`.
    ///
    /// Resets all state and marks the whole grid dirty. Returns false for
    /// `size == 0`.
    pub fn create(&mut self, size: u32, default_height: f32) -> bool {
        if size == 0 {
            return false;
        }

        self.size = size;
        self.data.clear();
        self.data.resize((size * size) as usize, default_height);
        self.min_height = default_height;
        self.max_height = default_height;
        self.modified = true;
        self.dirty_region = GridRect::from_extent(0, 0, size, size);
        true
    }

    /// Drop the backing store and reset all state
    pub fn clear(&mut self) {
        self.data.clear();
        self.size = 0;
        self.min_height = 0.0;
        self.max_height = 0.0;
        self.modified = false;
        self.dirty_region.clear();
    }

    /// Check whether the heightmap holds data
    pub fn is_valid(&self) -> bool {
        self.size > 0 && !self.data.is_empty()
    }

    /// Grid side length in samples
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Smallest tracked height
    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// Largest tracked height
    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Raw samples, row-major with stride `size`
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    fn index(&self, x: u32, z: u32) -> usize {
        (z * self.size + x) as usize
    }

    fn in_bounds(&self, x: u32, z: u32) -> bool {
        x < self.size && z < self.size
    }

    /// Read a sample; out-of-bounds coordinates return 0
    pub fn height(&self, x: u32, z: u32) -> f32 {
        if !self.in_bounds(x, z) {
            return 0.0;
        }
        self.data[self.index(x, z)]
    }

    /// Read a sample with signed coordinates; out-of-bounds returns 0
    pub fn height_safe(&self, x: i32, z: i32) -> f32 {
        if x < 0 || z < 0 || x as u32 >= self.size || z as u32 >= self.size {
            return 0.0;
        }
        self.data[self.index(x as u32, z as u32)]
    }

    /// Bilinearly sampled height at fractional grid coordinates.
    ///
    /// Input is clamped into `[0, size-1)` so the sample never reads past
    /// the last row or column.
    pub fn interpolated_height(&self, x: f32, z: f32) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }

        let limit = (self.size - 1) as f32 - 0.001;
        let x = x.clamp(0.0, limit.max(0.0));
        let z = z.clamp(0.0, limit.max(0.0));

        let x0 = x as u32;
        let z0 = z as u32;
        let x1 = (x0 + 1).min(self.size - 1);
        let z1 = (z0 + 1).min(self.size - 1);

        let fx = x - x0 as f32;
        let fz = z - z0 as f32;

        let h00 = self.height(x0, z0);
        let h10 = self.height(x1, z0);
        let h01 = self.height(x0, z1);
        let h11 = self.height(x1, z1);

        let h0 = h00 * (1.0 - fx) + h10 * fx;
        let h1 = h01 * (1.0 - fx) + h11 * fx;
        h0 * (1.0 - fz) + h1 * fz
    }

    /// Write a sample; out-of-bounds coordinates are a no-op.
    ///
    /// Marks the cell dirty and grows the running extrema.
    pub fn set_height(&mut self, x: u32, z: u32, height: f32) {
        if !self.in_bounds(x, z) {
            return;
        }

        let idx = self.index(x, z);
        self.data[idx] = height;
        self.mark_region_dirty(x, z, 1, 1);

        if height < self.min_height {
            self.min_height = height;
        }
        if height > self.max_height {
            self.max_height = height;
        }
    }

    /// Write a sample with signed coordinates; returns false when out of bounds
    pub fn set_height_safe(&mut self, x: i32, z: i32, height: f32) -> bool {
        if x < 0 || z < 0 || x as u32 >= self.size || z as u32 >= self.size {
            return false;
        }
        self.set_height(x as u32, z as u32, height);
        true
    }

    /// Bulk write a row-major region with stride `width`, clipped to the grid.
    ///
    /// Returns false for an invalid heightmap, an origin off the grid, or a
    /// buffer shorter than `width * height`. Marks one enclosing dirty
    /// region and ends with a full extrema recompute.
    pub fn update_region(
        &mut self,
        start_x: u32,
        start_z: u32,
        width: u32,
        height: u32,
        heights: &[f32],
    ) -> bool {
        if !self.is_valid() || start_x >= self.size || start_z >= self.size {
            return false;
        }
        if heights.len() < (width * height) as usize {
            return false;
        }

        let clipped_w = width.min(self.size - start_x);
        let clipped_h = height.min(self.size - start_z);

        for z in 0..clipped_h {
            for x in 0..clipped_w {
                let idx = self.index(start_x + x, start_z + z);
                self.data[idx] = heights[(z * width + x) as usize];
            }
        }

        self.mark_region_dirty(start_x, start_z, clipped_w, clipped_h);
        self.recompute_extrema();
        true
    }

    /// Bulk read a region into `out`, clipped to the grid.
    ///
    /// `out` is filled row-major with stride equal to the clipped width.
    /// Returns the clipped (width, height).
    pub fn get_region(
        &self,
        start_x: u32,
        start_z: u32,
        width: u32,
        height: u32,
        out: &mut [f32],
    ) -> (u32, u32) {
        if !self.is_valid() || start_x >= self.size || start_z >= self.size {
            return (0, 0);
        }

        let clipped_w = width.min(self.size - start_x);
        let clipped_h = height.min(self.size - start_z);
        if out.len() < (clipped_w * clipped_h) as usize {
            return (0, 0);
        }

        for z in 0..clipped_h {
            for x in 0..clipped_w {
                out[(z * clipped_w + x) as usize] = self.height(start_x + x, start_z + z);
            }
        }

        (clipped_w, clipped_h)
    }

    /// Grow the dirty rectangle to cover a region and set the modified flag
    pub fn mark_region_dirty(&mut self, x: u32, z: u32, width: u32, height: u32) {
        self.modified = true;
        self.dirty_region
            .expand_to_include(&GridRect::from_extent(x as i32, z as i32, width, height));
    }

    /// Clear the modified flag and the dirty rectangle together
    pub fn mark_clean(&mut self) {
        self.modified = false;
        self.dirty_region.clear();
    }

    /// Check whether any edits are pending since the last mark_clean
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Smallest rectangle covering all edits since the last mark_clean
    pub fn dirty_region(&self) -> &GridRect {
        &self.dirty_region
    }

    /// Apply an interior-only 3x3 box average over the whole grid
    pub fn smooth(&mut self, iterations: u32) {
        if !self.is_valid() || iterations == 0 {
            return;
        }
        self.smooth_region(0, 0, self.size, self.size, iterations);
    }

    /// Apply an interior-only 3x3 box average over a region, clipped to the
    /// grid. Border cells of the region are left unmodified.
    pub fn smooth_region(
        &mut self,
        start_x: u32,
        start_z: u32,
        width: u32,
        height: u32,
        iterations: u32,
    ) {
        if !self.is_valid() || iterations == 0 {
            return;
        }
        if start_x >= self.size || start_z >= self.size {
            return;
        }

        let clipped_w = width.min(self.size - start_x);
        let clipped_h = height.min(self.size - start_z);
        if clipped_w < 3 || clipped_h < 3 {
            return;
        }

        let mut scratch = vec![0.0f32; (clipped_w * clipped_h) as usize];

        for _ in 0..iterations {
            self.get_region(start_x, start_z, clipped_w, clipped_h, &mut scratch);

            for z in 1..clipped_h - 1 {
                for x in 1..clipped_w - 1 {
                    let mut sum = 0.0;
                    for dz in -1i32..=1 {
                        for dx in -1i32..=1 {
                            let sx = (x as i32 + dx) as u32;
                            let sz = (z as i32 + dz) as u32;
                            sum += scratch[(sz * clipped_w + sx) as usize];
                        }
                    }
                    let idx = self.index(start_x + x, start_z + z);
                    self.data[idx] = sum / 9.0;
                }
            }
        }

        self.mark_region_dirty(start_x, start_z, clipped_w, clipped_h);
        self.recompute_extrema();
    }

    /// Rescale all samples into [0, 1]. No-op when the range is degenerate.
    pub fn normalize_heights(&mut self) {
        if !self.is_valid() {
            return;
        }

        self.recompute_extrema();
        let range = self.max_height - self.min_height;
        if range < 0.001 {
            return;
        }

        let min = self.min_height;
        for h in &mut self.data {
            *h = (*h - min) / range;
        }

        self.min_height = 0.0;
        self.max_height = 1.0;
        self.modified = true;
        self.dirty_region = GridRect::from_extent(0, 0, self.size, self.size);
    }

    /// Multiply all samples and both extrema by a factor
    pub fn scale_heights(&mut self, scale: f32) {
        if !self.is_valid() {
            return;
        }

        for h in &mut self.data {
            *h *= scale;
        }

        self.min_height *= scale;
        self.max_height *= scale;
        if self.min_height > self.max_height {
            std::mem::swap(&mut self.min_height, &mut self.max_height);
        }
        self.modified = true;
        self.dirty_region = GridRect::from_extent(0, 0, self.size, self.size);
    }

    /// Rescan the whole grid and tighten min/max to exact bounds
    pub fn recompute_extrema(&mut self) {
        if !self.is_valid() {
            return;
        }

        let mut min = self.data[0];
        let mut max = self.data[0];
        for &h in &self.data[1..] {
            if h < min {
                min = h;
            }
            if h > max {
                max = h;
            }
        }
        self.min_height = min;
        self.max_height = max;
    }

    /// Populate from a grayscale image, mapping each pixel's intensity
    /// (0-255) through `height_scale` into height units.
    ///
    /// The image must be square. Returns false otherwise.
    pub fn load_from_image(&mut self, image: &GrayImage, height_scale: f32) -> bool {
        let (w, h) = image.dimensions();
        if w != h {
            log::warn!("heightmap image must be square, got {}x{}", w, h);
            return false;
        }
        if !self.create(w, 0.0) {
            return false;
        }

        for z in 0..self.size {
            for x in 0..self.size {
                let intensity = image.get_pixel(x, z).0[0] as f32;
                let idx = self.index(x, z);
                self.data[idx] = intensity * height_scale;
            }
        }

        self.recompute_extrema();
        true
    }

    /// Decode an image file and load it as a heightmap
    pub fn load_from_file(&mut self, path: impl AsRef<Path>, height_scale: f32) -> Result<()> {
        let path = path.as_ref();
        let image = image::open(path)?.to_luma8();

        if !self.load_from_image(&image, height_scale) {
            return Err(crate::core::Error::Terrain(format!(
                "non-square heightmap image: {}",
                path.display()
            )));
        }

        log::info!("loaded {}x{} heightmap from {}", self.size, self.size, path.display());
        Ok(())
    }

    /// Normalize the current heights into 8-bit grayscale and write an image file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.is_valid() {
            return Err(crate::core::Error::Terrain(
                "cannot save an empty heightmap".to_string(),
            ));
        }

        let mut range = self.max_height - self.min_height;
        if range < 0.001 {
            range = 1.0;
        }

        let mut image = GrayImage::new(self.size, self.size);
        for z in 0..self.size {
            for x in 0..self.size {
                let normalized = (self.height(x, z) - self.min_height) / range;
                image.put_pixel(x, z, image::Luma([(normalized * 255.0) as u8]));
            }
        }

        image.save(path)?;
        log::info!("saved {}x{} heightmap to {}", self.size, self.size, path.display());
        Ok(())
    }
}
