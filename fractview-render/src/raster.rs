use std::sync::Arc;

use fractview_core::Viewport;

use crate::palette::{Rgba, UNCOMPUTED};

/// The pixel grid for one viewport.
///
/// Stores the display color of every pixel and, alongside it, the raw
/// iteration count that produced the color (`None` while uncomputed). Keeping
/// the counts makes recoloring possible without re-running the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    viewport: Viewport,
    colors: Vec<Rgba>,
    iterations: Vec<Option<u32>>,
}

impl Raster {
    /// A raster for `viewport` with every pixel uncomputed.
    pub fn allocate(viewport: Viewport) -> Self {
        let len = viewport.pixel_count();
        Self {
            viewport,
            colors: vec![UNCOMPUTED; len],
            iterations: vec![None; len],
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn width(&self) -> u32 {
        self.viewport.width
    }

    pub fn height(&self) -> u32 {
        self.viewport.height
    }

    #[inline]
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if self.viewport.contains_pixel(x, y) {
            Some(y as usize * self.viewport.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Store a computed pixel. Positions outside the raster are ignored:
    /// rounding in the plane → pixel mapping can land one step past an edge.
    #[inline]
    pub fn set(&mut self, x: i64, y: i64, iterations: u32, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.colors[i] = color;
            self.iterations[i] = Some(iterations);
        }
    }

    /// Color at `(x, y)`, or `None` outside the raster.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<Rgba> {
        self.index(x, y).map(|i| self.colors[i])
    }

    /// Iteration count at `(x, y)`; `None` if uncomputed or outside.
    #[inline]
    pub fn iterations_at(&self, x: i64, y: i64) -> Option<u32> {
        self.index(x, y).and_then(|i| self.iterations[i])
    }

    pub(crate) fn pixel(&self, index: usize) -> (Rgba, Option<u32>) {
        (self.colors[index], self.iterations[index])
    }

    pub(crate) fn channels_mut(&mut self) -> (&mut [Rgba], &[Option<u32>]) {
        (&mut self.colors, &self.iterations)
    }

    pub(crate) fn from_parts(
        viewport: Viewport,
        colors: Vec<Rgba>,
        iterations: Vec<Option<u32>>,
    ) -> Self {
        debug_assert_eq!(colors.len(), viewport.pixel_count());
        debug_assert_eq!(iterations.len(), viewport.pixel_count());
        Self {
            viewport,
            colors,
            iterations,
        }
    }

    pub fn computed_count(&self) -> usize {
        self.iterations.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.iterations.iter().all(Option::is_some)
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Freeze the current contents into a shareable, read-only snapshot.
    pub fn snapshot(&self, generation: u64, version: u64) -> RasterSnapshot {
        RasterSnapshot {
            viewport: self.viewport,
            generation,
            version,
            colors: Arc::from(self.colors.as_slice()),
            iterations: Arc::from(self.iterations.as_slice()),
        }
    }
}

/// Read-only copy of a raster handed to the display surface.
///
/// `version` increases with every publication, so a surface can skip
/// uploads when it already shows the latest one.
#[derive(Debug, Clone)]
pub struct RasterSnapshot {
    pub viewport: Viewport,
    pub generation: u64,
    pub version: u64,
    colors: Arc<[Rgba]>,
    iterations: Arc<[Option<u32>]>,
}

impl RasterSnapshot {
    pub fn width(&self) -> u32 {
        self.viewport.width
    }

    pub fn height(&self) -> u32 {
        self.viewport.height
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        self.viewport
            .contains_pixel(x, y)
            .then(|| y as usize * self.viewport.width as usize + x as usize)
    }

    pub fn get(&self, x: i64, y: i64) -> Option<Rgba> {
        self.index(x, y).map(|i| self.colors[i])
    }

    pub fn iterations_at(&self, x: i64, y: i64) -> Option<u32> {
        self.index(x, y).and_then(|i| self.iterations[i])
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    pub fn computed_count(&self) -> usize {
        self.iterations.iter().filter(|n| n.is_some()).count()
    }

    /// Same pixels and rectangle, ignoring generation and version.
    pub fn same_pixels(&self, other: &RasterSnapshot) -> bool {
        self.viewport == other.viewport
            && self.colors == other.colors
            && self.iterations == other.iterations
    }

    /// Flatten to `RGBA8` bytes, drawing uncomputed pixels as opaque black.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.colors.len() * 4);
        for color in self.colors.iter() {
            if *color == UNCOMPUTED {
                bytes.extend_from_slice(&[0, 0, 0, 255]);
            } else {
                bytes.extend_from_slice(color);
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(w: u32, h: u32) -> Raster {
        Raster::allocate(Viewport::default_for(w, h).unwrap())
    }

    #[test]
    fn allocate_is_all_uncomputed() {
        let r = raster(8, 6);
        assert_eq!(r.colors().len(), 48);
        assert!(r.colors().iter().all(|&c| c == UNCOMPUTED));
        assert_eq!(r.computed_count(), 0);
        assert!(!r.is_complete());
    }

    #[test]
    fn set_then_get() {
        let mut r = raster(8, 6);
        r.set(3, 2, 17, [1, 2, 3, 255]);
        assert_eq!(r.get(3, 2), Some([1, 2, 3, 255]));
        assert_eq!(r.iterations_at(3, 2), Some(17));
        assert_eq!(r.iterations_at(2, 3), None);
        assert_eq!(r.computed_count(), 1);
    }

    #[test]
    fn out_of_bounds_set_is_ignored() {
        let mut r = raster(4, 4);
        let before = r.clone();
        for (x, y) in [(-1, 0), (0, -1), (4, 0), (0, 4), (i64::MAX, 2)] {
            r.set(x, y, 1, [9, 9, 9, 255]);
            assert_eq!(r.get(x, y), None);
        }
        assert_eq!(r, before);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut r = raster(4, 4);
        r.set(0, 0, 5, [10, 20, 30, 255]);
        let snap = r.snapshot(3, 7);
        r.set(1, 1, 6, [40, 50, 60, 255]);
        assert_eq!(snap.generation, 3);
        assert_eq!(snap.version, 7);
        assert_eq!(snap.get(0, 0), Some([10, 20, 30, 255]));
        assert_eq!(snap.get(1, 1), Some(UNCOMPUTED));
        assert_eq!(snap.computed_count(), 1);
    }

    #[test]
    fn rgba_bytes_make_uncomputed_opaque() {
        let mut r = raster(2, 1);
        r.set(1, 0, 2, [200, 100, 50, 255]);
        let bytes = r.snapshot(0, 0).to_rgba_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 255, 200, 100, 50, 255]);
    }
}
