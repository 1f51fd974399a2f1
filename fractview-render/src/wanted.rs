use std::collections::VecDeque;

use fractview_core::{Complex, Viewport};

/// FIFO of plane coordinates still waiting to be evaluated.
///
/// Entries are plane points rather than pixel indices, so they stay
/// meaningful when the raster is panned, zoomed or resized before they are
/// drained. Duplicates are allowed; evaluating a point twice is harmless.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WantedSet {
    queue: VecDeque<Complex>,
}

impl WantedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pixel of `viewport` in row-major scan order.
    pub fn scan(viewport: &Viewport) -> Self {
        let mut wanted = Self::new();
        wanted.fill_scan(viewport);
        wanted
    }

    /// Append every pixel of `viewport` in row-major scan order.
    pub fn fill_scan(&mut self, viewport: &Viewport) {
        self.queue.reserve(viewport.pixel_count());
        for py in 0..viewport.height {
            for px in 0..viewport.width {
                self.queue.push_back(viewport.pixel_to_complex(px, py));
            }
        }
    }

    pub fn push(&mut self, c: Complex) {
        self.queue.push_back(c);
    }

    pub fn pop(&mut self) -> Option<Complex> {
        self.queue.pop_front()
    }

    /// Put `coords` back at the head of the queue, preserving their order.
    pub fn push_front_all(&mut self, coords: &[Complex]) {
        for &c in coords.iter().rev() {
            self.queue.push_front(c);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Complex> {
        self.queue.iter()
    }
}

impl Extend<Complex> for WantedSet {
    fn extend<I: IntoIterator<Item = Complex>>(&mut self, iter: I) {
        self.queue.extend(iter);
    }
}
