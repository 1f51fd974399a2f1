use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Generation counter shared between the controller and the render worker.
///
/// Each started generation takes a fresh number from [`advance`](Self::advance);
/// cancelling advances it again, so any work tagged with an older number
/// sees [`is_current`](Self::is_current) return `false` and stops. The
/// progress counters let the surface show how much of the current
/// generation's queue has been drained.
#[derive(Debug)]
pub struct RenderCancel {
    generation: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            generation: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Start a new generation and return its number.
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Invalidate whatever generation is currently running.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    #[inline]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Reset progress for a generation with `total` queued coordinates.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    pub fn add_progress(&self, done: usize) {
        self.progress_done.fetch_add(done, Ordering::Relaxed);
    }

    /// `(done, total)` for the current generation.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }

    /// Fraction of the queue drained so far, `1.0` for an empty queue.
    pub fn fraction(&self) -> f64 {
        let (done, total) = self.progress();
        if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).min(1.0)
        }
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}
