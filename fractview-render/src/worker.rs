//! The background side of the scheduler: drains the wanted set for one
//! generation at a time and publishes finished pixels in batches.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use tracing::{debug, info};

use fractview_core::{Complex, FractalParams, Viewport};

use crate::cancel::RenderCancel;
use crate::palette::{color_for, Rgba};
use crate::params::RenderParameters;
use crate::raster::Raster;
use crate::wanted::WantedSet;

/// Callback run on the worker thread after each batch lands in the raster.
pub type RepaintHook = Arc<dyn Fn() + Send + Sync>;

/// State shared by the controller and the worker.
///
/// The worker only takes the lock to pop one coordinate or to publish a
/// batch; the controller takes it to snapshot, reproject or roll back, and
/// only mutates it while no generation is running.
#[derive(Debug)]
pub(crate) struct RasterStore {
    pub raster: Raster,
    pub wanted: WantedSet,
    /// Bumped on every change to `raster`.
    pub version: u64,
}

pub(crate) fn lock(store: &Mutex<RasterStore>) -> MutexGuard<'_, RasterStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Immutable description of one generation.
pub(crate) struct Job {
    pub generation: u64,
    pub viewport: Viewport,
    pub params: RenderParameters,
    pub fractal: FractalParams,
    pub batch_size: usize,
}

/// What the worker did with a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GenerationStats {
    pub evaluated: usize,
    pub discarded: usize,
    pub batches: usize,
    pub cancelled: bool,
}

pub(crate) enum WorkerEvent {
    Published { generation: u64, version: u64 },
    Finished { generation: u64, stats: GenerationStats },
}

struct Sample {
    c: Complex,
    iterations: u32,
    color: Rgba,
}

/// Spawn the render worker thread.
///
/// The thread runs until the job sender is dropped.
pub(crate) fn spawn_worker(
    store: Arc<Mutex<RasterStore>>,
    cancel: Arc<RenderCancel>,
    repaint: Option<RepaintHook>,
) -> std::io::Result<(mpsc::Sender<Job>, mpsc::Receiver<WorkerEvent>, JoinHandle<()>)> {
    let (job_tx, job_rx) = mpsc::channel::<Job>();
    let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();

    let handle = std::thread::Builder::new()
        .name("render-worker".into())
        .spawn(move || {
            debug!("Render worker started");
            while let Ok(job) = job_rx.recv() {
                let start = Instant::now();
                let stats = run_generation(&job, &store, &cancel, &event_tx, repaint.as_ref());
                info!(
                    generation = job.generation,
                    evaluated = stats.evaluated,
                    discarded = stats.discarded,
                    batches = stats.batches,
                    cancelled = stats.cancelled,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Generation finished"
                );
                let finished = WorkerEvent::Finished {
                    generation: job.generation,
                    stats,
                };
                if event_tx.send(finished).is_err() {
                    break;
                }
            }
            debug!("Render worker stopped");
        })?;

    Ok((job_tx, event_rx, handle))
}

/// Drain the wanted set for `job` until it is empty or the generation is
/// cancelled.
///
/// Cancellation is checked before every evaluation. On cancel, coordinates
/// evaluated but not yet published go back to the head of the queue so a
/// later generation picks them up again.
fn run_generation(
    job: &Job,
    store: &Mutex<RasterStore>,
    cancel: &RenderCancel,
    events: &mpsc::Sender<WorkerEvent>,
    repaint: Option<&RepaintHook>,
) -> GenerationStats {
    let mut stats = GenerationStats::default();
    let mut batch: Vec<Sample> = Vec::with_capacity(job.batch_size);

    loop {
        if !cancel.is_current(job.generation) {
            requeue(store, &mut batch);
            stats.cancelled = true;
            return stats;
        }

        let next = lock(store).wanted.pop();
        let Some(c) = next else { break };

        // Points queued before a later pan may have left the screen.
        if !job.viewport.contains(c) {
            stats.discarded += 1;
            cancel.add_progress(1);
            continue;
        }

        let iterations = job.params.variant.iterate(c, &job.fractal);
        batch.push(Sample {
            c,
            iterations,
            color: color_for(iterations, &job.params),
        });
        stats.evaluated += 1;

        if batch.len() >= job.batch_size {
            if !publish(job, store, cancel, events, repaint, &mut batch) {
                stats.cancelled = true;
                return stats;
            }
            stats.batches += 1;
        }
    }

    if !batch.is_empty() {
        if !publish(job, store, cancel, events, repaint, &mut batch) {
            stats.cancelled = true;
            return stats;
        }
        stats.batches += 1;
    }
    stats
}

/// Write `batch` into the raster if the generation is still current.
///
/// The generation check and the writes happen under one lock, so a batch
/// can never land after the controller has taken over the store.
fn publish(
    job: &Job,
    store: &Mutex<RasterStore>,
    cancel: &RenderCancel,
    events: &mpsc::Sender<WorkerEvent>,
    repaint: Option<&RepaintHook>,
    batch: &mut Vec<Sample>,
) -> bool {
    let version = {
        let mut guard = lock(store);
        if !cancel.is_current(job.generation) {
            let coords: Vec<Complex> = batch.drain(..).map(|s| s.c).collect();
            guard.wanted.push_front_all(&coords);
            return false;
        }
        debug_assert_eq!(*guard.raster.viewport(), job.viewport);
        for sample in batch.iter() {
            let (x, y) = job.viewport.complex_to_pixel(sample.c);
            guard.raster.set(x, y, sample.iterations, sample.color);
        }
        guard.version += 1;
        guard.version
    };

    cancel.add_progress(batch.len());
    batch.clear();
    // The controller may already be gone; nothing to notify then.
    let _ = events.send(WorkerEvent::Published {
        generation: job.generation,
        version,
    });
    if let Some(hook) = repaint {
        hook();
    }
    true
}

fn requeue(store: &Mutex<RasterStore>, batch: &mut Vec<Sample>) {
    if batch.is_empty() {
        return;
    }
    let coords: Vec<Complex> = batch.drain(..).map(|s| s.c).collect();
    lock(store).wanted.push_front_all(&coords);
}
