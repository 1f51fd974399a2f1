//! The controller half of the progressive renderer.
//!
//! [`Engine`] owns the authoritative viewport and parameters, turns gestures
//! into generations for the background worker, and hands results back to the
//! host through [`Engine::poll`]. Exactly one generation runs at a time. A
//! change that arrives mid-generation cancels it and is applied once the
//! worker reports the generation finished.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use fractview_core::{Complex, Viewport};

use crate::cancel::RenderCancel;
use crate::error::RenderError;
use crate::palette::recolor;
use crate::params::RenderParameters;
use crate::raster::{Raster, RasterSnapshot};
use crate::reproject::reproject;
use crate::wanted::WantedSet;
use crate::worker::{
    lock, spawn_worker, GenerationStats, Job, RasterStore, RepaintHook, WorkerEvent,
};
use crate::Result;

/// Pixels evaluated between two publications when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Where the engine is in its generation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Cancelled; the pre-generation raster comes back when the worker stops.
    CancelledRestoring,
    /// Cancelled; whatever the worker published stays.
    CancelledCommitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Cancelled { restored: bool },
}

/// Notifications delivered to the host by [`Engine::poll`].
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The raster changed; at most one per poll, carrying the latest state.
    RasterUpdated(RasterSnapshot),
    Progress { generation: u64, fraction: f64 },
    /// Emitted exactly once for every generation that was started.
    GenerationFinished {
        generation: u64,
        outcome: GenerationOutcome,
    },
}

/// Construction-time settings for an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Surface size in surface pixels.
    pub width: u32,
    pub height: u32,
    /// Surface pixels per raster pixel along each axis.
    pub raster_downscale: u32,
    pub batch_size: usize,
    pub params: RenderParameters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            raster_downscale: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            params: RenderParameters::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.raster_downscale == 0 {
            return Err(RenderError::InvalidDownscale(self.raster_downscale));
        }
        if self.batch_size == 0 {
            return Err(RenderError::InvalidBatchSize(self.batch_size));
        }
        self.params.fractal_params()?;
        Ok(())
    }

    /// The default view fitted to the surface, sampled at raster resolution.
    pub fn default_viewport(&self) -> fractview_core::Result<Viewport> {
        Ok(Viewport::default_for(self.width, self.height)?.downscaled(self.raster_downscale))
    }

    /// Raster dimensions for a surface of `width`×`height`.
    pub fn raster_size(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.div_ceil(self.raster_downscale),
            height.div_ceil(self.raster_downscale),
        )
    }
}

// ---------------------------------------------------------------------------
// Internal bookkeeping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running(u64),
    CancelledRestoring(u64),
    CancelledCommitting(u64),
}

/// Work waiting for the next handoff. Several changes merge into one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PendingWork {
    /// Clear the queue and scan the whole viewport.
    rescan: bool,
    /// Recolor stored iteration counts with the current parameters.
    recolor: bool,
}

impl PendingWork {
    const RESUME: Self = Self {
        rescan: false,
        recolor: false,
    };
    const RESCAN: Self = Self {
        rescan: true,
        recolor: false,
    };
    const RECOLOR: Self = Self {
        rescan: false,
        recolor: true,
    };

    fn merge(self, other: Self) -> Self {
        Self {
            rescan: self.rescan || other.rescan,
            recolor: self.recolor || other.recolor,
        }
    }
}

/// State captured when a generation starts, used to roll it back.
#[derive(Debug)]
struct Backup {
    viewport: Viewport,
    raster: Raster,
    wanted: WantedSet,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: EngineConfig,
    /// Where the surface is looking. May run ahead of the raster's viewport
    /// until the next handoff reprojects.
    viewport: Viewport,
    params: RenderParameters,
    phase: Phase,
    pending: Option<PendingWork>,
    /// `start` arrived during a cancel wind-down. Kept apart from `pending`
    /// so a restoring cancel still reverts the viewport.
    resume_queued: bool,
    backup: Option<Backup>,
    /// Sub-pixel pan motion not yet applied, in raster pixels.
    pan_remainder: (f64, f64),
    /// Generation whose pixels the raster currently reflects.
    last_generation: u64,

    store: Arc<Mutex<RasterStore>>,
    cancel: Arc<RenderCancel>,
    jobs: Option<mpsc::Sender<Job>>,
    events: mpsc::Receiver<WorkerEvent>,
    worker: Option<JoinHandle<()>>,

    raster_dirty: bool,
    outbox: Vec<EngineEvent>,
}

impl Engine {
    /// Create an idle engine showing the default view. Call
    /// [`start`](Self::start) to begin rendering.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`new`](Self::new), with `hook` run on the worker thread after
    /// every batch publication (e.g. to wake a UI loop).
    pub fn with_repaint_hook<F>(config: EngineConfig, hook: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(config, Some(Arc::new(hook)))
    }

    fn build(config: EngineConfig, hook: Option<RepaintHook>) -> Result<Self> {
        config.validate()?;
        let viewport = config.default_viewport()?;
        let (width, height) = (viewport.width, viewport.height);

        let store = Arc::new(Mutex::new(RasterStore {
            raster: Raster::allocate(viewport),
            wanted: WantedSet::new(),
            version: 0,
        }));
        let cancel = Arc::new(RenderCancel::new());
        let (jobs, events, worker) = spawn_worker(Arc::clone(&store), Arc::clone(&cancel), hook)
            .map_err(RenderError::WorkerSpawn)?;

        info!(
            width,
            height,
            downscale = config.raster_downscale,
            batch_size = config.batch_size,
            "Engine created"
        );

        Ok(Self {
            params: config.params,
            config,
            viewport,
            phase: Phase::Idle,
            pending: Some(PendingWork::RESCAN),
            resume_queued: false,
            backup: None,
            pan_remainder: (0.0, 0.0),
            last_generation: 0,
            store,
            cancel,
            jobs: Some(jobs),
            events,
            worker: Some(worker),
            raster_dirty: false,
            outbox: Vec::new(),
        })
    }

    // -- Accessors ----------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn params(&self) -> RenderParameters {
        self.params
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        match self.phase {
            Phase::Idle => SchedulerState::Idle,
            Phase::Running(_) => SchedulerState::Running,
            Phase::CancelledRestoring(_) => SchedulerState::CancelledRestoring,
            Phase::CancelledCommitting(_) => SchedulerState::CancelledCommitting,
        }
    }

    /// The generation in flight, if any.
    pub fn generation(&self) -> Option<u64> {
        match self.phase {
            Phase::Idle => None,
            Phase::Running(g) | Phase::CancelledRestoring(g) | Phase::CancelledCommitting(g) => {
                Some(g)
            }
        }
    }

    /// `true` when no generation runs and nothing is waiting to start.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle && self.pending.is_none()
    }

    /// Fraction of the current (or last) generation's queue drained.
    pub fn progress(&self) -> f64 {
        self.cancel.fraction()
    }

    /// Number of coordinates still queued for evaluation.
    pub fn wanted_len(&self) -> usize {
        lock(&self.store).wanted.len()
    }

    /// Immutable copy of the current raster.
    pub fn snapshot(&self) -> RasterSnapshot {
        let generation = self.generation().unwrap_or(self.last_generation);
        let guard = lock(&self.store);
        guard.raster.snapshot(generation, guard.version)
    }

    // -- Lifecycle ----------------------------------------------------------

    /// Start a generation draining the wanted set, applying any pending
    /// change first.
    ///
    /// A running generation is left alone and its number returned. While a
    /// cancelled generation winds down, a resume is queued behind it and
    /// `None` is returned.
    pub fn start(&mut self) -> Result<Option<u64>> {
        match self.phase {
            Phase::Idle => {
                self.request(PendingWork::RESUME)?;
                Ok(self.generation())
            }
            Phase::Running(g) => Ok(Some(g)),
            Phase::CancelledRestoring(_) | Phase::CancelledCommitting(_) => {
                self.resume_queued = true;
                Ok(None)
            }
        }
    }

    /// Cancel the running generation.
    ///
    /// With `restore`, the raster, wanted set and viewport revert to their
    /// state at generation start once the worker stops; otherwise published
    /// pixels stay and unevaluated coordinates remain queued. Returns `false`
    /// if nothing was running.
    pub fn cancel(&mut self, restore: bool) -> bool {
        match self.phase {
            Phase::Running(g) => {
                self.cancel.cancel();
                self.phase = if restore {
                    Phase::CancelledRestoring(g)
                } else {
                    Phase::CancelledCommitting(g)
                };
                debug!(generation = g, restore, "Generation cancelled");
                true
            }
            Phase::CancelledCommitting(g) if restore => {
                self.phase = Phase::CancelledRestoring(g);
                true
            }
            _ => false,
        }
    }

    /// Deliver worker notifications and start deferred work.
    ///
    /// Call regularly from the host's loop; the returned events are in the
    /// order they happened, with raster updates coalesced into one at the end.
    pub fn poll(&mut self) -> Result<Vec<EngineEvent>> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle(event)?,
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if self.phase != Phase::Idle {
                        return Err(RenderError::WorkerDisconnected);
                    }
                    break;
                }
            }
        }
        Ok(self.drain_outbox())
    }

    /// Block until the engine is idle or `timeout` elapses, returning every
    /// event delivered meanwhile.
    pub fn wait_idle(&mut self, timeout: Duration) -> Result<Vec<EngineEvent>> {
        let deadline = Instant::now() + timeout;
        let mut delivered = self.poll()?;
        while !self.is_idle() {
            if self.phase == Phase::Idle {
                // Pending work with nothing running; kick it off.
                self.handoff()?;
                delivered.extend(self.drain_outbox());
                continue;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) => self.handle(event)?,
                Err(RecvTimeoutError::Timeout) => return Err(RenderError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(RenderError::WorkerDisconnected),
            }
            delivered.extend(self.poll()?);
        }
        delivered.extend(self.drain_outbox());
        Ok(delivered)
    }

    // -- Inbound events -----------------------------------------------------

    /// The drawing surface changed size (in surface pixels).
    pub fn on_surface_resized(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let (raster_w, raster_h) = self.config.raster_size(width, height);
        if raster_w == self.viewport.width && raster_h == self.viewport.height {
            self.config.width = width;
            self.config.height = height;
            return Ok(());
        }
        let resized = self.viewport.resize(raster_w, raster_h)?;
        self.viewport = resized;
        self.config.width = width;
        self.config.height = height;
        debug!(raster_w, raster_h, "Surface resized");
        self.request(PendingWork::RESCAN)
    }

    /// Drag by (`dx`, `dy`) surface pixels; content follows the pointer.
    ///
    /// Only whole raster pixels are applied; the fractional remainder is kept
    /// for the next pan so reprojection stays an exact pixel shift.
    pub fn on_pan_delta(&mut self, dx: f64, dy: f64) -> Result<()> {
        let scale = f64::from(self.config.raster_downscale);
        let total_x = self.pan_remainder.0 + dx / scale;
        let total_y = self.pan_remainder.1 + dy / scale;
        let (whole_x, whole_y) = (total_x.trunc(), total_y.trunc());
        if whole_x == 0.0 && whole_y == 0.0 {
            self.pan_remainder = (total_x, total_y);
            return Ok(());
        }
        let viewport = self.viewport.panned(whole_x, whole_y).inspect_err(|e| {
            warn!(dx, dy, "Pan rejected: {e}");
        })?;
        self.pan_remainder = (total_x - whole_x, total_y - whole_y);
        self.viewport = viewport;
        self.request(PendingWork::RESUME)
    }

    /// Zoom by `factor` (> 1 zooms in) about the surface point
    /// (`center_x`, `center_y`), which stays fixed on screen.
    pub fn on_pinch_zoom(&mut self, factor: f64, center_x: f64, center_y: f64) -> Result<()> {
        let scale = f64::from(self.config.raster_downscale);
        let viewport = self
            .viewport
            .zoomed_about(factor, center_x / scale, center_y / scale)
            .inspect_err(|e| warn!(factor, "Zoom rejected: {e}"))?;
        self.viewport = viewport;
        self.pan_remainder = (0.0, 0.0);
        self.request(PendingWork::RESCAN)
    }

    /// Replace the render parameters.
    ///
    /// A change that only affects coloring recolors the stored iteration
    /// counts and resumes; anything else rescans the viewport.
    pub fn on_parameters_changed(&mut self, params: RenderParameters) -> Result<()> {
        params.fractal_params()?;
        if params == self.params {
            return Ok(());
        }
        let work = if params.same_iterations(&self.params) {
            PendingWork::RECOLOR
        } else {
            PendingWork::RESCAN
        };
        self.params = params;
        self.request(work)
    }

    /// Return to the default view for the current surface, abandoning the
    /// running generation's output.
    pub fn on_restore_default_view(&mut self) -> Result<()> {
        self.viewport = self.config.default_viewport()?;
        self.pan_remainder = (0.0, 0.0);
        self.cancel(true);
        self.request(PendingWork::RESCAN)
    }

    /// Jump to the rectangle centred on `center` spanning `range_re` along
    /// the real axis; the imaginary span follows the raster's aspect ratio.
    pub fn set_view(&mut self, center: Complex, range_re: f64) -> Result<()> {
        let vp = self.viewport;
        let range_im = range_re * f64::from(vp.height) / f64::from(vp.width);
        let viewport = vp
            .recenter_and_scale(
                center.re - range_re / 2.0,
                center.im + range_im / 2.0,
                range_re,
                range_im,
            )
            .inspect_err(|e| warn!(%center, range_re, "View rejected: {e}"))?;
        self.viewport = viewport;
        self.pan_remainder = (0.0, 0.0);
        self.request(PendingWork::RESCAN)
    }

    /// Stop rendering, keep what has been published, and drop queued changes.
    pub fn on_cancel_requested(&mut self) {
        self.pending = None;
        self.resume_queued = false;
        self.cancel(false);
    }

    // -- Internals ----------------------------------------------------------

    /// Queue `work`; start it now if idle, otherwise make sure the running
    /// generation stops so it can be applied.
    fn request(&mut self, work: PendingWork) -> Result<()> {
        self.pending = Some(self.pending.map_or(work, |p| p.merge(work)));
        match self.phase {
            Phase::Idle => self.handoff(),
            Phase::Running(_) => {
                self.cancel(false);
                Ok(())
            }
            Phase::CancelledRestoring(_) | Phase::CancelledCommitting(_) => Ok(()),
        }
    }

    fn handle(&mut self, event: WorkerEvent) -> Result<()> {
        match event {
            WorkerEvent::Published {
                generation,
                version,
            } => {
                trace!(generation, version, "Batch published");
                if self.generation() == Some(generation) {
                    self.raster_dirty = true;
                }
                Ok(())
            }
            WorkerEvent::Finished { generation, stats } => self.finish(generation, stats),
        }
    }

    fn finish(&mut self, generation: u64, stats: GenerationStats) -> Result<()> {
        let outcome = match self.phase {
            Phase::Running(g) if g == generation => GenerationOutcome::Completed,
            Phase::CancelledCommitting(g) if g == generation => {
                GenerationOutcome::Cancelled { restored: false }
            }
            Phase::CancelledRestoring(g) if g == generation => {
                self.restore_backup();
                GenerationOutcome::Cancelled { restored: true }
            }
            _ => {
                warn!(generation, "Finish for unknown generation ignored");
                return Ok(());
            }
        };
        debug_assert!(
            outcome != GenerationOutcome::Completed || !stats.cancelled,
            "worker reported a cancel the controller never requested"
        );

        if std::mem::take(&mut self.resume_queued) {
            self.pending = Some(
                self.pending
                    .map_or(PendingWork::RESUME, |p| p.merge(PendingWork::RESUME)),
            );
        }
        self.backup = None;
        self.phase = Phase::Idle;
        self.last_generation = generation;
        self.raster_dirty = true;
        self.outbox.push(EngineEvent::GenerationFinished {
            generation,
            outcome,
        });
        self.handoff()
    }

    fn restore_backup(&mut self) {
        let Some(backup) = self.backup.take() else {
            return;
        };
        {
            let mut guard = lock(&self.store);
            guard.raster = backup.raster;
            guard.wanted = backup.wanted;
            guard.version += 1;
        }
        // A change queued after the cancel already chose a new viewport.
        if self.pending.is_none() {
            self.viewport = backup.viewport;
        }
        debug!("Raster restored from backup");
    }

    /// Apply pending work and start the next generation. Only valid while
    /// idle, which is the one time the controller may rewrite the store.
    fn handoff(&mut self) -> Result<()> {
        debug_assert_eq!(self.phase, Phase::Idle);
        let Some(work) = self.pending.take() else {
            return Ok(());
        };

        let queued = {
            let mut guard = lock(&self.store);
            let mut changed = false;

            if *guard.raster.viewport() != self.viewport {
                let reprojection = reproject(&guard.raster, self.viewport);
                guard.raster = reprojection.raster;
                if work.rescan {
                    guard.wanted.clear();
                }
                guard.wanted.extend(reprojection.wanted);
                changed = true;
            } else if work.rescan {
                guard.wanted.clear();
            }
            if work.rescan {
                let viewport = self.viewport;
                guard.wanted.fill_scan(&viewport);
            } else if work.recolor {
                recolor(&mut guard.raster, &self.params);
                changed = true;
            }
            if changed {
                guard.version += 1;
                self.raster_dirty = true;
            }
            guard.wanted.len()
        };

        if queued == 0 {
            debug!("Nothing to evaluate; staying idle");
            return Ok(());
        }
        self.begin_generation(queued)
    }

    fn begin_generation(&mut self, queued: usize) -> Result<()> {
        let fractal = self.params.fractal_params()?;
        let backup = {
            let guard = lock(&self.store);
            Backup {
                viewport: self.viewport,
                raster: guard.raster.clone(),
                wanted: guard.wanted.clone(),
            }
        };
        let generation = self.cancel.advance();
        self.cancel.reset_progress(queued);

        let job = Job {
            generation,
            viewport: self.viewport,
            params: self.params,
            fractal,
            batch_size: self.config.batch_size,
        };
        let jobs = self.jobs.as_ref().ok_or(RenderError::WorkerDisconnected)?;
        jobs.send(job).map_err(|_| RenderError::WorkerDisconnected)?;

        self.backup = Some(backup);
        self.phase = Phase::Running(generation);
        debug!(generation, queued, "Generation started");
        Ok(())
    }

    fn drain_outbox(&mut self) -> Vec<EngineEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        if std::mem::take(&mut self.raster_dirty) {
            if let Some(generation) = self.generation() {
                events.push(EngineEvent::Progress {
                    generation,
                    fraction: self.cancel.fraction(),
                });
            }
            events.push(EngineEvent::RasterUpdated(self.snapshot()));
        }
        events
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Render worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("viewport", &self.viewport)
            .field("phase", &self.phase)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
