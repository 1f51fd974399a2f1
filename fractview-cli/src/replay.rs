use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info, warn};

use fractview_render::{Engine, EngineEvent, GenerationOutcome, RenderError};

use crate::config::Gesture;

/// Polling interval while a scripted wait runs.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Tally of the generations seen during a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub completed: usize,
    pub cancelled: usize,
    pub restored: usize,
    pub rejected_gestures: usize,
}

impl ReplaySummary {
    fn record(&mut self, events: Vec<EngineEvent>) {
        for event in events {
            match event {
                EngineEvent::GenerationFinished {
                    generation,
                    outcome,
                } => {
                    match outcome {
                        GenerationOutcome::Completed => self.completed += 1,
                        GenerationOutcome::Cancelled { restored } => {
                            self.cancelled += 1;
                            if restored {
                                self.restored += 1;
                            }
                        }
                    }
                    info!(generation, ?outcome, "Generation finished");
                }
                EngineEvent::Progress {
                    generation,
                    fraction,
                } => debug!(generation, "Progress {:.0}%", fraction * 100.0),
                EngineEvent::RasterUpdated(_) => {}
            }
        }
    }
}

/// Start rendering, feed `script` to the engine, then wait for it to settle.
///
/// Gestures the engine rejects (degenerate zoom, empty resize, invalid
/// parameters) are logged and skipped, leaving the view as it was.
pub fn replay(engine: &mut Engine, script: &[Gesture], timeout: Duration) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    engine.start()?;

    for (index, gesture) in script.iter().enumerate() {
        debug!(index, ?gesture, "Replaying gesture");
        let applied = match gesture {
            Gesture::Pan { dx, dy } => engine.on_pan_delta(*dx, *dy),
            Gesture::Pinch { factor, x, y } => engine.on_pinch_zoom(*factor, *x, *y),
            Gesture::Resize { width, height } => engine.on_surface_resized(*width, *height),
            Gesture::Parameters { params } => engine.on_parameters_changed(*params),
            Gesture::RestoreDefault => engine.on_restore_default_view(),
            Gesture::Cancel => {
                engine.on_cancel_requested();
                Ok(())
            }
            Gesture::Wait { millis: Some(ms) } => {
                wait_for(engine, Duration::from_millis(*ms), &mut summary)?;
                Ok(())
            }
            Gesture::Wait { millis: None } => {
                summary.record(engine.wait_idle(timeout)?);
                Ok(())
            }
        };
        match applied {
            Ok(()) => {}
            Err(e @ (RenderError::Core(_) | RenderError::InvalidDimensions { .. })) => {
                warn!(index, "Gesture rejected: {e}");
                summary.rejected_gestures += 1;
            }
            Err(e) => return Err(e.into()),
        }
        summary.record(engine.poll()?);
    }

    summary.record(engine.wait_idle(timeout)?);
    Ok(summary)
}

/// Keep the engine's events flowing for `duration` without requiring it to
/// finish.
fn wait_for(engine: &mut Engine, duration: Duration, summary: &mut ReplaySummary) -> Result<()> {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        summary.record(engine.poll()?);
        thread::sleep(POLL_INTERVAL.min(deadline.saturating_duration_since(Instant::now())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractview_render::{EngineConfig, RenderParameters};

    const TIMEOUT: Duration = Duration::from_secs(30);

    fn engine(size: u32) -> Engine {
        Engine::new(EngineConfig {
            width: size,
            height: size,
            batch_size: 32,
            params: RenderParameters::default().with_max_iterations(40),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn empty_script_renders_once() {
        let mut engine = engine(24);
        let summary = replay(&mut engine, &[], TIMEOUT).unwrap();
        assert_eq!(summary.completed, 1);
        assert_eq!(summary.cancelled, 0);
        assert_eq!(engine.snapshot().computed_count(), 24 * 24);
    }

    #[test]
    fn gestures_end_fully_rendered() {
        let mut engine = engine(32);
        let script = [
            Gesture::Pan { dx: 5.0, dy: 3.0 },
            Gesture::Pinch {
                factor: 2.5,
                x: 10.0,
                y: 20.0,
            },
            Gesture::Wait { millis: Some(5) },
            Gesture::Resize {
                width: 40,
                height: 24,
            },
            Gesture::Wait { millis: None },
            Gesture::Pan { dx: -7.0, dy: 0.0 },
        ];
        let summary = replay(&mut engine, &script, TIMEOUT).unwrap();
        assert!(summary.completed >= 1);
        assert_eq!(summary.rejected_gestures, 0);
        let snapshot = engine.snapshot();
        assert_eq!((snapshot.width(), snapshot.height()), (40, 24));
        assert_eq!(snapshot.computed_count(), 40 * 24);
    }

    #[test]
    fn rejected_gestures_are_skipped() {
        let mut engine = engine(16);
        let mut bad = RenderParameters::default();
        bad.color_distribution = -1.0;
        let script = [
            Gesture::Pinch {
                factor: 0.0,
                x: 8.0,
                y: 8.0,
            },
            Gesture::Resize {
                width: 0,
                height: 16,
            },
            Gesture::Parameters { params: bad },
        ];
        let summary = replay(&mut engine, &script, TIMEOUT).unwrap();
        assert_eq!(summary.rejected_gestures, 3);
        assert_eq!(engine.snapshot().computed_count(), 256);
    }

    #[test]
    fn cancel_leaves_engine_idle() {
        let mut engine = engine(16);
        let summary = replay(&mut engine, &[Gesture::Cancel], TIMEOUT).unwrap();
        assert_eq!(summary.completed + summary.cancelled, 1);
        assert!(engine.is_idle());
    }
}
