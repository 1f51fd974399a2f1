use std::time::Duration;

use thiserror::Error;

/// Errors originating from the rendering engine.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid surface dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("invalid raster downscale factor: {0} (must be > 0)")]
    InvalidDownscale(u32),

    #[error("failed to spawn render worker")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("render worker is no longer running")]
    WorkerDisconnected,

    #[error("engine did not settle within {0:?}")]
    Timeout(Duration),

    #[error("failed to encode PNG")]
    Png(#[from] png::EncodingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] fractview_core::CoreError),
}
