pub mod cancel;
pub mod error;
pub mod export;
pub mod palette;
pub mod params;
pub mod raster;
pub mod reproject;
pub mod scheduler;
pub mod wanted;
mod worker;

pub use cancel::RenderCancel;
pub use error::RenderError;
pub use export::{export_png, ExportMetadata};
pub use palette::{color_for, recolor, Gradient, Rgba, IN_SET_COLOR, OUT_OF_SET_COLOR, UNCOMPUTED};
pub use params::RenderParameters;
pub use raster::{Raster, RasterSnapshot};
pub use reproject::{reproject, Reprojection};
pub use scheduler::{
    Engine, EngineConfig, EngineEvent, GenerationOutcome, SchedulerState, DEFAULT_BATCH_SIZE,
};
pub use wanted::WantedSet;

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
