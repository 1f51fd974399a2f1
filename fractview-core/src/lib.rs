pub mod complex;
pub mod error;
pub mod fractal;
pub mod viewport;

pub use complex::Complex;
pub use error::CoreError;
pub use fractal::{iterate, FractalParams, FractalVariant};
pub use viewport::Viewport;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
