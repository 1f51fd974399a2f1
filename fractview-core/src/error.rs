use thiserror::Error;

/// Errors raised when building fractal parameters or viewports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid escape radius: {0} (must be > 0.0)")]
    InvalidEscapeRadius(f64),

    #[error("invalid color max iterations: {0} (must be > 0.0)")]
    InvalidColorMaxIterations(f64),

    #[error("invalid color distribution exponent: {0} (must be > 0.0)")]
    InvalidColorDistribution(f64),

    #[error("invalid viewport: {reason}")]
    InvalidViewport { reason: String },

    /// The requested rectangle collapses to zero area or below `f64` resolution.
    #[error("degenerate viewport: {reason}")]
    DegenerateViewport { reason: String },
}
