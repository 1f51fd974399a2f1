use serde::{Deserialize, Serialize};

use fractview_core::{CoreError, FractalParams, FractalVariant};

use crate::palette::Gradient;

/// Everything that decides the color of a pixel besides its position.
///
/// The engine snapshots one of these per generation; editing the live copy
/// never touches pixels an in-flight generation has already published.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderParameters {
    #[serde(default)]
    pub variant: FractalVariant,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_escape_radius")]
    pub escape_radius: f64,
    /// When `false`, every escaped pixel is drawn in the out-of-set color.
    #[serde(default = "default_true")]
    pub color_enabled: bool,
    /// Iteration count at which the gradient saturates to white.
    #[serde(default = "default_color_max_iterations")]
    pub color_max_iterations: f64,
    /// Exponent shaping how quickly low counts move along the gradient.
    #[serde(default = "default_color_distribution")]
    pub color_distribution: f64,
    #[serde(default)]
    pub gradient: Gradient,
}

fn default_max_iterations() -> u32 {
    FractalParams::DEFAULT_MAX_ITERATIONS
}
fn default_escape_radius() -> f64 {
    FractalParams::DEFAULT_ESCAPE_RADIUS
}
fn default_true() -> bool {
    true
}
fn default_color_max_iterations() -> f64 {
    400.0
}
fn default_color_distribution() -> f64 {
    30.0
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            variant: FractalVariant::default(),
            max_iterations: default_max_iterations(),
            escape_radius: default_escape_radius(),
            color_enabled: true,
            color_max_iterations: default_color_max_iterations(),
            color_distribution: default_color_distribution(),
            gradient: Gradient::default(),
        }
    }
}

impl RenderParameters {
    /// Check every numeric field and return the iteration limits.
    pub fn fractal_params(&self) -> fractview_core::Result<FractalParams> {
        if !(self.color_max_iterations > 0.0) || !self.color_max_iterations.is_finite() {
            return Err(CoreError::InvalidColorMaxIterations(self.color_max_iterations));
        }
        if !(self.color_distribution > 0.0) || !self.color_distribution.is_finite() {
            return Err(CoreError::InvalidColorDistribution(self.color_distribution));
        }
        FractalParams::new(self.max_iterations, self.escape_radius)
    }

    /// `true` if `other` would produce the same iteration counts, so only the
    /// coloring differs.
    pub fn same_iterations(&self, other: &Self) -> bool {
        self.variant == other.variant
            && self.max_iterations == other.max_iterations
            && self.escape_radius == other.escape_radius
    }

    pub fn with_variant(self, variant: FractalVariant) -> Self {
        Self { variant, ..self }
    }

    pub fn with_max_iterations(self, max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }
}
