//! Iteration count → RGBA color.
//!
//! Every function here is pure: a pixel's color depends on nothing but its
//! own iteration count and the parameters, so pixels can be colored in any
//! order or in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::params::RenderParameters;
use crate::raster::Raster;

/// An RGBA color, 8 bits per channel.
pub type Rgba = [u8; 4];

/// Color of points that never escaped.
pub const IN_SET_COLOR: Rgba = [0, 0, 0, 255];

/// Color of escaped points when coloring is disabled, and of saturated ones.
pub const OUT_OF_SET_COLOR: Rgba = [255, 255, 255, 255];

/// Marks a pixel whose value is not known yet. Every computed color is
/// opaque, so the transparent zero can never be confused with one.
pub const UNCOMPUTED: Rgba = [0, 0, 0, 0];

/// Gradient used for escaped points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gradient {
    /// Blue at 0, red at ½, green at 1.
    #[default]
    Tricolor,
    /// Blue at 0, red at ⅓, green at ⅔, fading into white at 1.
    Spectrum,
}

/// Map an iteration count to its display color.
pub fn color_for(iterations: u32, params: &RenderParameters) -> Rgba {
    if iterations >= params.max_iterations {
        return IN_SET_COLOR;
    }
    if !params.color_enabled {
        return OUT_OF_SET_COLOR;
    }
    let v = gradient_position(iterations, params.color_max_iterations, params.color_distribution);
    if v >= 1.0 {
        return OUT_OF_SET_COLOR;
    }
    match params.gradient {
        Gradient::Tricolor => tricolor(v),
        Gradient::Spectrum => spectrum(v),
    }
}

/// `1 − (1 − n / max)^exponent`, saturating at 1 once `n` reaches `max`.
pub fn gradient_position(iterations: u32, color_max_iterations: f64, exponent: f64) -> f64 {
    let ratio = iterations as f64 / color_max_iterations;
    if ratio >= 1.0 {
        return 1.0;
    }
    1.0 - (1.0 - ratio).powf(exponent)
}

fn tricolor(v: f64) -> Rgba {
    // Each channel peaks at its stop and falls to zero half a unit away.
    const SLOPE: f64 = 510.0;
    let blue = (255.0 - v * SLOPE).max(0.0);
    let red = (255.0 - (0.5 - v).abs() * SLOPE).max(0.0);
    let green = (255.0 - (1.0 - v) * SLOPE).max(0.0);
    [red as u8, green as u8, blue as u8, 255]
}

fn spectrum(v: f64) -> Rgba {
    const THIRD: f64 = 1.0 / 3.0;
    let hat = |center: f64| (1.0 - (v - center).abs() / THIRD).max(0.0);
    let blue = (1.0 - v / THIRD).max(0.0) * 255.0;
    let red = hat(THIRD) * 255.0;
    let green = hat(2.0 * THIRD) * 255.0;
    let white = hat(1.0);
    let whiten = |channel: f64| (channel + (255.0 - channel) * white).min(255.0) as u8;
    [whiten(red), whiten(green), whiten(blue), 255]
}

/// Recolor every computed pixel of `raster` from its stored iteration count.
///
/// Uncomputed pixels keep the sentinel. Only valid when `params` produce the
/// same iteration counts as the ones the raster was computed with.
pub fn recolor(raster: &mut Raster, params: &RenderParameters) {
    let (colors, iterations) = raster.channels_mut();
    colors
        .par_iter_mut()
        .zip(iterations.par_iter())
        .for_each(|(color, &n)| {
            if let Some(n) = n {
                *color = color_for(n, params);
            }
        });
}
