//! Resampling an existing raster onto a new viewport.

use rayon::prelude::*;

use fractview_core::{Complex, Viewport};

use crate::palette::{Rgba, UNCOMPUTED};
use crate::raster::Raster;

/// Output of [`reproject`]: the resampled raster plus the plane points it
/// could not fill.
#[derive(Debug, Clone)]
pub struct Reprojection {
    pub raster: Raster,
    /// Coordinates outside the old rectangle, in scan order.
    pub wanted: Vec<Complex>,
}

/// Build the raster for `new_viewport` from `old`, reusing every pixel whose
/// plane point was inside the old rectangle.
///
/// Each new pixel takes the nearest old pixel's color and iteration count,
/// including the uncomputed sentinel, so half-finished pixels stay marked.
/// Pixels outside the old rectangle start uncomputed and their plane point is
/// returned in [`Reprojection::wanted`]. Bounds are tested against the old
/// viewport only, so nothing is ever copied from a position the old raster
/// did not cover.
pub fn reproject(old: &Raster, new_viewport: Viewport) -> Reprojection {
    let old_vp = *old.viewport();
    let width = new_viewport.width as usize;

    if old_vp == new_viewport {
        return Reprojection {
            raster: old.clone(),
            wanted: Vec::new(),
        };
    }

    // One row per task; each row reports its misses in x order so the
    // concatenation keeps scan order.
    let rows: Vec<(Vec<Rgba>, Vec<Option<u32>>, Vec<Complex>)> = (0..new_viewport.height)
        .into_par_iter()
        .map(|py| {
            let mut colors = Vec::with_capacity(width);
            let mut iterations = Vec::with_capacity(width);
            let mut misses = Vec::new();
            for px in 0..new_viewport.width {
                let c = new_viewport.pixel_to_complex(px, py);
                let (ox, oy) = old_vp.complex_to_pixel(c);
                if old_vp.contains_pixel(ox, oy) {
                    let index = oy as usize * old_vp.width as usize + ox as usize;
                    let (color, n) = old.pixel(index);
                    colors.push(color);
                    iterations.push(n);
                } else {
                    colors.push(UNCOMPUTED);
                    iterations.push(None);
                    misses.push(c);
                }
            }
            (colors, iterations, misses)
        })
        .collect();

    let len = new_viewport.pixel_count();
    let mut colors = Vec::with_capacity(len);
    let mut iterations = Vec::with_capacity(len);
    let mut wanted = Vec::new();
    for (row_colors, row_iterations, row_misses) in rows {
        colors.extend(row_colors);
        iterations.extend(row_iterations);
        wanted.extend(row_misses);
    }

    Reprojection {
        raster: Raster::from_parts(new_viewport, colors, iterations),
        wanted,
    }
}
