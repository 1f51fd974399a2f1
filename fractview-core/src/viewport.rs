use crate::complex::Complex;
use crate::error::CoreError;

/// How many ULPs of the largest visible coordinate a pixel must span before
/// `f64` can no longer tell neighbouring pixels apart.
pub const PRECISION_LIMIT_ULPS: f64 = 16.0;

/// The rectangle of the complex plane mapped onto the raster.
///
/// `top_left` is the plane point drawn at pixel `(0, 0)`. Pixel x grows to
/// the right along the real axis; pixel y grows downward while the imaginary
/// axis grows upward.
///
/// A `Viewport` is never edited field by field: every operation returns a
/// fresh, validated value which the caller swaps in wholesale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub top_left: Complex,

    /// Width of the rectangle in complex-plane units.
    pub range_re: f64,

    /// Height of the rectangle in complex-plane units.
    pub range_im: f64,

    /// Raster width in pixels.
    pub width: u32,

    /// Raster height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Origin of the default square view.
    pub const DEFAULT_TOP_LEFT: Complex = Complex { re: -2.0, im: 2.0 };

    /// Side length of the default square view.
    pub const DEFAULT_RANGE: f64 = 4.0;

    /// The `(-2, 2)` + `4 × 4` view, fitted to a `width × height` surface.
    ///
    /// The default rectangle assumes a square surface. For other shapes it is
    /// laid out on a square of side `min(width, height)` and then resized, so
    /// the short axis spans exactly 4 units and the long axis grows about the
    /// centre.
    pub fn default_for(width: u32, height: u32) -> crate::Result<Self> {
        let side = width.min(height);
        let square = Self::new(
            Self::DEFAULT_TOP_LEFT,
            Self::DEFAULT_RANGE,
            Self::DEFAULT_RANGE,
            side,
            side,
        )?;
        square.resize(width, height)
    }

    /// Create a viewport, rejecting empty rasters and degenerate rectangles.
    pub fn new(
        top_left: Complex,
        range_re: f64,
        range_im: f64,
        width: u32,
        height: u32,
    ) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {width}×{height}"),
            });
        }
        if !top_left.is_finite() {
            return Err(CoreError::InvalidViewport {
                reason: format!("origin must be finite, got {top_left}"),
            });
        }
        check_axis("real", top_left.re, top_left.re + range_re, range_re, width)?;
        check_axis("imaginary", top_left.im, top_left.im - range_im, range_im, height)?;
        Ok(Self {
            top_left,
            range_re,
            range_im,
            width,
            height,
        })
    }

    /// Map a pixel to the plane point it samples.
    #[inline]
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        self.subpixel_to_complex(px as f64, py as f64)
    }

    /// Like [`pixel_to_complex`](Self::pixel_to_complex) for fractional
    /// (and possibly out-of-range) pixel positions.
    #[inline]
    pub fn subpixel_to_complex(&self, px: f64, py: f64) -> Complex {
        let offset = Complex::new(
            px / self.width as f64 * self.range_re,
            -(py / self.height as f64 * self.range_im),
        );
        self.top_left + offset
    }

    /// Map a plane point to the nearest pixel.
    ///
    /// The result may lie outside the raster; callers use that to test
    /// membership. Non-finite input saturates and must be filtered by the
    /// caller (see [`contains`](Self::contains)).
    #[inline]
    pub fn complex_to_pixel(&self, c: Complex) -> (i64, i64) {
        let d = c - self.top_left;
        let x = d.re / self.range_re * self.width as f64;
        let y = -d.im / self.range_im * self.height as f64;
        (x.round() as i64, y.round() as i64)
    }

    /// `true` if `c` lands on a pixel of this raster.
    #[inline]
    pub fn contains(&self, c: Complex) -> bool {
        if !c.is_finite() {
            return false;
        }
        let (x, y) = self.complex_to_pixel(c);
        self.contains_pixel(x, y)
    }

    /// `true` if `(x, y)` indexes a pixel of this raster.
    #[inline]
    pub fn contains_pixel(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Change the pixel dimensions, growing or shrinking the rectangle about
    /// its centre so each pixel keeps covering the same plane area.
    pub fn resize(&self, width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {width}×{height}"),
            });
        }
        let grow_re = (width as f64 - self.width as f64) / self.width as f64 * self.range_re;
        let grow_im = (height as f64 - self.height as f64) / self.height as f64 * self.range_im;
        Self::new(
            self.top_left - Complex::new(grow_re, -grow_im) * 0.5,
            self.range_re + grow_re,
            self.range_im + grow_im,
            width,
            height,
        )
    }

    /// Replace the rectangle while keeping the pixel dimensions.
    pub fn recenter_and_scale(
        &self,
        origin_re: f64,
        origin_im: f64,
        range_re: f64,
        range_im: f64,
    ) -> crate::Result<Self> {
        Self::new(
            Complex::new(origin_re, origin_im),
            range_re,
            range_im,
            self.width,
            self.height,
        )
    }

    /// Move the rectangle so the content follows a pointer drag of
    /// `(dx, dy)` pixels: dragging right reveals what lay to the left.
    pub fn panned(&self, dx: f64, dy: f64) -> crate::Result<Self> {
        let (step_re, step_im) = self.pixel_spacing();
        Self::new(
            self.top_left - Complex::new(dx * step_re, -(dy * step_im)),
            self.range_re,
            self.range_im,
            self.width,
            self.height,
        )
    }

    /// Magnify by `factor` (> 1 zooms in) keeping the plane point under pixel
    /// `(cx, cy)` fixed on screen.
    pub fn zoomed_about(&self, factor: f64, cx: f64, cy: f64) -> crate::Result<Self> {
        if !(factor > 0.0) || !factor.is_finite() {
            return Err(CoreError::DegenerateViewport {
                reason: format!("zoom factor must be positive and finite, got {factor}"),
            });
        }
        let anchor = self.subpixel_to_complex(cx, cy);
        let range_re = self.range_re / factor;
        let range_im = self.range_im / factor;
        let offset = Complex::new(
            cx / self.width as f64 * range_re,
            -(cy / self.height as f64 * range_im),
        );
        Self::new(anchor - offset, range_re, range_im, self.width, self.height)
    }

    /// The same rectangle sampled at `ceil(width / factor) × ceil(height / factor)`.
    pub fn downscaled(&self, factor: u32) -> Self {
        let f = factor.max(1);
        Self {
            width: self.width.div_ceil(f),
            height: self.height.div_ceil(f),
            ..*self
        }
    }

    /// Centre of the rectangle.
    pub fn center(&self) -> Complex {
        self.top_left + Complex::new(self.range_re, -self.range_im) * 0.5
    }

    /// Plane units per pixel along each axis.
    pub fn pixel_spacing(&self) -> (f64, f64) {
        (
            self.range_re / self.width as f64,
            self.range_im / self.height as f64,
        )
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn check_axis(axis: &str, start: f64, end: f64, range: f64, pixels: u32) -> crate::Result<()> {
    if !(range > 0.0) || !range.is_finite() {
        return Err(CoreError::DegenerateViewport {
            reason: format!("{axis} range must be positive and finite, got {range}"),
        });
    }
    let spacing = range / pixels as f64;
    let magnitude = start.abs().max(end.abs());
    if spacing < f64::MIN_POSITIVE || spacing <= magnitude * f64::EPSILON * PRECISION_LIMIT_ULPS {
        return Err(CoreError::DegenerateViewport {
            reason: format!(
                "{axis} pixel spacing {spacing:e} is below f64 resolution near {magnitude:e}"
            ),
        });
    }
    Ok(())
}
