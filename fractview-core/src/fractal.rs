use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::error::CoreError;

/// The escape-time formulas the engine can render.
///
/// A closed set: adding a variant means adding a `match` arm in
/// [`FractalVariant::step`], nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalVariant {
    /// `z² + c`
    #[default]
    Mandelbrot,
    /// `conj(z)² + c`
    Tricorn,
    /// `(|Re z| + i|Im z|)² + c`
    BurningShip,
    /// `z³ + c`
    Multibrot3,
    /// `z⁴ + c`
    Multibrot4,
}

impl FractalVariant {
    pub const ALL: [FractalVariant; 5] = [
        Self::Mandelbrot,
        Self::Tricorn,
        Self::BurningShip,
        Self::Multibrot3,
        Self::Multibrot4,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Mandelbrot => "Mandelbrot set",
            Self::Tricorn => "Tricorn",
            Self::BurningShip => "Burning ship",
            Self::Multibrot3 => "Multibrot (d = 3)",
            Self::Multibrot4 => "Multibrot (d = 4)",
        }
    }

    /// One application of the recurrence `z ↦ f(z) + c`.
    #[inline]
    pub fn step(self, z: Complex, c: Complex) -> Complex {
        let (re, im) = (z.re, z.im);
        match self {
            Self::Mandelbrot => Complex::new(re * re - im * im + c.re, 2.0 * re * im + c.im),
            Self::Tricorn => Complex::new(re * re - im * im + c.re, -2.0 * re * im + c.im),
            Self::BurningShip => {
                Complex::new(re * re - im * im + c.re, (2.0 * re * im).abs() + c.im)
            }
            Self::Multibrot3 => {
                let (re2, im2) = (re * re, im * im);
                Complex::new(re * (re2 - 3.0 * im2) + c.re, im * (3.0 * re2 - im2) + c.im)
            }
            Self::Multibrot4 => {
                let (re2, im2) = (re * re, im * im);
                Complex::new(
                    re2 * re2 - 6.0 * re2 * im2 + im2 * im2 + c.re,
                    4.0 * re * im * (re2 - im2) + c.im,
                )
            }
        }
    }

    /// Iterate `c` under this variant with validated parameters.
    #[inline]
    pub fn iterate(self, c: Complex, params: &FractalParams) -> u32 {
        iterate_sq(c, self, params.escape_radius_sq(), params.max_iterations)
    }
}

impl std::fmt::Display for FractalVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Count the steps `c`'s orbit (from `z₀ = 0`) takes to leave the disc of
/// radius `escape_radius`.
///
/// Returns a value in `[0, max_iterations]`; `max_iterations` means the orbit
/// never escaped and the point is treated as inside the set. A seed whose
/// first step already lands outside the radius returns `1`.
pub fn iterate(
    c: Complex,
    variant: FractalVariant,
    escape_radius: f64,
    max_iterations: u32,
) -> u32 {
    iterate_sq(c, variant, escape_radius * escape_radius, max_iterations)
}

#[inline]
fn iterate_sq(
    c: Complex,
    variant: FractalVariant,
    escape_radius_sq: f64,
    max_iterations: u32,
) -> u32 {
    if variant == FractalVariant::Mandelbrot
        && (in_cardioid(c.re, c.im) || in_period2_bulb(c.re, c.im))
    {
        return max_iterations;
    }

    let mut z = Complex::ZERO;
    let mut n = 0;
    while n < max_iterations && z.norm_sq() <= escape_radius_sq {
        z = variant.step(z, c);
        n += 1;
    }
    n
}

/// Closed-form test for the Mandelbrot main cardioid.
#[inline]
fn in_cardioid(re: f64, im: f64) -> bool {
    let im2 = im * im;
    let q = (re - 0.25) * (re - 0.25) + im2;
    q * (q + (re - 0.25)) <= 0.25 * im2
}

#[inline]
fn in_period2_bulb(re: f64, im: f64) -> bool {
    (re + 1.0) * (re + 1.0) + im * im <= 0.0625
}

/// Iteration limits shared by every variant.
///
/// `escape_radius_sq` is cached for the inner loop and recomputed on
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FractalParams {
    /// Iterations after which a point is declared inside the set.
    pub max_iterations: u32,

    /// Bailout radius; the loop compares `|z|²` against its square.
    pub escape_radius: f64,

    #[serde(skip)]
    escape_radius_sq: f64,
}

impl<'de> Deserialize<'de> for FractalParams {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            max_iterations: u32,
            escape_radius: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        FractalParams::new(raw.max_iterations, raw.escape_radius).map_err(serde::de::Error::custom)
    }
}

impl FractalParams {
    pub const DEFAULT_MAX_ITERATIONS: u32 = 100;
    pub const DEFAULT_ESCAPE_RADIUS: f64 = 2.0;

    pub fn new(max_iterations: u32, escape_radius: f64) -> crate::Result<Self> {
        if max_iterations < 1 {
            return Err(CoreError::InvalidMaxIterations(max_iterations));
        }
        if escape_radius <= 0.0 || !escape_radius.is_finite() {
            return Err(CoreError::InvalidEscapeRadius(escape_radius));
        }
        Ok(Self {
            max_iterations,
            escape_radius,
            escape_radius_sq: escape_radius * escape_radius,
        })
    }

    #[inline]
    pub fn escape_radius_sq(&self) -> f64 {
        self.escape_radius_sq
    }
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            escape_radius: Self::DEFAULT_ESCAPE_RADIUS,
            escape_radius_sq: Self::DEFAULT_ESCAPE_RADIUS * Self::DEFAULT_ESCAPE_RADIUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardioid_points_never_escape() {
        for &(re, im) in &[(0.0, 0.0), (-0.5, 0.0), (0.24, 0.0), (-0.1, 0.6), (0.2, -0.3)] {
            for n in [1, 7, 50, 1000] {
                assert_eq!(
                    iterate(Complex::new(re, im), FractalVariant::Mandelbrot, 2.0, n),
                    n,
                    "{re} + {im}i must stay bounded for {n} iterations"
                );
            }
        }
    }

    #[test]
    fn far_point_escapes_immediately_for_every_variant() {
        let c = Complex::new(5.0, 5.0);
        for variant in FractalVariant::ALL {
            let n = iterate(c, variant, 2.0, 100);
            assert!(n <= 2, "{variant} took {n} iterations");
        }
    }

    #[test]
    fn known_escape_counts() {
        // c = 1: z = 1, 2, 5 → |5|² > 4 after three steps.
        assert_eq!(iterate(Complex::new(1.0, 0.0), FractalVariant::Mandelbrot, 2.0, 50), 3);
        // c = -2 + 2i leaves the radius on the first step.
        assert_eq!(iterate(Complex::new(-2.0, 2.0), FractalVariant::Mandelbrot, 2.0, 50), 1);
    }

    #[test]
    fn count_never_exceeds_limit() {
        for variant in FractalVariant::ALL {
            assert_eq!(iterate(Complex::ZERO, variant, 2.0, 37), 37);
        }
    }

    #[test]
    fn minus_one_is_period_two_for_all_quadratics() {
        for variant in [
            FractalVariant::Mandelbrot,
            FractalVariant::Tricorn,
            FractalVariant::BurningShip,
        ] {
            assert_eq!(iterate(Complex::new(-1.0, 0.0), variant, 2.0, 500), 500);
        }
    }

    #[test]
    fn tricorn_step_uses_conjugate() {
        let z = Complex::new(0.3, 0.7);
        let c = Complex::new(-0.1, 0.2);
        let expected = z.conj() * z.conj() + c;
        let got = FractalVariant::Tricorn.step(z, c);
        assert!((got.re - expected.re).abs() < 1e-15);
        assert!((got.im - expected.im).abs() < 1e-15);
    }

    #[test]
    fn burning_ship_step_folds_components() {
        let z = Complex::new(-0.4, 0.9);
        let c = Complex::new(0.1, -0.3);
        let folded = z.abs_components();
        let expected = folded * folded + c;
        let got = FractalVariant::BurningShip.step(z, c);
        assert!((got.re - expected.re).abs() < 1e-15);
        assert!((got.im - expected.im).abs() < 1e-15);
    }

    #[test]
    fn multibrot_steps_match_repeated_products() {
        let z = Complex::new(0.6, -0.8);
        let c = Complex::new(0.05, 0.02);
        let cube = z * z * z + c;
        let quad = z * z * z * z + c;
        let got3 = FractalVariant::Multibrot3.step(z, c);
        let got4 = FractalVariant::Multibrot4.step(z, c);
        assert!((got3.re - cube.re).abs() < 1e-12 && (got3.im - cube.im).abs() < 1e-12);
        assert!((got4.re - quad.re).abs() < 1e-12 && (got4.im - quad.im).abs() < 1e-12);
    }

    #[test]
    fn params_validation() {
        assert!(FractalParams::new(0, 2.0).is_err());
        assert!(FractalParams::new(10, 0.0).is_err());
        assert!(FractalParams::new(10, f64::NAN).is_err());
        let p = FractalParams::new(10, 3.0).unwrap();
        assert_eq!(p.escape_radius_sq(), 9.0);
    }

    #[test]
    fn params_deserialize_recomputes_cache() {
        let p: FractalParams =
            serde_json::from_str(r#"{"max_iterations": 64, "escape_radius": 4.0}"#).unwrap();
        assert_eq!(p.escape_radius_sq(), 16.0);
        assert!(serde_json::from_str::<FractalParams>(
            r#"{"max_iterations": 0, "escape_radius": 4.0}"#
        )
        .is_err());
    }

    #[test]
    fn variant_serde_names() {
        let json = serde_json::to_string(&FractalVariant::BurningShip).unwrap();
        assert_eq!(json, "\"burning_ship\"");
        let v: FractalVariant = serde_json::from_str("\"multibrot4\"").unwrap();
        assert_eq!(v, FractalVariant::Multibrot4);
    }
}
