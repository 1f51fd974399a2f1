use fractview_core::{iterate, Complex, FractalParams, FractalVariant, Viewport};

/// Evaluate every pixel of a viewport in scan order.
fn render_grid(variant: FractalVariant, params: &FractalParams, viewport: &Viewport) -> Vec<u32> {
    let mut counts = Vec::with_capacity(viewport.pixel_count());
    for py in 0..viewport.height {
        for px in 0..viewport.width {
            counts.push(variant.iterate(viewport.pixel_to_complex(px, py), params));
        }
    }
    counts
}

#[test]
fn default_view_has_interior_and_exterior() {
    let params = FractalParams::new(50, 2.0).unwrap();
    let viewport = Viewport::default_for(64, 64).unwrap();

    for variant in FractalVariant::ALL {
        let counts = render_grid(variant, &params, &viewport);
        assert_eq!(counts.len(), 64 * 64);
        let interior = counts.iter().filter(|&&n| n == 50).count();
        assert!(interior > 0, "{variant}: expected interior pixels");
        assert!(interior < counts.len(), "{variant}: expected escaping pixels");
    }
}

#[test]
fn center_and_corner_of_default_view() {
    let viewport = Viewport::default_for(64, 64).unwrap();

    let center = viewport.pixel_to_complex(32, 32);
    assert_eq!(iterate(center, FractalVariant::Mandelbrot, 2.0, 50), 50);

    let corner = viewport.pixel_to_complex(0, 0);
    assert_eq!(corner, Complex::new(-2.0, 2.0));
    assert!(iterate(corner, FractalVariant::Mandelbrot, 2.0, 50) <= 1);
}

#[test]
fn rendering_is_deterministic() {
    let params = FractalParams::default();
    let viewport = Viewport::default_for(48, 32).unwrap();
    let run1 = render_grid(FractalVariant::BurningShip, &params, &viewport);
    let run2 = render_grid(FractalVariant::BurningShip, &params, &viewport);
    assert_eq!(run1, run2);
}

#[test]
fn conjugate_seeds_share_counts() {
    let params = FractalParams::new(200, 2.0).unwrap();
    let viewport = Viewport::default_for(40, 40).unwrap();
    for variant in [
        FractalVariant::Mandelbrot,
        FractalVariant::Tricorn,
        FractalVariant::Multibrot3,
        FractalVariant::Multibrot4,
    ] {
        for py in 0..viewport.height {
            for px in 0..viewport.width {
                let c = viewport.pixel_to_complex(px, py);
                assert_eq!(
                    variant.iterate(c, &params),
                    variant.iterate(c.conj(), &params),
                    "{variant} at {c}"
                );
            }
        }
    }
}
