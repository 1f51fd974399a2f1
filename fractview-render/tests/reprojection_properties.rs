use proptest::prelude::*;

use fractview_core::Viewport;
use fractview_render::{reproject, Raster, UNCOMPUTED};

fn filled(viewport: Viewport) -> Raster {
    let mut raster = Raster::allocate(viewport);
    for y in 0..viewport.height as i64 {
        for x in 0..viewport.width as i64 {
            raster.set(x, y, (y * 1000 + x) as u32, [x as u8, y as u8, 1, 255]);
        }
    }
    raster
}

proptest! {
    #[test]
    fn pan_keeps_overlap_and_queues_the_rest(
        width in 2u32..40,
        height in 2u32..40,
        dx in -50i32..50,
        dy in -50i32..50,
    ) {
        let viewport = Viewport::default_for(width, height).unwrap();
        let old = filled(viewport);
        let panned = viewport.panned(f64::from(dx), f64::from(dy)).unwrap();
        let result = reproject(&old, panned);

        let keep_w = (width as i64 - i64::from(dx).abs()).max(0);
        let keep_h = (height as i64 - i64::from(dy).abs()).max(0);
        let total = (width * height) as usize;
        prop_assert_eq!(result.raster.computed_count(), (keep_w * keep_h) as usize);
        prop_assert_eq!(result.wanted.len(), total - (keep_w * keep_h) as usize);

        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let (ox, oy) = (x - i64::from(dx), y - i64::from(dy));
                let expected = old.get(ox, oy).unwrap_or(UNCOMPUTED);
                prop_assert_eq!(result.raster.get(x, y), Some(expected));
            }
        }
        // Every queued point lies in the new view and outside the old one.
        for c in &result.wanted {
            prop_assert!(panned.contains(*c));
            prop_assert!(!viewport.contains(*c));
        }
    }

    #[test]
    fn zoom_reuses_only_covered_pixels(
        factor in 0.25f64..4.0,
        cx in 0.0f64..32.0,
        cy in 0.0f64..32.0,
    ) {
        let viewport = Viewport::default_for(32, 32).unwrap();
        let old = filled(viewport);
        let zoomed = viewport.zoomed_about(factor, cx, cy).unwrap();
        let result = reproject(&old, zoomed);

        prop_assert_eq!(
            result.raster.computed_count() + result.wanted.len(),
            zoomed.pixel_count()
        );
        for y in 0..32u32 {
            for x in 0..32u32 {
                let c = zoomed.pixel_to_complex(x, y);
                let reused = result.raster.iterations_at(x as i64, y as i64).is_some();
                prop_assert_eq!(reused, viewport.contains(c));
            }
        }
    }
}
