use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use fractview_core::{Complex, FractalParams, FractalVariant, Viewport};
use fractview_render::{color_for, reproject, Engine, EngineConfig, Raster, RenderParameters};

fn bench_iteration_throughput(c: &mut Criterion) {
    let params = FractalParams::new(1000, 2.0).unwrap();
    let viewport = Viewport::new(Complex::new(-0.75, 0.1), 0.01, 0.01, 128, 128).unwrap();

    c.bench_function("iterate_128x128_1000iter", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for y in 0..viewport.height {
                for x in 0..viewport.width {
                    let c = viewport.pixel_to_complex(x, y);
                    total += u64::from(FractalVariant::Mandelbrot.iterate(c, &params));
                }
            }
            total
        });
    });
}

fn bench_engine_full_frame(c: &mut Criterion) {
    let config = EngineConfig {
        width: 320,
        height: 240,
        ..Default::default()
    };
    let mut engine = Engine::new(config).unwrap();

    c.bench_function("engine_full_frame_320x240", |b| {
        b.iter(|| {
            engine.on_restore_default_view().unwrap();
            engine.wait_idle(Duration::from_secs(60)).unwrap()
        });
    });
}

fn bench_reproject_pan(c: &mut Criterion) {
    let viewport = Viewport::default_for(640, 480).unwrap();
    let params = RenderParameters::default();
    let mut raster = Raster::allocate(viewport);
    for y in 0..480i64 {
        for x in 0..640i64 {
            let n = (x + y) as u32 % 100;
            raster.set(x, y, n, color_for(n, &params));
        }
    }
    let panned = viewport.panned(37.0, -12.0).unwrap();

    c.bench_function("reproject_pan_640x480", |b| {
        b.iter(|| reproject(&raster, panned));
    });
}

criterion_group!(
    benches,
    bench_iteration_throughput,
    bench_engine_full_frame,
    bench_reproject_pan
);
criterion_main!(benches);
