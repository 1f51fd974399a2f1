mod config;
mod replay;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fractview_core::FractalVariant;
use fractview_render::{export_png, Engine, ExportMetadata};

use config::RenderConfig;
use replay::replay;

#[derive(Debug, Parser)]
#[command(name = "fractview")]
#[command(about = "Render an escape-time fractal headlessly and export it as PNG")]
struct Args {
    /// JSON render config (surface, parameters, view, gesture script)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PNG path
    #[arg(short, long, default_value = "fractview.png")]
    output: PathBuf,

    /// Fractal variant: mandelbrot, tricorn, burning_ship, multibrot3, multibrot4
    #[arg(long, value_parser = parse_variant)]
    variant: Option<FractalVariant>,

    /// Override the iteration limit
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Give up if the engine has not settled after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

fn parse_variant(name: &str) -> std::result::Result<FractalVariant, String> {
    serde_json::from_value(serde_json::Value::String(name.to_string())).map_err(|_| {
        let known: Vec<String> = FractalVariant::ALL
            .iter()
            .filter_map(|v| serde_json::to_value(v).ok())
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        format!("unknown variant '{name}' (expected one of: {})", known.join(", "))
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("Starting fractview");

    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };
    if let Some(variant) = args.variant {
        config.params.variant = variant;
    }
    if let Some(max_iterations) = args.max_iterations {
        config.params.max_iterations = max_iterations;
    }

    let started = Instant::now();
    let mut engine = Engine::new(config.engine_config()).context("failed to create engine")?;
    if let Some(view) = config.view {
        engine
            .set_view(view.center(), view.range_re)
            .context("invalid starting view")?;
    }

    let summary = replay(&mut engine, &config.script, Duration::from_secs(args.timeout_secs))?;
    info!(
        completed = summary.completed,
        cancelled = summary.cancelled,
        restored = summary.restored,
        rejected = summary.rejected_gestures,
        elapsed_ms = started.elapsed().as_millis(),
        "Replay finished"
    );

    let snapshot = engine.snapshot();
    let metadata = ExportMetadata::describe(&snapshot, &engine.params());
    export_png(&snapshot, &args.output, &metadata)
        .with_context(|| format!("failed to export {}", args.output.display()))?;
    info!(
        "Wrote {}x{} image to {}",
        snapshot.width(),
        snapshot.height(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_names_parse() {
        assert_eq!(parse_variant("burning_ship"), Ok(FractalVariant::BurningShip));
        assert_eq!(parse_variant("multibrot4"), Ok(FractalVariant::Multibrot4));
        let err = parse_variant("julia").unwrap_err();
        assert!(err.contains("tricorn"));
    }

    #[test]
    fn args_parse_overrides() {
        let args = Args::try_parse_from([
            "fractview",
            "--output",
            "out.png",
            "--variant",
            "tricorn",
            "--max-iterations",
            "250",
        ])
        .unwrap();
        assert_eq!(args.variant, Some(FractalVariant::Tricorn));
        assert_eq!(args.max_iterations, Some(250));
        assert_eq!(args.timeout_secs, 300);
        assert!(args.config.is_none());
    }
}
