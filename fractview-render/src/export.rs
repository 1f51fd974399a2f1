//! PNG export with embedded metadata (tEXt chunks).

use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use crate::params::RenderParameters;
use crate::raster::RasterSnapshot;
use crate::Result;

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub fractal_type: String,
    pub center_re: f64,
    pub center_im: f64,
    pub range_re: f64,
    pub range_im: f64,
    pub max_iterations: u32,
    pub escape_radius: f64,
    pub color_enabled: bool,
    pub gradient: String,
}

impl ExportMetadata {
    /// Describe `snapshot` as rendered with `params`.
    pub fn describe(snapshot: &RasterSnapshot, params: &RenderParameters) -> Self {
        let center = snapshot.viewport.center();
        Self {
            fractal_type: params.variant.label().to_string(),
            center_re: center.re,
            center_im: center.im,
            range_re: snapshot.viewport.range_re,
            range_im: snapshot.viewport.range_im,
            max_iterations: params.max_iterations,
            escape_radius: params.escape_radius,
            color_enabled: params.color_enabled,
            gradient: format!("{:?}", params.gradient),
        }
    }
}

/// Write `snapshot` as an 8-bit RGBA PNG with embedded view metadata.
///
/// Uncomputed pixels are written as opaque black.
pub fn export_png(snapshot: &RasterSnapshot, path: &Path, metadata: &ExportMetadata) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);

    let (width, height) = (snapshot.width(), snapshot.height());
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), "fractview".to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata, width, height) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(&snapshot.to_rgba_bytes())?;
    png_writer.finish()?;

    debug!("Exported PNG {}x{} to {}", width, height, path.display());
    Ok(())
}

fn build_description(meta: &ExportMetadata) -> String {
    format!(
        "{} - Center: {} {:+}i, Range: {}×{}, Iterations: {}",
        meta.fractal_type,
        meta.center_re,
        meta.center_im,
        meta.range_re,
        meta.range_im,
        meta.max_iterations,
    )
}

fn build_metadata_pairs(meta: &ExportMetadata, width: u32, height: u32) -> Vec<(String, String)> {
    vec![
        ("Fractview.FractalType".into(), meta.fractal_type.clone()),
        ("Fractview.CenterRe".into(), format!("{:e}", meta.center_re)),
        ("Fractview.CenterIm".into(), format!("{:e}", meta.center_im)),
        ("Fractview.RangeRe".into(), format!("{:e}", meta.range_re)),
        ("Fractview.RangeIm".into(), format!("{:e}", meta.range_im)),
        ("Fractview.MaxIterations".into(), meta.max_iterations.to_string()),
        ("Fractview.EscapeRadius".into(), meta.escape_radius.to_string()),
        ("Fractview.Color".into(), meta.color_enabled.to_string()),
        ("Fractview.Gradient".into(), meta.gradient.clone()),
        ("Fractview.Resolution".into(), format!("{width}x{height}")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractview_core::Viewport;

    use crate::palette::IN_SET_COLOR;
    use crate::raster::Raster;

    #[test]
    fn metadata_pairs_cover_view() {
        let raster = Raster::allocate(Viewport::default_for(4, 4).unwrap());
        let meta = ExportMetadata::describe(&raster.snapshot(1, 0), &RenderParameters::default());
        let pairs = build_metadata_pairs(&meta, 4, 4);
        assert!(pairs.iter().any(|(k, v)| k == "Fractview.FractalType" && v == "Mandelbrot set"));
        assert!(pairs.iter().any(|(k, v)| k == "Fractview.Resolution" && v == "4x4"));
        assert!(build_description(&meta).starts_with("Mandelbrot set - Center: "));
    }

    #[test]
    fn writes_decodable_png_with_text() {
        let mut raster = Raster::allocate(Viewport::default_for(3, 2).unwrap());
        raster.set(1, 1, 100, IN_SET_COLOR);
        let snapshot = raster.snapshot(1, 1);
        let meta = ExportMetadata::describe(&snapshot, &RenderParameters::default());

        let name = format!("fractview-export-{}.png", std::process::id());
        let path = std::env::temp_dir().join(name);
        export_png(&snapshot, &path, &meta).unwrap();

        let decoder = png::Decoder::new(std::fs::File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (3, 2));
        assert!(info
            .uncompressed_latin1_text
            .iter()
            .any(|t| t.keyword == "Fractview.MaxIterations" && t.text == "100"));
        let mut buf = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buf).unwrap();
        assert_eq!(frame.buffer_size(), 3 * 2 * 4);
        // Uncomputed pixels become opaque black.
        assert_eq!(&buf[0..4], &[0, 0, 0, 255]);
        std::fs::remove_file(&path).ok();
    }
}
