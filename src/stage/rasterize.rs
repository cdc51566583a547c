//! Rasterize stage: recolored SVGs to PNG at a fixed width using resvg.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, info};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

use super::StageReport;
use crate::asset::{self, Asset};
use crate::context::BuildContext;
use crate::error::{Error, Result, Stage};
use crate::freshness;
use crate::naming;

// ============================================================================
// SVG Rendering
// ============================================================================

/// Renders SVG data to an RGBA image exactly `width` pixels wide.
///
/// The height follows the document's aspect ratio, rounded to the nearest
/// pixel and never less than one.
pub fn render_svg(svg_data: &[u8], width: u32) -> Result<RgbaImage, String> {
    let opts = Options::default();
    let tree = Tree::from_data(svg_data, &opts).map_err(|e| e.to_string())?;

    let svg_size = tree.size();
    let scale = width as f32 / svg_size.width();
    let height = ((svg_size.height() * scale).round() as u32).max(1);

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| format!("cannot allocate a {width}x{height} canvas"))?;
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());

    for (pixel, out) in pixmap.pixels().iter().zip(img.pixels_mut()) {
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        *out = Rgba([r, g, b, a]);
    }

    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(buf.into_inner())
}

// ============================================================================
// Stage
// ============================================================================

/// Rasterizes one recolored asset.
pub fn rasterize_asset(source: &Asset, width: u32, size_key: &str) -> Result<Asset> {
    let img = render_svg(&source.contents, width)
        .map_err(|e| Error::engine(Stage::Rasterize, &source.origin, e))?;
    let png = encode_png(&img).map_err(|e| Error::engine(Stage::Rasterize, &source.origin, e))?;
    Ok(source.derive(naming::rasterized_name(&source.stem, size_key), "png", png))
}

/// Output path for a recolored SVG found at `input`.
fn expected_output(svg_root: &Path, png_root: &Path, input: &Path, size_key: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let relative = input
        .parent()
        .and_then(|p| p.strip_prefix(svg_root).ok())
        .unwrap_or(Path::new(""));
    png_root
        .join(relative)
        .join(format!("{}.png", naming::rasterized_name(&stem, size_key)))
}

/// Rasterizes every recolored SVG at one configured width.
///
/// Outputs already newer than their input are skipped when the context is
/// incremental.
pub fn run(ctx: &BuildContext, size_key: &str, width: u32) -> Result<StageReport> {
    let start = Instant::now();
    let mut report = StageReport::new(format!("rasterize-{size_key}"));

    let svg_dir = ctx.svg_dir();
    let png_dir = ctx.png_dir();

    for input in asset::discover(Stage::Rasterize, &svg_dir, "**/*.svg")? {
        let output = expected_output(&svg_dir, &png_dir, &input, size_key);
        if ctx.is_incremental() && freshness::is_newer_than(&output, &input) {
            debug!("[rasterize] {} is up to date", output.display());
            report.skipped += 1;
            continue;
        }

        let source = Asset::read(Stage::Rasterize, &svg_dir, &input)?;
        let png = rasterize_asset(&source, width, size_key)?;
        report.written.push(png.write_to(Stage::Rasterize, &png_dir)?);
    }

    report.duration = start.elapsed();
    info!(
        "[rasterize] {size_key} ({width}px): {} written, {} up to date in {:?}",
        report.written.len(),
        report.skipped,
        report.duration
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
