//! End-to-end builds against throwaway project directories.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use iconpack::{
    Asset, BuildContext, Configuration, Error, FontEngine, GlyphEmitter, PackageMeta, Pipeline,
    Stage, SvgFontEngine, config, config::FontConfig,
};
use tempfile::TempDir;

const CONFIG: &str = r##"
[colors]
red = "#ff0000"

[sizes]
small = 16

[font]
name = "icons"
classname = "icon"
"##;

const STAR: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
  <!-- exported by an editor -->
  <title>star</title>
  <path d="M12 2 L22 22 L2 22 Z" fill="#000000"/>
</svg>
"##;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
    fs::write(dir.path().join("package.json"), r#"{ "name": "icons", "version": "1.0.0" }"#)
        .unwrap();
    fs::create_dir_all(dir.path().join("source")).unwrap();
    fs::write(dir.path().join("source/001_star.svg"), STAR).unwrap();
    dir
}

fn context(root: &Path) -> BuildContext {
    let configuration = config::load(
        &root.join("config.toml"),
        &root.join("config.example.toml"),
    )
    .unwrap();
    let package = PackageMeta::load(&root.join("package.json")).unwrap();
    BuildContext::new(configuration, package, root)
}

/// Every file under `dir`, keyed by its path relative to `dir`.
fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(dir).unwrap().to_path_buf();
                files.insert(relative, fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn archive_entries(path: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(String::from).collect();
    names.sort();
    names
}

fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

// ============================================================================
// Full build
// ============================================================================

#[test]
fn builds_every_artifact() {
    let dir = project();
    let root = dir.path();
    let reports = Pipeline::new(context(root)).build().unwrap();

    let tasks: Vec<_> = reports.iter().map(|r| r.task.as_str()).collect();
    assert_eq!(tasks, ["recolor-red", "font", "rasterize-small", "archive"]);

    let svg = fs::read_to_string(root.join("dist/svg/star-red.svg")).unwrap();
    assert!(svg.contains(r##"fill="#ff0000""##), "{svg}");
    assert!(!svg.contains("#000000"));
    assert!(!svg.contains("<title>"));

    let png = root.join("dist/png/star-red--small.png");
    assert_eq!(image::image_dimensions(&png).unwrap(), (16, 16));

    let font = fs::read(root.join("dist/fonts/icons.ttf")).unwrap();
    let face = ttf_parser::Face::parse(&font, 0).unwrap();
    // .notdef plus one glyph per icon
    assert_eq!(face.number_of_glyphs(), 2);
    assert_eq!(face.glyph_index('\u{EA01}'), Some(ttf_parser::GlyphId(1)));

    let css = fs::read_to_string(root.join("dist/css/icons.css")).unwrap();
    assert!(css.contains(".icon-star::before"));
    assert!(css.contains("content: \"\\ea01\";"));
    assert!(root.join("dist/demo/css/demo.css").is_file());
    let demo = fs::read_to_string(root.join("dist/demo/index.html")).unwrap();
    assert!(demo.contains("icons 1.0.0"));

    let entries = archive_entries(&root.join("icons-1.0.0.zip"));
    for expected in [
        "config.toml",
        "dist/css/icons.css",
        "dist/demo/css/demo.css",
        "dist/demo/index.html",
        "dist/fonts/icons.ttf",
        "dist/png/star-red--small.png",
        "dist/svg/star-red.svg",
        "package.json",
        "source/001_star.svg",
    ] {
        assert!(entries.iter().any(|e| e == expected), "missing {expected} in {entries:?}");
    }
    assert!(!entries.iter().any(|e| e.ends_with(".zip")));
}

#[test]
fn sub_directories_are_mirrored() {
    let dir = project();
    let root = dir.path();
    fs::create_dir_all(root.join("source/arrows")).unwrap();
    fs::write(root.join("source/arrows/002_up.svg"), STAR).unwrap();

    Pipeline::new(context(root)).build().unwrap();

    assert!(root.join("dist/svg/arrows/up-red.svg").is_file());
    assert!(root.join("dist/png/arrows/up-red--small.png").is_file());
    // Only top-level icons go into the font.
    let font = fs::read(root.join("dist/fonts/icons.ttf")).unwrap();
    let face = ttf_parser::Face::parse(&font, 0).unwrap();
    assert_eq!(face.number_of_glyphs(), 2);
    assert_eq!(face.glyph_index('\u{EA02}'), None);
}

#[test]
fn rebuilding_is_deterministic() {
    let dir = project();
    let root = dir.path();

    Pipeline::new(context(root)).build().unwrap();
    let first = snapshot(&root.join("dist"));
    let first_entries = archive_entries(&root.join("icons-1.0.0.zip"));

    Pipeline::new(context(root).with_incremental(false))
        .build()
        .unwrap();
    assert_eq!(snapshot(&root.join("dist")), first);
    assert_eq!(archive_entries(&root.join("icons-1.0.0.zip")), first_entries);
}

#[test]
fn archive_output_root_is_configurable() {
    let dir = project();
    let root = dir.path();
    fs::write(
        root.join("config.toml"),
        format!("{CONFIG}\n[paths]\narchive = \"release\"\n"),
    )
    .unwrap();

    let pipeline = Pipeline::new(context(root));
    pipeline.run_task("recolor-red").unwrap();
    let report = pipeline.run_task("archive").unwrap();

    assert_eq!(report.written, [root.join("release/icons-1.0.0.zip")]);
    let entries = archive_entries(&root.join("release/icons-1.0.0.zip"));
    assert!(entries.iter().any(|e| e == "dist/svg/star-red.svg"));
    assert!(!entries.iter().any(|e| e.starts_with("release/")));
}

// ============================================================================
// Incremental rasterize
// ============================================================================

#[test]
fn rasterize_skips_fresh_outputs_and_rebuilds_stale_ones() {
    let dir = project();
    let root = dir.path();
    let pipeline = Pipeline::new(context(root));
    pipeline.run_task("recolor-red").unwrap();
    pipeline.run_task("rasterize-small").unwrap();

    let svg = root.join("dist/svg/star-red.svg");
    let png = root.join("dist/png/star-red--small.png");
    let base = SystemTime::now() - Duration::from_secs(3600);
    set_mtime(&svg, base);
    set_mtime(&png, base + Duration::from_secs(60));

    let report = pipeline.run_task("rasterize-small").unwrap();
    assert_eq!(report.skipped, 1);
    assert!(report.written.is_empty());

    set_mtime(&svg, base + Duration::from_secs(120));
    let report = pipeline.run_task("rasterize-small").unwrap();
    assert_eq!(report.skipped, 0);
    assert_eq!(report.written, [png.clone()]);

    fs::remove_file(&png).unwrap();
    pipeline.run_task("rasterize-small").unwrap();
    assert!(png.is_file());
}

#[test]
fn unchanged_rebuild_skips_rasterizing() {
    let dir = project();
    let root = dir.path();
    Pipeline::new(context(root)).build().unwrap();

    let svg = root.join("dist/svg/star-red.svg");
    let png = root.join("dist/png/star-red--small.png");
    let base = SystemTime::now() - Duration::from_secs(3600);
    set_mtime(&svg, base);
    set_mtime(&png, base + Duration::from_secs(60));

    let reports = Pipeline::new(context(root)).build().unwrap();
    let report = |task: &str| reports.iter().find(|r| r.task == task).unwrap();

    assert_eq!(report("recolor-red").skipped, 1);
    assert!(report("recolor-red").written.is_empty());
    assert_eq!(report("rasterize-small").skipped, 1);
    assert!(report("rasterize-small").written.is_empty());
    assert_eq!(fs::metadata(&svg).unwrap().modified().unwrap(), base);
}

#[test]
fn forced_build_ignores_freshness() {
    let dir = project();
    let root = dir.path();
    Pipeline::new(context(root)).build().unwrap();

    let png = root.join("dist/png/star-red--small.png");
    set_mtime(&png, SystemTime::now() + Duration::from_secs(3600));

    let pipeline = Pipeline::new(context(root).with_incremental(false));
    let report = pipeline.run_task("rasterize-small").unwrap();
    assert_eq!(report.written, [png]);
}

#[test]
fn svg_font_engine_is_opt_in() {
    let dir = project();
    let root = dir.path();
    Pipeline::new(context(root))
        .with_font_engine(SvgFontEngine)
        .build()
        .unwrap();

    let font = fs::read_to_string(root.join("dist/fonts/icons.svg")).unwrap();
    assert!(font.contains(r#"glyph-name="star""#));
    assert!(!root.join("dist/fonts/icons.ttf").exists());
}

// ============================================================================
// Failures
// ============================================================================

/// Writes nothing and never reports its glyphs.
struct SilentEngine;

impl FontEngine for SilentEngine {
    fn generate(&self, _: &[Asset], _: &FontConfig, glyphs: GlyphEmitter) -> iconpack::Result<Vec<Asset>> {
        drop(glyphs);
        Ok(Vec::new())
    }
}

/// Rejects every input.
struct RejectingEngine;

impl FontEngine for RejectingEngine {
    fn generate(&self, sources: &[Asset], _: &FontConfig, _: GlyphEmitter) -> iconpack::Result<Vec<Asset>> {
        Err(Error::Engine {
            stage: Stage::Font,
            path: sources[0].origin.clone(),
            message: "unsupported shape".to_string(),
        })
    }
}

#[test]
fn missing_glyph_event_stops_the_build_before_rasterizing() {
    let dir = project();
    let root = dir.path();

    let err = Pipeline::new(context(root))
        .with_font_engine(SilentEngine)
        .build()
        .unwrap_err();

    assert!(matches!(err, Error::MissingGlyphs));
    assert_eq!(err.stage(), Some(Stage::Font));
    assert!(!root.join("dist/png").exists());
    assert!(!root.join("icons-1.0.0.zip").exists());
}

#[test]
fn engine_errors_name_the_rejected_asset() {
    let dir = project();
    let root = dir.path();

    let err = Pipeline::new(context(root))
        .with_font_engine(RejectingEngine)
        .build()
        .unwrap_err();

    match err {
        Error::Engine { stage, path, .. } => {
            assert_eq!(stage, Stage::Font);
            assert!(path.ends_with("source/001_star.svg"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!root.join("dist/png").exists());
}

#[test]
fn malformed_icon_fails_the_build() {
    let dir = project();
    let root = dir.path();
    fs::write(root.join("source/002_broken.svg"), "<svg").unwrap();

    let err = Pipeline::new(context(root)).build().unwrap_err();
    assert!(matches!(err.stage(), Some(Stage::Recolor | Stage::Font)));
    assert!(!root.join("icons-1.0.0.zip").exists());
}

#[test]
fn unknown_task_is_an_error() {
    let dir = project();
    let err = Pipeline::new(context(dir.path())).run_task("rasterize-huge").unwrap_err();
    assert!(matches!(err, Error::UnknownTask(name) if name == "rasterize-huge"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn falls_back_to_the_example_configuration() {
    let dir = project();
    let root = dir.path();
    fs::rename(root.join("config.toml"), root.join("config.example.toml")).unwrap();

    let ctx = context(root);
    assert_eq!(ctx.config().font.name, "icons");
}

#[test]
fn bundled_example_configuration_is_valid() {
    let text = include_str!("../config.example.toml");
    let configuration = Configuration::from_toml(text, Path::new("config.example.toml")).unwrap();
    assert_eq!(configuration.sizes["small"], 16);
    assert!(configuration.colors.contains_key("primary"));
}
