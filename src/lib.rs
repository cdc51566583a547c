//! iconpack: build a distributable icon package from a folder of SVG icons
//!
//! From one set of source icons the build produces:
//!
//! - `dist/svg`: a minified copy of every icon per configured color
//! - `dist/png`: every recolored icon rasterized at each configured width
//! - `dist/fonts`, `dist/css`, `dist/demo`: an icon font with its stylesheet
//!   and a demo page
//! - `<fontName>-<version>.zip`: the whole project, packaged
//!
//! # Example
//!
//! ```no_run
//! use iconpack::{BuildContext, PackageMeta, Pipeline, config};
//! use std::path::Path;
//!
//! let root = Path::new("my-icons");
//! let configuration = config::load(&root.join("config.toml"), &root.join("config.example.toml"))?;
//! let package = PackageMeta::load(&root.join("package.json"))?;
//!
//! let pipeline = Pipeline::new(BuildContext::new(configuration, package, root));
//! for report in pipeline.build()? {
//!     println!("{}: {} files", report.task, report.written.len());
//! }
//! # Ok::<(), iconpack::Error>(())
//! ```
//!
//! # Custom font engines
//!
//! The font stage delegates glyph generation to a [`FontEngine`]. The default
//! [`TrueTypeEngine`] writes a TrueType font. [`SvgFontEngine`] and custom
//! engines plug in through [`Pipeline::with_font_engine`].

pub mod asset;
pub mod config;
pub mod context;
pub mod error;
pub mod freshness;
pub mod naming;
pub mod scheduler;
pub mod stage;

pub use asset::Asset;
pub use config::{Configuration, PackageMeta};
pub use context::BuildContext;
pub use error::{ConfigError, Error, Result, Stage};
pub use scheduler::{Phase, Pipeline, Task, TaskGraph};
pub use stage::StageReport;
pub use stage::font::{FontEngine, Glyph, GlyphEmitter, GlyphSet};
pub use stage::svg_font::SvgFontEngine;
pub use stage::ttf_font::TrueTypeEngine;
