//! Stylesheet and demo page rendering for the icon font.
//!
//! Each template is looked up in the project's templates directory first and
//! falls back to the copy bundled with the crate.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use handlebars::Handlebars;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use super::font::GlyphView;
use crate::context::BuildContext;
use crate::error::{Error, Result, Stage};

/// Values every template can refer to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    pub glyphs: Vec<GlyphView>,
    pub font_name: String,
    pub class_name: String,
    pub version: String,
    /// Font directory as seen from the stylesheet.
    pub font_path: String,
}

/// One template and where its output goes.
#[derive(Debug, Clone)]
pub struct TemplateTarget {
    pub file_name: &'static str,
    pub bundled: &'static str,
    pub output: PathBuf,
    /// HTML-escape interpolated values.
    pub escape_html: bool,
}

const STYLESHEET: &str = include_str!("../../templates/iconfont-stylesheet.css");
const DEMO_STYLESHEET: &str = include_str!("../../templates/iconfont-demo.css");
const DEMO_PAGE: &str = include_str!("../../templates/iconfont-demo.html");

/// The stylesheet, demo stylesheet and demo page for this build.
pub fn targets(ctx: &BuildContext) -> Vec<TemplateTarget> {
    let font_name = &ctx.config().font.name;
    vec![
        TemplateTarget {
            file_name: "iconfont-stylesheet.css",
            bundled: STYLESHEET,
            output: ctx.css_dir().join(format!("{font_name}.css")),
            escape_html: false,
        },
        TemplateTarget {
            file_name: "iconfont-demo.css",
            bundled: DEMO_STYLESHEET,
            output: ctx.demo_dir().join("css").join("demo.css"),
            escape_html: false,
        },
        TemplateTarget {
            file_name: "iconfont-demo.html",
            bundled: DEMO_PAGE,
            output: ctx.demo_dir().join("index.html"),
            escape_html: true,
        },
    ]
}

/// Template source: the project's override if present, else the bundled copy.
fn load_source(ctx: &BuildContext, target: &TemplateTarget) -> Result<String> {
    let path = ctx.templates_dir().join(target.file_name);
    match fs::read_to_string(&path) {
        Ok(text) => {
            debug!("[font] using template {}", path.display());
            Ok(text)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(target.bundled.to_string()),
        Err(e) => Err(Error::io(Stage::Font, path, e)),
    }
}

/// Renders a template string against `data`.
pub fn render(name: &str, source: &str, data: &TemplateData, escape_html: bool) -> Result<String> {
    let mut registry = Handlebars::new();
    if !escape_html {
        registry.register_escape_fn(handlebars::no_escape);
    }
    registry
        .render_template(source, data)
        .map_err(|e| Error::Template {
            template: name.to_string(),
            source: Box::new(e),
        })
}

fn render_one(ctx: &BuildContext, target: &TemplateTarget, data: &TemplateData) -> Result<PathBuf> {
    let source = load_source(ctx, target)?;
    let text = render(target.file_name, &source, data, target.escape_html)?;

    if let Some(parent) = target.output.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(Stage::Font, parent, e))?;
    }
    fs::write(&target.output, text).map_err(|e| Error::io(Stage::Font, &target.output, e))?;
    debug!("[font] wrote {}", target.output.display());
    Ok(target.output.clone())
}

/// Renders all three templates in parallel.
pub fn render_all(ctx: &BuildContext, data: &TemplateData) -> Result<Vec<PathBuf>> {
    targets(ctx)
        .par_iter()
        .map(|target| render_one(ctx, target, data))
        .collect()
}
