//! Font stage: build an icon font from the original icons and render the
//! stylesheet and demo page that document it.
//!
//! The stage has two halves that run concurrently and must both finish:
//!
//! - **font-write**: the [`FontEngine`] turns the icons into font files which
//!   are written to `dist/fonts`.
//! - **template-render**: waits for the engine's glyph metadata, then renders
//!   the three templates in parallel.
//!
//! The engine reports its glyph assignments through a [`GlyphEmitter`]. The
//! emitter is consumed by [`GlyphEmitter::emit`], so the metadata can be sent
//! at most once; an engine that finishes without emitting fails the stage with
//! [`Error::MissingGlyphs`].

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use super::StageReport;
use super::template::{self, TemplateData};
use crate::asset::{self, Asset};
use crate::config::FontConfig;
use crate::context::BuildContext;
use crate::error::{Error, Result, Stage};
use crate::naming;

// ============================================================================
// Glyph metadata
// ============================================================================

/// One glyph assigned by the font engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// Source basename, prefix included (`001_star`).
    pub name: String,
    pub codepoint: char,
    /// The icon the glyph was built from.
    pub source: PathBuf,
}

impl Glyph {
    /// Lower-case hex code point without prefix, e.g. `ea01`.
    pub fn codepoint_hex(&self) -> String {
        format!("{:x}", self.codepoint as u32)
    }
}

/// Every glyph in the generated font, in code point order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphSet {
    glyphs: Vec<Glyph>,
}

impl GlyphSet {
    pub fn new(glyphs: Vec<Glyph>) -> Self {
        Self { glyphs }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Glyph> {
        self.glyphs.iter()
    }

    /// Template view of the glyphs with display names normalized.
    pub fn views(&self) -> Vec<GlyphView> {
        self.glyphs
            .iter()
            .map(|g| GlyphView {
                name: naming::normalize(&g.name).to_string(),
                codepoint: g.codepoint_hex(),
                css: format!("\\{}", g.codepoint_hex()),
                source: g.source.to_string_lossy().into_owned(),
            })
            .collect()
    }
}

/// A glyph as templates see it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GlyphView {
    pub name: String,
    pub codepoint: String,
    /// CSS escape for `content:` rules, e.g. `\ea01`.
    pub css: String,
    pub source: String,
}

// ============================================================================
// Engine seam
// ============================================================================

/// One-shot channel end handed to a [`FontEngine`].
pub struct GlyphEmitter {
    tx: SyncSender<GlyphSet>,
}

impl GlyphEmitter {
    /// Creates an emitter and the receiver its event arrives on.
    pub fn channel() -> (Self, Receiver<GlyphSet>) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Self { tx }, rx)
    }

    /// Publishes the glyph metadata. Consumes the emitter.
    pub fn emit(self, glyphs: GlyphSet) {
        // The receiver only goes away when the render side already failed.
        if self.tx.send(glyphs).is_err() {
            debug!("[font] glyph metadata dropped, renderer is gone");
        }
    }
}

/// Turns a set of icons into font files.
pub trait FontEngine: Send + Sync {
    /// Generates the font files for `sources`.
    ///
    /// Implementations must call [`GlyphEmitter::emit`] once the glyph
    /// assignment is known. Rejecting an input is reported as an error.
    fn generate(&self, sources: &[Asset], font: &FontConfig, glyphs: GlyphEmitter)
    -> Result<Vec<Asset>>;
}

// ============================================================================
// Stage
// ============================================================================

/// Runs the font stage with the given engine.
pub fn run(ctx: &BuildContext, engine: &dyn FontEngine) -> Result<StageReport> {
    let start = Instant::now();
    let mut report = StageReport::new("font".to_string());

    let sources = asset::read_all(Stage::Font, &ctx.source_dir(), &ctx.config().sources.glyphs)?;
    let (emitter, glyph_events) = GlyphEmitter::channel();

    let (fonts, rendered) = rayon::join(
        || write_fonts(ctx, engine, &sources, emitter),
        || render_templates(ctx, glyph_events),
    );

    // Engine failures explain a missing glyph event, so report them first.
    report.written.extend(fonts?);
    report.written.extend(rendered?);

    report.duration = start.elapsed();
    info!(
        "[font] {}: {} glyphs, {} files in {:?}",
        ctx.config().font.name,
        sources.len(),
        report.written.len(),
        report.duration
    );
    Ok(report)
}

fn write_fonts(
    ctx: &BuildContext,
    engine: &dyn FontEngine,
    sources: &[Asset],
    emitter: GlyphEmitter,
) -> Result<Vec<PathBuf>> {
    let fonts = engine.generate(sources, &ctx.config().font, emitter)?;
    let out_dir = ctx.fonts_dir();
    fonts
        .iter()
        .map(|font| font.write_to(Stage::Font, &out_dir))
        .collect()
}

fn render_templates(ctx: &BuildContext, glyph_events: Receiver<GlyphSet>) -> Result<Vec<PathBuf>> {
    let glyphs = glyph_events.recv().map_err(|_| Error::MissingGlyphs)?;
    debug!("[font] received metadata for {} glyphs", glyphs.len());

    let font = &ctx.config().font;
    let data = TemplateData {
        glyphs: glyphs.views(),
        font_name: font.name.clone(),
        class_name: font.classname.clone(),
        version: ctx.version().to_string(),
        font_path: "../fonts/".to_string(),
    };
    template::render_all(ctx, &data)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(name: &str, cp: u32) -> Glyph {
        Glyph {
            name: name.to_string(),
            codepoint: char::from_u32(cp).unwrap(),
            source: PathBuf::from(format!("source/{name}.svg")),
        }
    }

    #[test]
    fn views_normalize_names_and_format_codepoints() {
        let set = GlyphSet::new(vec![glyph("001_star", 0xEA01), glyph("heart", 0xEA02)]);
        let views = set.views();
        assert_eq!(views[0].name, "star");
        assert_eq!(views[0].codepoint, "ea01");
        assert_eq!(views[0].css, "\\ea01");
        assert_eq!(views[1].name, "heart");
        assert_eq!(views[1].source, "source/heart.svg");
    }

    #[test]
    fn emitter_delivers_once() {
        let (emitter, rx) = GlyphEmitter::channel();
        emitter.emit(GlyphSet::new(vec![glyph("a", 0xEA01)]));
        assert_eq!(rx.recv().unwrap().len(), 1);
        // The sender is gone after the single emit.
        assert!(rx.recv().is_err());
    }

    #[test]
    fn dropped_emitter_is_detected() {
        let (emitter, rx) = GlyphEmitter::channel();
        drop(emitter);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn emit_without_receiver_does_not_panic() {
        let (emitter, rx) = GlyphEmitter::channel();
        drop(rx);
        emitter.emit(GlyphSet::default());
    }
}
