//! SVG font engine: packs icon outlines into an SVG font.
//!
//! Each icon becomes one glyph whose filled paths flatten into a single path
//! string in font units. Browsers have largely dropped SVG fonts, so this
//! engine is opt-in through [`Pipeline::with_font_engine`](crate::Pipeline::with_font_engine).

use std::path::PathBuf;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use resvg::tiny_skia::PathSegment;

use super::font::{FontEngine, GlyphEmitter, GlyphSet};
use super::outline::{self, IconOutline};
use crate::asset::Asset;
use crate::config::FontConfig;
use crate::error::{Error, Result, Stage};
use crate::naming;

/// Writes `<fontName>.svg` holding one glyph per icon.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgFontEngine;

impl FontEngine for SvgFontEngine {
    fn generate(
        &self,
        sources: &[Asset],
        font: &FontConfig,
        glyphs: GlyphEmitter,
    ) -> Result<Vec<Asset>> {
        let (glyph_set, outlines) = outline::assign(sources, font)?;
        let document = write_font(font, &glyph_set, &outlines)
            .map_err(|e| Error::engine(Stage::Font, PathBuf::from(&font.name), e))?;
        glyphs.emit(glyph_set);

        Ok(vec![Asset::generated(&format!("{}.svg", font.name), document)])
    }
}

// ============================================================================
// Path data
// ============================================================================

fn path_data(outline: &IconOutline) -> String {
    let mut out = String::new();
    for path in &outline.paths {
        append_segments(path, &mut out);
    }
    out
}

fn append_segments(data: &resvg::tiny_skia::Path, out: &mut String) {
    for segment in data.segments() {
        if !out.is_empty() {
            out.push(' ');
        }
        match segment {
            PathSegment::MoveTo(p) => push_command(out, 'M', &[p.x, p.y]),
            PathSegment::LineTo(p) => push_command(out, 'L', &[p.x, p.y]),
            PathSegment::QuadTo(c, p) => push_command(out, 'Q', &[c.x, c.y, p.x, p.y]),
            PathSegment::CubicTo(c1, c2, p) => {
                push_command(out, 'C', &[c1.x, c1.y, c2.x, c2.y, p.x, p.y])
            }
            PathSegment::Close => out.push('Z'),
        }
    }
}

fn push_command(out: &mut String, command: char, coords: &[f32]) {
    out.push(command);
    let numbers: Vec<String> = coords.iter().map(|&v| format_number(v)).collect();
    out.push_str(&numbers.join(" "));
}

/// Two decimals, trailing zeros trimmed, no negative zero.
fn format_number(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{rounded:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ============================================================================
// Font document
// ============================================================================

fn write_font(
    font: &FontConfig,
    glyphs: &GlyphSet,
    outlines: &[IconOutline],
) -> Result<Vec<u8>, String> {
    let em = font.units_per_em.to_string();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let w = &mut writer;

    emit(w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        w,
        Event::Start(BytesStart::new("svg").with_attributes([("xmlns", "http://www.w3.org/2000/svg")])),
    )?;
    emit(w, Event::Start(BytesStart::new("defs")))?;
    emit(
        w,
        Event::Start(
            BytesStart::new("font")
                .with_attributes([("id", font.name.as_str()), ("horiz-adv-x", em.as_str())]),
        ),
    )?;
    emit(
        w,
        Event::Empty(BytesStart::new("font-face").with_attributes([
            ("font-family", font.name.as_str()),
            ("units-per-em", em.as_str()),
            ("ascent", em.as_str()),
            ("descent", "0"),
        ])),
    )?;
    emit(
        w,
        Event::Empty(BytesStart::new("missing-glyph").with_attributes([("horiz-adv-x", "0")])),
    )?;

    for (glyph, outline) in glyphs.iter().zip(outlines) {
        let unicode = glyph.codepoint.to_string();
        let advance = format_number(outline.advance);
        let d = path_data(outline);
        emit(
            w,
            Event::Empty(BytesStart::new("glyph").with_attributes([
                ("glyph-name", naming::normalize(&glyph.name)),
                ("unicode", unicode.as_str()),
                ("horiz-adv-x", advance.as_str()),
                ("d", d.as_str()),
            ])),
        )?;
    }

    emit(w, Event::End(BytesEnd::new("font")))?;
    emit(w, Event::End(BytesEnd::new("defs")))?;
    emit(w, Event::End(BytesEnd::new("svg")))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0 H10 V10 H0 Z" fill="#000"/></svg>"##;
    const OUTLINE_ONLY: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0 H10" fill="none" stroke="#000"/></svg>"##;

    fn font() -> FontConfig {
        FontConfig {
            name: "icons".into(),
            classname: "icon".into(),
            units_per_em: 1000,
            start_codepoint: 0xEA01,
        }
    }

    fn asset(name: &str, svg: &str) -> Asset {
        Asset::generated(&format!("{name}.svg"), svg.as_bytes().to_vec())
    }

    #[test]
    fn formats_numbers_compactly() {
        assert_eq!(format_number(1000.0), "1000");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(0.333), "0.33");
        assert_eq!(format_number(-0.001), "0");
    }

    #[test]
    fn path_data_is_in_font_units() {
        let d = path_data(&outline::load(SQUARE.as_bytes(), 1000).unwrap());
        assert!(d.starts_with("M0 1000"), "{d}");
        assert!(d.contains("1000 0"));
        assert!(d.ends_with('Z'));
    }

    #[test]
    fn unfilled_paths_leave_empty_path_data() {
        let d = path_data(&outline::load(OUTLINE_ONLY.as_bytes(), 1000).unwrap());
        assert!(d.is_empty());
    }

    #[test]
    fn assigns_codepoints_in_name_order_and_emits_once() {
        let sources = vec![asset("002_heart", SQUARE), asset("001_star", SQUARE)];
        let (emitter, rx) = GlyphEmitter::channel();

        let fonts = SvgFontEngine.generate(&sources, &font(), emitter).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].file_name(), "icons.svg");

        let glyphs = rx.recv().unwrap();
        let names: Vec<_> = glyphs.iter().map(|g| (g.name.as_str(), g.codepoint)).collect();
        assert_eq!(names, [("001_star", '\u{EA01}'), ("002_heart", '\u{EA02}')]);

        let text = String::from_utf8(fonts[0].contents.clone()).unwrap();
        assert!(text.contains(r#"<font id="icons" horiz-adv-x="1000">"#));
        assert!(text.contains(r#"glyph-name="star""#));
        assert!(text.contains(r#"glyph-name="heart""#));
    }

    #[test]
    fn rejected_input_emits_nothing() {
        let sources = vec![asset("broken", "<svg")];
        let (emitter, rx) = GlyphEmitter::channel();

        let err = SvgFontEngine.generate(&sources, &font(), emitter).unwrap_err();
        assert!(matches!(err, Error::Engine { stage: Stage::Font, .. }));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn codepoint_overflow_is_an_error() {
        let mut font = font();
        font.start_codepoint = 0x10FFFF;
        let sources = vec![asset("a", SQUARE), asset("b", SQUARE)];
        let (emitter, _rx) = GlyphEmitter::channel();
        assert!(SvgFontEngine.generate(&sources, &font, emitter).is_err());
    }
}
