//! Default font engine: packs icon outlines into a TrueType font.
//!
//! The font holds an empty `.notdef` followed by one simple glyph per icon,
//! in code point order. Cubic curves are split into quadratic pieces since
//! `glyf` outlines only carry quadratic control points. Tables are encoded
//! here and assembled into an sfnt by `write-fonts`.

use std::path::PathBuf;

use resvg::tiny_skia::PathSegment;
use write_fonts::FontBuilder;
use write_fonts::types::Tag;

use super::font::{FontEngine, GlyphEmitter, GlyphSet};
use super::outline::{self, IconOutline};
use crate::asset::Asset;
use crate::config::FontConfig;
use crate::error::{Error, Result, Stage};

/// Writes `<fontName>.ttf` holding one glyph per icon.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrueTypeEngine;

impl FontEngine for TrueTypeEngine {
    fn generate(
        &self,
        sources: &[Asset],
        font: &FontConfig,
        glyphs: GlyphEmitter,
    ) -> Result<Vec<Asset>> {
        let (glyph_set, outlines) = outline::assign(sources, font)?;
        let bytes = build_font(font, &glyph_set, &outlines)
            .map_err(|e| Error::engine(Stage::Font, PathBuf::from(&font.name), e))?;
        glyphs.emit(glyph_set);

        Ok(vec![Asset::generated(&format!("{}.ttf", font.name), bytes)])
    }
}

// ============================================================================
// Glyph outlines
// ============================================================================

/// Pieces each cubic is split into.
const CUBIC_STEPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FontPoint {
    x: i16,
    y: i16,
    on_curve: bool,
}

impl FontPoint {
    fn on((x, y): (f32, f32)) -> Self {
        Self { x: units(x), y: units(y), on_curve: true }
    }

    fn off((x, y): (f32, f32)) -> Self {
        Self { x: units(x), y: units(y), on_curve: false }
    }
}

fn units(value: f32) -> i16 {
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn clamp_i16(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bounds {
    x_min: i16,
    y_min: i16,
    x_max: i16,
    y_max: i16,
}

impl Bounds {
    fn of<'a>(points: impl IntoIterator<Item = &'a FontPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            let point = Bounds { x_min: p.x, y_min: p.y, x_max: p.x, y_max: p.y };
            Some(match acc {
                Some(b) => b.union(point),
                None => point,
            })
        })
    }

    fn union(self, other: Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }
}

/// One glyph ready for `glyf` and `hmtx`.
#[derive(Debug, Clone, Default)]
struct FontGlyph {
    contours: Vec<Vec<FontPoint>>,
    advance: u16,
    bounds: Option<Bounds>,
}

impl FontGlyph {
    fn from_outline(outline: &IconOutline) -> Self {
        let contours = contours(outline);
        let bounds = Bounds::of(contours.iter().flatten());
        Self {
            contours,
            advance: outline.advance.round().clamp(0.0, u16::MAX as f32) as u16,
            bounds,
        }
    }

    fn point_count(&self) -> usize {
        self.contours.iter().map(Vec::len).sum()
    }

    fn left_side_bearing(&self) -> i16 {
        self.bounds.map_or(0, |b| b.x_min)
    }
}

fn contours(outline: &IconOutline) -> Vec<Vec<FontPoint>> {
    let mut contours = Vec::new();
    for path in &outline.paths {
        let mut current = Vec::new();
        let mut last = (0.0, 0.0);
        for segment in path.segments() {
            match segment {
                PathSegment::MoveTo(p) => {
                    close_contour(&mut current, &mut contours);
                    last = (p.x, p.y);
                    current.push(FontPoint::on(last));
                }
                PathSegment::LineTo(p) => {
                    last = (p.x, p.y);
                    current.push(FontPoint::on(last));
                }
                PathSegment::QuadTo(c, p) => {
                    last = (p.x, p.y);
                    current.push(FontPoint::off((c.x, c.y)));
                    current.push(FontPoint::on(last));
                }
                PathSegment::CubicTo(c1, c2, p) => {
                    let cubic = Cubic([last, (c1.x, c1.y), (c2.x, c2.y), (p.x, p.y)]);
                    for (control, end) in cubic.to_quads(CUBIC_STEPS) {
                        current.push(FontPoint::off(control));
                        current.push(FontPoint::on(end));
                    }
                    last = (p.x, p.y);
                }
                PathSegment::Close => close_contour(&mut current, &mut contours),
            }
        }
        close_contour(&mut current, &mut contours);
    }
    contours
}

/// Moves `current` into `contours` unless it encloses nothing. Contours close
/// implicitly, so a final point repeating the first is dropped.
fn close_contour(current: &mut Vec<FontPoint>, contours: &mut Vec<Vec<FontPoint>>) {
    if current.len() > 1 && current.first() == current.last() && current[0].on_curve {
        current.pop();
    }
    if current.len() >= 3 {
        contours.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Cubic bezier as its four control points.
#[derive(Debug, Clone, Copy)]
struct Cubic([(f32, f32); 4]);

impl Cubic {
    fn at(&self, t: f32) -> (f32, f32) {
        let [p0, p1, p2, p3] = self.0;
        let u = 1.0 - t;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        (
            a * p0.0 + b * p1.0 + c * p2.0 + d * p3.0,
            a * p0.1 + b * p1.1 + c * p2.1 + d * p3.1,
        )
    }

    fn tangent(&self, t: f32) -> (f32, f32) {
        let [p0, p1, p2, p3] = self.0;
        let u = 1.0 - t;
        let (a, b, c) = (3.0 * u * u, 6.0 * u * t, 3.0 * t * t);
        (
            a * (p1.0 - p0.0) + b * (p2.0 - p1.0) + c * (p3.0 - p2.0),
            a * (p1.1 - p0.1) + b * (p2.1 - p1.1) + c * (p3.1 - p2.1),
        )
    }

    /// Approximates the curve with `steps` quadratics as (control, end) pairs.
    fn to_quads(&self, steps: usize) -> Vec<((f32, f32), (f32, f32))> {
        let h = 1.0 / steps as f32;
        (0..steps)
            .map(|i| {
                let (t0, t1) = (i as f32 * h, (i + 1) as f32 * h);
                let (q0, q3) = (self.at(t0), self.at(t1));
                let (d0, d1) = (self.tangent(t0), self.tangent(t1));
                let q1 = (q0.0 + d0.0 * h / 3.0, q0.1 + d0.1 * h / 3.0);
                let q2 = (q3.0 - d1.0 * h / 3.0, q3.1 - d1.1 * h / 3.0);
                let control = (
                    (3.0 * (q1.0 + q2.0) - q0.0 - q3.0) / 4.0,
                    (3.0 * (q1.1 + q2.1) - q0.1 - q3.1) / 4.0,
                );
                (control, q3)
            })
            .collect()
    }
}

// ============================================================================
// Table encoding
// ============================================================================

/// Big-endian table buffer.
#[derive(Debug, Default)]
struct TableWriter {
    data: Vec<u8>,
}

impl TableWriter {
    fn u8(&mut self, value: u8) -> &mut Self {
        self.data.push(value);
        self
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn i16(&mut self, value: i16) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn i64(&mut self, value: i64) -> &mut Self {
        self.data.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.data.extend_from_slice(value);
        self
    }

    fn pad_to_four(&mut self) -> &mut Self {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        self
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Facts about the whole glyph set that several tables repeat.
struct Metrics {
    units_per_em: u16,
    bounds: Bounds,
    advance_max: u16,
    advance_avg: i16,
    min_lsb: i16,
    min_rsb: i16,
    x_max_extent: i16,
    max_points: u16,
    max_contours: u16,
}

impl Metrics {
    fn of(glyphs: &[FontGlyph], units_per_em: u16) -> Self {
        let outlined: Vec<(&FontGlyph, Bounds)> =
            glyphs.iter().filter_map(|g| g.bounds.map(|b| (g, b))).collect();
        let advances: Vec<i32> = glyphs
            .iter()
            .map(|g| i32::from(g.advance))
            .filter(|&a| a > 0)
            .collect();

        Self {
            units_per_em,
            bounds: outlined
                .iter()
                .map(|(_, b)| *b)
                .reduce(Bounds::union)
                .unwrap_or_default(),
            advance_max: glyphs.iter().map(|g| g.advance).max().unwrap_or(0),
            advance_avg: if advances.is_empty() {
                0
            } else {
                clamp_i16(advances.iter().sum::<i32>() / advances.len() as i32)
            },
            min_lsb: outlined.iter().map(|(_, b)| b.x_min).min().unwrap_or(0),
            min_rsb: outlined
                .iter()
                .map(|(g, b)| clamp_i16(i32::from(g.advance) - i32::from(b.x_max)))
                .min()
                .unwrap_or(0),
            x_max_extent: outlined.iter().map(|(_, b)| b.x_max).max().unwrap_or(0),
            max_points: glyphs
                .iter()
                .map(|g| u16::try_from(g.point_count()).unwrap_or(u16::MAX))
                .max()
                .unwrap_or(0),
            max_contours: glyphs
                .iter()
                .map(|g| u16::try_from(g.contours.len()).unwrap_or(u16::MAX))
                .max()
                .unwrap_or(0),
        }
    }

    fn part(&self, percent: i32) -> i16 {
        clamp_i16(i32::from(self.units_per_em) * percent / 100)
    }
}

fn build_font(
    font: &FontConfig,
    glyph_set: &GlyphSet,
    outlines: &[IconOutline],
) -> Result<Vec<u8>, String> {
    let units_per_em = u16::try_from(font.units_per_em)
        .map_err(|_| format!("units per em {} does not fit a TrueType font", font.units_per_em))?;
    let num_glyphs = u16::try_from(outlines.len() + 1)
        .map_err(|_| format!("{} glyphs do not fit a TrueType font", outlines.len()))?;

    let notdef = FontGlyph {
        advance: units_per_em,
        ..Default::default()
    };
    let glyphs: Vec<FontGlyph> = std::iter::once(notdef)
        .chain(outlines.iter().map(FontGlyph::from_outline))
        .collect();
    let metrics = Metrics::of(&glyphs, units_per_em);
    let (glyf, loca) = glyf_and_loca(&glyphs)?;

    let tables: [(&[u8; 4], Vec<u8>); 10] = [
        (b"OS/2", os2(&metrics, glyph_set)),
        (b"cmap", cmap(glyph_set)?),
        (b"glyf", glyf),
        (b"head", head(&metrics)),
        (b"hhea", hhea(&metrics, num_glyphs)),
        (b"hmtx", hmtx(&glyphs)),
        (b"loca", loca),
        (b"maxp", maxp(&metrics, num_glyphs)),
        (b"name", name(&font.name)?),
        (b"post", post(&metrics)),
    ];

    let mut builder = FontBuilder::new();
    for (tag, data) in tables {
        builder.add_raw(Tag::new(tag), data);
    }
    let mut bytes = builder.build();
    set_checksum_adjustment(&mut bytes)?;
    Ok(bytes)
}

fn glyf_and_loca(glyphs: &[FontGlyph]) -> Result<(Vec<u8>, Vec<u8>), String> {
    let mut glyf = TableWriter::default();
    let mut loca = TableWriter::default();
    for glyph in glyphs {
        loca.u32(offset32(glyf.len())?);
        encode_glyph(glyph, &mut glyf)?;
        glyf.pad_to_four();
    }
    loca.u32(offset32(glyf.len())?);
    Ok((glyf.finish(), loca.finish()))
}

fn offset32(len: usize) -> Result<u32, String> {
    u32::try_from(len).map_err(|_| "glyph data exceeds 4 GiB".to_string())
}

/// Simple glyph with uncompressed flags and 16-bit coordinate deltas. Empty
/// glyphs take no bytes at all.
fn encode_glyph(glyph: &FontGlyph, out: &mut TableWriter) -> Result<(), String> {
    let Some(bounds) = glyph.bounds else {
        return Ok(());
    };
    let contour_count =
        i16::try_from(glyph.contours.len()).map_err(|_| "too many contours in one glyph")?;

    out.i16(contour_count)
        .i16(bounds.x_min)
        .i16(bounds.y_min)
        .i16(bounds.x_max)
        .i16(bounds.y_max);

    let mut end = 0usize;
    for contour in &glyph.contours {
        end += contour.len();
        let last = u16::try_from(end - 1).map_err(|_| "too many points in one glyph")?;
        out.u16(last);
    }
    // no instructions
    out.u16(0);

    let points: Vec<&FontPoint> = glyph.contours.iter().flatten().collect();
    for point in &points {
        out.u8(u8::from(point.on_curve));
    }
    let axes: [fn(&FontPoint) -> i16; 2] = [|p| p.x, |p| p.y];
    for axis in axes {
        let mut previous = 0i32;
        for point in &points {
            let value = i32::from(axis(point));
            let delta = i16::try_from(value - previous)
                .map_err(|_| "outline exceeds the font coordinate range")?;
            out.i16(delta);
            previous = value;
        }
    }
    Ok(())
}

fn head(m: &Metrics) -> Vec<u8> {
    let mut w = TableWriter::default();
    w.u16(1)
        .u16(0)
        .u32(0x0001_0000)
        // checksum adjustment, patched once the font is assembled
        .u32(0)
        .u32(0x5F0F_3CF5)
        // baseline at y = 0
        .u16(0x0001)
        .u16(m.units_per_em)
        .i64(0)
        .i64(0)
        .i16(m.bounds.x_min)
        .i16(m.bounds.y_min)
        .i16(m.bounds.x_max)
        .i16(m.bounds.y_max)
        .u16(0)
        .u16(8)
        .i16(2)
        // long loca offsets
        .i16(1)
        .i16(0);
    w.finish()
}

fn hhea(m: &Metrics, num_glyphs: u16) -> Vec<u8> {
    let mut w = TableWriter::default();
    w.u32(0x0001_0000)
        .i16(clamp_i16(m.units_per_em.into()))
        .i16(m.bounds.y_min.min(0))
        .i16(0)
        .u16(m.advance_max)
        .i16(m.min_lsb)
        .i16(m.min_rsb)
        .i16(m.x_max_extent)
        .i16(1)
        .i16(0)
        .i16(0)
        .bytes(&[0; 8])
        .i16(0)
        .u16(num_glyphs);
    w.finish()
}

fn hmtx(glyphs: &[FontGlyph]) -> Vec<u8> {
    let mut w = TableWriter::default();
    for glyph in glyphs {
        w.u16(glyph.advance).i16(glyph.left_side_bearing());
    }
    w.finish()
}

fn maxp(m: &Metrics, num_glyphs: u16) -> Vec<u8> {
    let mut w = TableWriter::default();
    w.u32(0x0001_0000)
        .u16(num_glyphs)
        .u16(m.max_points)
        .u16(m.max_contours)
        .u16(0)
        .u16(0)
        .u16(2)
        .bytes(&[0; 16]);
    w.finish()
}

fn os2(m: &Metrics, glyphs: &GlyphSet) -> Vec<u8> {
    let codepoints: Vec<u32> = glyphs.iter().map(|g| g.codepoint as u32).collect();
    let first = codepoints.iter().min().map_or(0, |&c| c.min(0xFFFF) as u16);
    let last = codepoints.iter().max().map_or(0, |&c| c.min(0xFFFF) as u16);
    // bit 60: private use area
    let private_use = codepoints.iter().any(|c| (0xE000..=0xF8FF).contains(c));
    let descent = u16::try_from(-i32::from(m.bounds.y_min.min(0))).unwrap_or(u16::MAX);

    let mut w = TableWriter::default();
    w.u16(4)
        .i16(m.advance_avg)
        .u16(400)
        .u16(5)
        .u16(0)
        .i16(m.part(65))
        .i16(m.part(60))
        .i16(0)
        .i16(m.part(7))
        .i16(m.part(65))
        .i16(m.part(60))
        .i16(0)
        .i16(m.part(48))
        .i16(m.part(5))
        .i16(m.part(26))
        .i16(0)
        .bytes(&[0; 10])
        .u32(0)
        .u32(if private_use { 1 << 28 } else { 0 })
        .u32(0)
        .u32(0)
        .bytes(b"NONE")
        // regular
        .u16(0x0040)
        .u16(first)
        .u16(last)
        .i16(clamp_i16(m.units_per_em.into()))
        .i16(m.bounds.y_min.min(0))
        .i16(0)
        .u16(m.units_per_em.max(m.bounds.y_max.max(0) as u16))
        .u16(descent)
        .u32(0)
        .u32(0)
        .i16(0)
        .i16(0)
        .u16(0)
        .u16(0x20)
        .u16(0);
    w.finish()
}

fn post(m: &Metrics) -> Vec<u8> {
    let mut w = TableWriter::default();
    w.u32(0x0003_0000)
        .u32(0)
        .i16(-m.part(10))
        .i16(m.part(5))
        .bytes(&[0; 20]);
    w.finish()
}

/// Consecutive code points mapped to consecutive glyph ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CharRun {
    start: u32,
    end: u32,
    first_glyph: u16,
}

fn char_runs(glyphs: &GlyphSet) -> Vec<CharRun> {
    let mut runs: Vec<CharRun> = Vec::new();
    for (index, glyph) in glyphs.iter().enumerate() {
        let code = glyph.codepoint as u32;
        let gid = u16::try_from(index + 1).unwrap_or(u16::MAX);
        match runs.last_mut() {
            Some(run)
                if run.end + 1 == code
                    && u32::from(run.first_glyph) + (code - run.start) == u32::from(gid) =>
            {
                run.end = code;
            }
            _ => runs.push(CharRun { start: code, end: code, first_glyph: gid }),
        }
    }
    runs
}

/// Format 4 for the BMP under (3, 1) and format 12 for everything under
/// (3, 10).
fn cmap(glyphs: &GlyphSet) -> Result<Vec<u8>, String> {
    let runs = char_runs(glyphs);
    let bmp = cmap_format4(&runs)?;

    let mut w = TableWriter::default();
    w.u16(0).u16(2);
    w.u16(3).u16(1).u32(20);
    w.u16(3).u16(10).u32(20 + offset32(bmp.len())?);
    w.bytes(&bmp).bytes(&cmap_format12(&runs)?);
    Ok(w.finish())
}

fn cmap_format4(runs: &[CharRun]) -> Result<Vec<u8>, String> {
    let mut segments: Vec<(u16, u16, u16)> = runs
        .iter()
        .filter(|r| r.start < 0xFFFF)
        .map(|r| {
            let delta = u32::from(r.first_glyph).wrapping_sub(r.start) as u16;
            (r.start as u16, r.end.min(0xFFFE) as u16, delta)
        })
        .collect();
    segments.push((0xFFFF, 0xFFFF, 1));

    let count = u16::try_from(segments.len()).map_err(|_| "too many cmap segments")?;
    let length = u16::try_from(16 + 8 * segments.len()).map_err(|_| "cmap subtable too large")?;
    let selector = 15 - count.leading_zeros() as u16;
    let search_range = 2 << selector;

    let mut w = TableWriter::default();
    w.u16(4)
        .u16(length)
        .u16(0)
        .u16(count * 2)
        .u16(search_range)
        .u16(selector)
        .u16(count * 2 - search_range);
    for (_, end, _) in &segments {
        w.u16(*end);
    }
    w.u16(0);
    for (start, _, _) in &segments {
        w.u16(*start);
    }
    for (_, _, delta) in &segments {
        w.u16(*delta);
    }
    for _ in &segments {
        w.u16(0);
    }
    Ok(w.finish())
}

fn cmap_format12(runs: &[CharRun]) -> Result<Vec<u8>, String> {
    let groups = u32::try_from(runs.len()).map_err(|_| "too many cmap groups")?;
    let mut w = TableWriter::default();
    w.u16(12)
        .u16(0)
        .u32(16 + 12 * groups)
        .u32(0)
        .u32(groups);
    for run in runs {
        w.u32(run.start).u32(run.end).u32(run.first_glyph.into());
    }
    Ok(w.finish())
}

/// Windows Unicode names: family, subfamily, unique id, full name, version
/// and PostScript name.
fn name(family: &str) -> Result<Vec<u8>, String> {
    let postscript: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let entries: [(u16, String); 6] = [
        (1, family.to_string()),
        (2, "Regular".to_string()),
        (3, format!("{family}:Regular")),
        (4, family.to_string()),
        (5, "Version 1.000".to_string()),
        (6, postscript),
    ];

    let mut records = TableWriter::default();
    let mut storage = TableWriter::default();
    for (id, text) in &entries {
        let encoded: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        let length = u16::try_from(encoded.len()).map_err(|_| "font name too long")?;
        let offset = u16::try_from(storage.len()).map_err(|_| "font names too long")?;
        records.u16(3).u16(1).u16(0x0409).u16(*id).u16(length).u16(offset);
        storage.bytes(&encoded);
    }

    let mut w = TableWriter::default();
    w.u16(0)
        .u16(entries.len() as u16)
        .u16(6 + 12 * entries.len() as u16)
        .bytes(&records.finish())
        .bytes(&storage.finish());
    Ok(w.finish())
}

// ============================================================================
// Whole-font checksum
// ============================================================================

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Sets `head.checksumAdjustment` so the whole font sums to `0xB1B0AFBA`.
fn set_checksum_adjustment(font: &mut [u8]) -> Result<(), String> {
    let missing = || "assembled font has no head table".to_string();
    let num_tables = font
        .get(4..6)
        .map(|b| usize::from(u16::from_be_bytes([b[0], b[1]])))
        .ok_or_else(missing)?;
    let head_offset = (0..num_tables)
        .map(|i| 12 + 16 * i)
        .find(|&record| font.get(record..record + 4) == Some(&b"head"[..]))
        .and_then(|record| font.get(record + 8..record + 12))
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize)
        .ok_or_else(missing)?;

    let field = head_offset + 8..head_offset + 12;
    font.get_mut(field.clone()).ok_or_else(missing)?.fill(0);
    let adjustment = 0xB1B0_AFBAu32.wrapping_sub(checksum(font));
    font[field].copy_from_slice(&adjustment.to_be_bytes());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::font::Glyph;
    use ttf_parser::{Face, GlyphId, OutlineBuilder, Rect, name_id};

    const SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><path d="M0 0 H10 V10 H0 Z" fill="#000"/></svg>"##;
    const CIRCLE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><circle cx="5" cy="5" r="5" fill="#000"/></svg>"##;
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

    fn generate(sources: &[Asset]) -> (Vec<u8>, GlyphSet) {
        let (emitter, rx) = GlyphEmitter::channel();
        let fonts = TrueTypeEngine.generate(sources, &font(), emitter).unwrap();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].file_name(), "icons.ttf");
        (fonts[0].contents.clone(), rx.recv().unwrap())
    }

    #[derive(Default)]
    struct Segments {
        quads: usize,
        cubics: usize,
        closes: usize,
    }

    impl OutlineBuilder for Segments {
        fn move_to(&mut self, _: f32, _: f32) {}
        fn line_to(&mut self, _: f32, _: f32) {}
        fn quad_to(&mut self, _: f32, _: f32, _: f32, _: f32) {
            self.quads += 1;
        }
        fn curve_to(&mut self, _: f32, _: f32, _: f32, _: f32, _: f32, _: f32) {
            self.cubics += 1;
        }
        fn close(&mut self) {
            self.closes += 1;
        }
    }

    #[test]
    fn maps_each_icon_to_a_glyph() {
        let (bytes, glyphs) = generate(&[asset("002_heart", SQUARE), asset("001_star", SQUARE)]);
        assert_eq!(glyphs.len(), 2);

        let face = Face::parse(&bytes, 0).unwrap();
        assert_eq!(face.number_of_glyphs(), 3);
        assert_eq!(face.units_per_em(), 1000);
        assert_eq!(face.glyph_index('\u{EA01}'), Some(GlyphId(1)));
        assert_eq!(face.glyph_index('\u{EA02}'), Some(GlyphId(2)));
        assert_eq!(face.glyph_index('a'), None);
        assert_eq!(face.glyph_hor_advance(GlyphId(1)), Some(1000));

        let family = face
            .names()
            .into_iter()
            .find(|n| n.name_id == name_id::FAMILY)
            .and_then(|n| n.to_string());
        assert_eq!(family.as_deref(), Some("icons"));
    }

    #[test]
    fn square_outline_spans_the_em() {
        let (bytes, _) = generate(&[asset("square", SQUARE)]);
        let face = Face::parse(&bytes, 0).unwrap();
        let mut segments = Segments::default();
        let bbox = face.outline_glyph(GlyphId(1), &mut segments).unwrap();
        assert_eq!(bbox, Rect { x_min: 0, y_min: 0, x_max: 1000, y_max: 1000 });
        assert_eq!(segments.closes, 1);
        assert_eq!(segments.quads, 0);
    }

    #[test]
    fn curves_become_quadratics() {
        let (bytes, _) = generate(&[asset("circle", CIRCLE)]);
        let face = Face::parse(&bytes, 0).unwrap();
        let mut segments = Segments::default();
        let bbox = face.outline_glyph(GlyphId(1), &mut segments).unwrap();
        assert_eq!(segments.cubics, 0);
        assert!(segments.quads >= 4);
        assert!(bbox.x_min.abs() <= 5 && (bbox.x_max - 1000).abs() <= 5, "{bbox:?}");
        assert!(bbox.y_min.abs() <= 5 && (bbox.y_max - 1000).abs() <= 5, "{bbox:?}");
    }

    #[test]
    fn unfilled_icon_gets_an_empty_glyph() {
        let (bytes, _) = generate(&[asset("line", OUTLINE_ONLY)]);
        let face = Face::parse(&bytes, 0).unwrap();
        assert_eq!(face.glyph_index('\u{EA01}'), Some(GlyphId(1)));
        assert!(face.outline_glyph(GlyphId(1), &mut Segments::default()).is_none());
        assert_eq!(face.glyph_hor_advance(GlyphId(1)), Some(1000));
    }

    #[test]
    fn whole_font_checksum_is_balanced() {
        let (bytes, _) = generate(&[asset("square", SQUARE), asset("circle", CIRCLE)]);
        assert_eq!(checksum(&bytes), 0xB1B0_AFBA);
    }

    #[test]
    fn consecutive_codepoints_share_a_run() {
        let glyph = |name: &str, codepoint| Glyph {
            name: name.into(),
            codepoint,
            source: PathBuf::from(name),
        };
        let set = GlyphSet::new(vec![
            glyph("a", '\u{E000}'),
            glyph("b", '\u{E001}'),
            glyph("c", '\u{E005}'),
        ]);
        assert_eq!(
            char_runs(&set),
            [
                CharRun { start: 0xE000, end: 0xE001, first_glyph: 1 },
                CharRun { start: 0xE005, end: 0xE005, first_glyph: 3 },
            ]
        );
    }

    #[test]
    fn oversized_em_is_rejected() {
        let mut font = font();
        font.units_per_em = 70_000;
        let (emitter, rx) = GlyphEmitter::channel();
        let err = TrueTypeEngine
            .generate(&[asset("square", SQUARE)], &font, emitter)
            .unwrap_err();
        assert!(matches!(err, Error::Engine { stage: Stage::Font, .. }));
        assert!(rx.recv().is_err());
    }
}
