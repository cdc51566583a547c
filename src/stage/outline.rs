//! Icon outlines in font units, shared by the font engines.
//!
//! Icons are ordered by basename and handed consecutive code points from
//! `font.start_codepoint`. Outlines come from the filled paths of the usvg
//! tree, scaled so the icon height equals the em size, with the y axis
//! pointing up and the baseline at zero.

use log::debug;
use resvg::tiny_skia::{Path, Transform};
use resvg::usvg::{Group, Node, Options, Tree};

use super::font::{Glyph, GlyphSet};
use crate::asset::Asset;
use crate::config::FontConfig;
use crate::error::{Error, Result, Stage};

/// Filled paths and advance width of one icon, in font units.
#[derive(Debug, Clone)]
pub(crate) struct IconOutline {
    pub paths: Vec<Path>,
    pub advance: f32,
}

/// Assigns code points and loads every outline, in code point order.
pub(crate) fn assign(sources: &[Asset], font: &FontConfig) -> Result<(GlyphSet, Vec<IconOutline>)> {
    let mut ordered: Vec<&Asset> = sources.iter().collect();
    ordered.sort_by(|a, b| a.stem.cmp(&b.stem));

    let mut assigned = Vec::with_capacity(ordered.len());
    let mut outlines = Vec::with_capacity(ordered.len());
    for (offset, source) in ordered.iter().enumerate() {
        let codepoint = u32::try_from(offset)
            .ok()
            .and_then(|o| font.start_codepoint.checked_add(o))
            .and_then(char::from_u32)
            .ok_or_else(|| Error::engine(Stage::Font, &source.origin, "ran out of code points"))?;
        let outline = load(&source.contents, font.units_per_em)
            .map_err(|e| Error::engine(Stage::Font, &source.origin, e))?;

        debug!("[font] {} -> U+{:04X}", source.stem, codepoint as u32);
        assigned.push(Glyph {
            name: source.stem.clone(),
            codepoint,
            source: source.origin.clone(),
        });
        outlines.push(outline);
    }

    Ok((GlyphSet::new(assigned), outlines))
}

/// Parses one icon and returns its outline in font units.
pub(crate) fn load(svg_data: &[u8], units_per_em: u32) -> Result<IconOutline, String> {
    let tree = Tree::from_data(svg_data, &Options::default()).map_err(|e| e.to_string())?;

    let size = tree.size();
    let em = units_per_em as f32;
    let scale = em / size.height();
    let flip = Transform::from_row(scale, 0.0, 0.0, -scale, 0.0, em);

    let mut paths = Vec::new();
    collect_paths(tree.root(), flip, &mut paths);

    Ok(IconOutline {
        paths,
        advance: size.width() * scale,
    })
}

fn collect_paths(group: &Group, flip: Transform, out: &mut Vec<Path>) {
    for node in group.children() {
        match node {
            Node::Group(child) => collect_paths(child, flip, out),
            Node::Path(p) if p.is_visible() && p.fill().is_some() => {
                let ts = p.abs_transform().post_concat(flip);
                if let Some(data) = p.data().clone().transform(ts) {
                    out.push(data);
                }
            }
            _ => {}
        }
    }
}
