//! Recolor stage: minify each source SVG and rewrite its fills.
//!
//! The document is parsed with `roxmltree` into a small owned tree, cleaned
//! up, every `fill` attribute is set to the palette color, and the result is
//! serialized with `quick-xml`. Elements without a `fill` attribute are never
//! given one.

use std::time::Instant;

use log::info;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use roxmltree::{Document, Node, ParsingOptions};

use super::StageReport;
use crate::asset::{self, Asset};
use crate::context::BuildContext;
use crate::error::{Error, Result, Stage};
use crate::naming;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespaces written by editors that carry no rendering information.
const EDITOR_NAMESPACES: &[&str] = &[
    "http://www.inkscape.org/namespaces/inkscape",
    "http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
    "http://www.bohemiancoding.com/sketch/ns",
    "http://ns.adobe.com/AdobeIllustrator/10.0/",
    "http://ns.adobe.com/AdobeSVGViewerExtensions/3.0/",
    "http://ns.adobe.com/Extensibility/1.0/",
    "http://ns.adobe.com/Flows/1.0/",
    "http://ns.adobe.com/GenericCustomNamespace/1.0/",
    "http://ns.adobe.com/Graphs/1.0/",
    "http://ns.adobe.com/ImageReplacement/1.0/",
    "http://ns.adobe.com/SaveForWeb/1.0/",
    "http://ns.adobe.com/Variables/1.0/",
    "http://ns.adobe.com/XPath/1.0/",
];

/// Elements dropped outright during minification.
const NON_RENDERING: &[&str] = &["metadata", "title", "desc"];

/// Group attributes that may be pushed down onto a single child.
const INHERITABLE: &[&str] = &[
    "fill",
    "fill-opacity",
    "fill-rule",
    "stroke",
    "stroke-width",
    "stroke-opacity",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-dasharray",
    "stroke-dashoffset",
    "color",
    "visibility",
];

fn is_editor_ns(uri: &str) -> bool {
    EDITOR_NAMESPACES.contains(&uri)
}

// ============================================================================
// Owned SVG tree
// ============================================================================

/// An element with qualified name and attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    fn from_node(node: Node<'_, '_>) -> Option<Self> {
        if node.tag_name().namespace().is_some_and(is_editor_ns) {
            return None;
        }

        let mut attributes = Vec::new();

        // Declarations introduced by this element (not inherited from the parent).
        let inherited: Vec<(Option<&str>, &str)> = node
            .parent_element()
            .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
            .unwrap_or_default();
        for ns in node.namespaces() {
            if ns.uri() == XML_NS
                || is_editor_ns(ns.uri())
                || inherited.contains(&(ns.name(), ns.uri()))
            {
                continue;
            }
            let key = match ns.name() {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            attributes.push((key, ns.uri().to_string()));
        }

        for attr in node.attributes() {
            if attr.namespace().is_some_and(is_editor_ns) {
                continue;
            }
            attributes.push((
                qualify(node, attr.namespace(), attr.name()),
                attr.value().to_string(),
            ));
        }

        let mut children = Vec::new();
        for child in node.children() {
            if child.is_element() {
                if let Some(el) = Element::from_node(child) {
                    children.push(Content::Element(el));
                }
            } else if child.is_text() {
                if let Some(text) = child.text().filter(|t| !t.trim().is_empty()) {
                    children.push(Content::Text(text.to_string()));
                }
            }
        }

        Some(Self {
            name: qualify(node, node.tag_name().namespace(), node.tag_name().name()),
            attributes,
            children,
        })
    }
}

fn qualify(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

/// A parsed SVG document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgDocument {
    pub root: Element,
}

impl SvgDocument {
    /// Parses SVG markup. Comments, processing instructions, the doctype and
    /// whitespace-only text are not retained.
    pub fn parse(text: &str) -> Result<Self, String> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|e| e.to_string())?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(format!(
                "root element is <{}>, expected <svg>",
                root.tag_name().name()
            ));
        }
        let root = Element::from_node(root).ok_or("root element belongs to an editor namespace")?;
        Ok(Self { root })
    }

    /// Removes non-rendering content and collapses redundant groups.
    pub fn minify(&mut self) {
        strip_non_rendering(&mut self.root.children);
        collapse_groups(&mut self.root.children);
        remove_empty_containers(&mut self.root.children);
    }

    /// Sets every existing `fill` attribute to `color`. Returns how many were rewritten.
    pub fn recolor(&mut self, color: &str) -> usize {
        fn visit(el: &mut Element, color: &str) -> usize {
            let mut count = 0;
            if el.attribute("fill").is_some() {
                el.set_attribute("fill", color);
                count += 1;
            }
            for child in &mut el.children {
                if let Content::Element(e) = child {
                    count += visit(e, color);
                }
            }
            count
        }
        visit(&mut self.root, color)
    }

    /// Serializes the document without indentation.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), String> {
    let start = BytesStart::new(el.name.as_str())
        .with_attributes(el.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    if el.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &el.children {
        match child {
            Content::Element(e) => write_element(writer, e)?,
            Content::Text(t) => emit(writer, Event::Text(BytesText::new(t)))?,
        }
    }
    emit(writer, Event::End(BytesEnd::new(el.name.as_str())))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

// ============================================================================
// Minification passes
// ============================================================================

fn strip_non_rendering(children: &mut Vec<Content>) {
    children.retain(|c| !matches!(c, Content::Element(e) if NON_RENDERING.contains(&e.name.as_str())));
    for child in children.iter_mut() {
        if let Content::Element(e) = child {
            strip_non_rendering(&mut e.children);
        }
    }
}

/// Unwraps attribute-less groups and pushes group attributes down onto a
/// lone child where that cannot change rendering.
fn collapse_groups(children: &mut Vec<Content>) {
    let mut collapsed = Vec::with_capacity(children.len());

    for child in children.drain(..) {
        let mut el = match child {
            Content::Element(el) => el,
            text => {
                collapsed.push(text);
                continue;
            }
        };
        collapse_groups(&mut el.children);

        if el.name == "g" {
            push_down_attributes(&mut el);
            if el.attributes.is_empty() {
                collapsed.extend(el.children);
                continue;
            }
        }
        collapsed.push(Content::Element(el));
    }

    *children = collapsed;
}

fn push_down_attributes(group: &mut Element) {
    if group.attributes.is_empty() || group.children.len() != 1 {
        return;
    }
    let movable = group
        .attributes
        .iter()
        .all(|(k, _)| k == "transform" || INHERITABLE.contains(&k.as_str()));
    let transformed = group.attribute("transform").is_some();
    if !movable {
        return;
    }

    let Some(Content::Element(child)) = group.children.first_mut() else {
        return;
    };
    let clipped = child.attribute("clip-path").is_some() || child.attribute("mask").is_some();
    if clipped && transformed {
        return;
    }

    for (key, value) in group.attributes.drain(..) {
        if key == "transform" {
            let merged = match child.attribute("transform") {
                Some(own) => format!("{value} {own}"),
                None => value,
            };
            child.set_attribute("transform", &merged);
        } else if child.attribute(&key).is_none() {
            child.set_attribute(&key, &value);
        }
    }
}

fn remove_empty_containers(children: &mut Vec<Content>) {
    for child in children.iter_mut() {
        if let Content::Element(e) = child {
            remove_empty_containers(&mut e.children);
        }
    }
    children.retain(|c| match c {
        Content::Element(e) => {
            !(matches!(e.name.as_str(), "g" | "defs")
                && e.children.is_empty()
                && e.attribute("id").is_none()
                && e.attribute("filter").is_none())
        }
        Content::Text(_) => true,
    });
}

// ============================================================================
// Stage
// ============================================================================

/// Produces the recolored copy of one source asset.
pub fn recolor_asset(source: &Asset, color_key: &str, color: &str) -> Result<Asset> {
    let text = std::str::from_utf8(&source.contents)
        .map_err(|e| Error::engine(Stage::Recolor, &source.origin, e))?;
    let mut doc =
        SvgDocument::parse(text).map_err(|e| Error::engine(Stage::Recolor, &source.origin, e))?;

    doc.minify();
    doc.recolor(color);

    let bytes = doc
        .to_bytes()
        .map_err(|e| Error::engine(Stage::Recolor, &source.origin, e))?;
    Ok(source.derive(naming::recolored_name(&source.stem, color_key), "svg", bytes))
}

/// Recolors every source icon with one palette entry and writes the results
/// to the recolored output directory.
///
/// Outputs whose bytes are already on disk are not rewritten, which keeps the
/// rasterize stage's freshness check meaningful across full rebuilds.
pub fn run(ctx: &BuildContext, color_key: &str, color: &str) -> Result<StageReport> {
    let start = Instant::now();
    let mut report = StageReport::new(format!("recolor-{color_key}"));

    let sources = asset::read_all(Stage::Recolor, &ctx.source_dir(), &ctx.config().sources.icons)?;
    let out_dir = ctx.svg_dir();
    for source in &sources {
        let recolored = recolor_asset(source, color_key, color)?;
        match recolored.write_if_changed(Stage::Recolor, &out_dir)? {
            (path, true) => report.written.push(path),
            (_, false) => report.skipped += 1,
        }
    }

    report.duration = start.elapsed();
    info!(
        "[recolor] {color_key}: {} written, {} unchanged in {:?}",
        report.written.len(),
        report.skipped,
        report.duration
    );
    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================
