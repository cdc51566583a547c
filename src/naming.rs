//! Output naming.
//!
//! Source icons carry a three digit ordering prefix (`001_star.svg`) so they
//! sort in a stable order on disk. Generated artifacts drop that prefix and
//! append the palette or size key instead.

use std::sync::LazyLock;

use regex::Regex;

static ORDER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}_").expect("valid prefix pattern"));

/// Strips a leading `NNN_` ordering prefix.
///
/// Exactly three ASCII digits followed by an underscore are removed; any other
/// basename is returned unchanged. Only one prefix is removed, so a name that
/// stacks two of them (`001_002_x`) keeps the second as part of its clean name.
pub fn normalize(basename: &str) -> &str {
    match ORDER_PREFIX.find(basename) {
        Some(m) => &basename[m.end()..],
        None => basename,
    }
}

/// Basename of a recolored SVG: `star` + `red` -> `star-red`.
pub fn recolored_name(basename: &str, color_key: &str) -> String {
    format!("{}-{}", normalize(basename), color_key)
}

/// Basename of a rasterized PNG: `star-red` + `small` -> `star-red--small`.
pub fn rasterized_name(basename: &str, size_key: &str) -> String {
    format!("{}--{}", normalize(basename), size_key)
}

/// File name of the packaged archive.
pub fn archive_name(font_name: &str, version: &str) -> String {
    format!("{font_name}-{version}.zip")
}
