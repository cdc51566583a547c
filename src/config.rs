//! Build configuration and package metadata.
//!
//! The configuration is a TOML file describing the palette, the raster sizes
//! and the font metadata:
//!
//! ```toml
//! [colors]
//! red = "#ff0000"
//!
//! [sizes]
//! small = 16
//!
//! [font]
//! name = "iconpack"
//! classname = "icon"
//! ```
//!
//! [`load`] reads a primary file and falls back to a bundled example when the
//! primary does not exist. The result is validated once and then treated as
//! immutable for the rest of the run.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::info;
use palette::Srgb;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid key pattern"));

// ============================================================================
// Configuration
// ============================================================================

/// The complete, validated build configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Configuration {
    /// Palette key -> color value written into `fill` attributes.
    #[serde(default)]
    pub colors: BTreeMap<String, String>,

    /// Size key -> raster width in pixels.
    #[serde(default)]
    pub sizes: BTreeMap<String, u32>,

    #[serde(default)]
    pub font: FontConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Font metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FontConfig {
    /// Font family name. Also names the stylesheet and the archive.
    #[serde(default)]
    pub name: String,

    /// CSS class prefix used by the generated stylesheet.
    #[serde(default)]
    pub classname: String,

    #[serde(default = "default_units_per_em")]
    pub units_per_em: u32,

    /// First code point handed out to glyphs (private use area by default).
    #[serde(default = "default_start_codepoint")]
    pub start_codepoint: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            classname: String::new(),
            units_per_em: default_units_per_em(),
            start_codepoint: default_start_codepoint(),
        }
    }
}

/// Directory layout, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    #[serde(default = "default_source_dir")]
    pub source: PathBuf,

    #[serde(default = "default_dist_dir")]
    pub dist: PathBuf,

    #[serde(default = "default_templates_dir")]
    pub templates: PathBuf,

    /// Where the packaged archive is written.
    #[serde(default = "default_archive_dir")]
    pub archive: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: default_source_dir(),
            dist: default_dist_dir(),
            templates: default_templates_dir(),
            archive: default_archive_dir(),
        }
    }
}

/// Glob patterns, relative to `paths.source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourcesConfig {
    /// Icons fed to the recolor stage.
    #[serde(default = "default_icons_pattern")]
    pub icons: String,

    /// Icons fed to the font stage.
    #[serde(default = "default_glyphs_pattern")]
    pub glyphs: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            icons: default_icons_pattern(),
            glyphs: default_glyphs_pattern(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArchiveConfig {
    /// Paths left out of the archive, matched against project-relative paths
    /// and each of their parent directories.
    #[serde(default = "default_archive_exclude")]
    pub exclude: Vec<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            exclude: default_archive_exclude(),
        }
    }
}

fn default_units_per_em() -> u32 {
    1000
}

fn default_start_codepoint() -> u32 {
    0xEA01
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

fn default_dist_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_archive_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_icons_pattern() -> String {
    "**/*.svg".to_string()
}

fn default_glyphs_pattern() -> String {
    "*.svg".to_string()
}

fn default_archive_exclude() -> Vec<String> {
    ["node_modules", "node_modules/**", "target", "target/**", ".git", ".git/**", "*.zip"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Configuration {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Configuration = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants every stage relies on.
    ///
    /// All problems are collected so a broken file is reported in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.colors.is_empty() {
            problems.push("`colors` must define at least one color".to_string());
        }
        for (key, value) in &self.colors {
            check_key("colors", key, &mut problems);
            if let Some(problem) = check_color(value) {
                problems.push(format!("colors.{key}: {problem}"));
            }
        }

        if self.sizes.is_empty() {
            problems.push("`sizes` must define at least one size".to_string());
        }
        for (key, width) in &self.sizes {
            check_key("sizes", key, &mut problems);
            if *width == 0 {
                problems.push(format!("sizes.{key}: width must be greater than zero"));
            }
        }

        if self.font.name.trim().is_empty() {
            problems.push("`font.name` is required".to_string());
        }
        if self.font.classname.trim().is_empty() {
            problems.push("`font.classname` is required".to_string());
        }
        if self.font.units_per_em == 0 {
            problems.push("`font.units_per_em` must be greater than zero".to_string());
        }
        if char::from_u32(self.font.start_codepoint).is_none() {
            problems.push(format!(
                "`font.start_codepoint` {:#x} is not a valid code point",
                self.font.start_codepoint
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems))
        }
    }
}

fn check_key(section: &str, key: &str, problems: &mut Vec<String>) {
    if !KEY_PATTERN.is_match(key) {
        problems.push(format!(
            "{section}: key `{key}` must be a non-empty identifier of letters, digits, `_` or `-`"
        ));
    }
}

/// Hex colors must be well formed; anything else (CSS color names) passes through.
fn check_color(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some("color value is empty".to_string());
    }
    if value.starts_with('#') {
        if let Err(e) = value.parse::<Srgb<u8>>() {
            return Some(format!("`{value}` is not a valid hex color ({e})"));
        }
    }
    None
}

// ============================================================================
// Loading
// ============================================================================

/// Loads the configuration from `primary`, or from `fallback` when `primary`
/// does not exist.
///
/// Only a missing primary triggers the fallback; a primary that exists but
/// cannot be read or parsed is an error.
pub fn load(primary: &Path, fallback: &Path) -> Result<Configuration, ConfigError> {
    match fs::read_to_string(primary) {
        Ok(text) => {
            info!("using configuration {}", primary.display());
            Configuration::from_toml(&text, primary)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(
                "{} not found, falling back to {}",
                primary.display(),
                fallback.display()
            );
            let text = fs::read_to_string(fallback).map_err(|source| ConfigError::Io {
                path: fallback.to_path_buf(),
                source,
            })?;
            Configuration::from_toml(&text, fallback)
        }
        Err(source) => Err(ConfigError::Io {
            path: primary.to_path_buf(),
            source,
        }),
    }
}

// ============================================================================
// Package Metadata
// ============================================================================

/// Package metadata. Only the version is used: it names the archive and is
/// passed to the font templates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageMeta {
    #[serde(default)]
    pub version: String,
}

impl PackageMeta {
    pub fn from_json(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let meta: PackageMeta = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: origin.to_path_buf(),
            source,
        })?;
        if meta.version.trim().is_empty() {
            return Err(ConfigError::Validation(vec![format!(
                "{}: `version` is required",
                origin.display()
            )]));
        }
        Ok(meta)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r##"
[colors]
red = "#ff0000"

[sizes]
small = 16

[font]
name = "icons"
classname = "icon"
"##;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Configuration::from_toml(MINIMAL, Path::new("config.toml")).unwrap();
        assert_eq!(config.colors["red"], "#ff0000");
        assert_eq!(config.sizes["small"], 16);
        assert_eq!(config.font.name, "icons");
        assert_eq!(config.font.units_per_em, 1000);
        assert_eq!(config.font.start_codepoint, 0xEA01);
        assert_eq!(config.paths.dist, PathBuf::from("dist"));
        assert_eq!(config.sources.icons, "**/*.svg");
        assert!(config.archive.exclude.iter().any(|p| p == "*.zip"));
    }

    #[test]
    fn missing_sections_are_reported_together() {
        let err = Configuration::from_toml("", Path::new("config.toml")).unwrap_err();
        let ConfigError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert_eq!(problems.len(), 4);
    }

    #[test]
    fn rejects_bad_keys_and_values() {
        let text = r##"
[colors]
"bad key" = "#ff0000"
blue = "#zzzzzz"

[sizes]
zero = 0

[font]
name = "icons"
classname = "icon"
"##;
        let err = Configuration::from_toml(text, Path::new("config.toml")).unwrap_err();
        let ConfigError::Validation(problems) = err else {
            panic!("expected validation error");
        };
        assert!(problems.iter().any(|p| p.contains("bad key")));
        assert!(problems.iter().any(|p| p.contains("colors.blue")));
        assert!(problems.iter().any(|p| p.contains("sizes.zero")));
    }

    #[test]
    fn accepts_named_colors() {
        let text = MINIMAL.replace("\"#ff0000\"", "\"rebeccapurple\"");
        let config = Configuration::from_toml(&text, Path::new("config.toml")).unwrap();
        assert_eq!(config.colors["red"], "rebeccapurple");
    }

    #[test]
    fn falls_back_only_when_primary_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("config.example.toml");
        fs::write(&fallback, MINIMAL).unwrap();

        let config = load(&dir.path().join("config.toml"), &fallback).unwrap();
        assert_eq!(config.font.name, "icons");

        let primary = dir.path().join("config.toml");
        fs::write(&primary, "colors = [").unwrap();
        assert!(matches!(
            load(&primary, &fallback),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_fallback_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("a.toml"), &dir.path().join("b.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn package_meta_requires_version() {
        let meta = PackageMeta::from_json(r#"{"name":"x","version":"1.2.3"}"#, Path::new("package.json"))
            .unwrap();
        assert_eq!(meta.version, "1.2.3");

        assert!(PackageMeta::from_json(r#"{"name":"x"}"#, Path::new("package.json")).is_err());
    }
}
