//! Everything a stage needs to know about the current build.

use std::path::{Path, PathBuf};

use crate::config::{Configuration, PackageMeta};

/// Configuration, package metadata and resolved directories for one build.
///
/// Built once at start-up and shared read-only by every task.
#[derive(Debug, Clone)]
pub struct BuildContext {
    config: Configuration,
    package: PackageMeta,
    project_root: PathBuf,
    incremental: bool,
}

impl BuildContext {
    pub fn new(config: Configuration, package: PackageMeta, project_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            package,
            project_root: project_root.into(),
            incremental: true,
        }
    }

    /// Enables or disables the rasterize freshness check.
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.package.version
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Original icons.
    pub fn source_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.source)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.dist)
    }

    /// Recolored SVGs: `dist/svg`.
    pub fn svg_dir(&self) -> PathBuf {
        self.dist_dir().join("svg")
    }

    /// Rasterized PNGs: `dist/png`.
    pub fn png_dir(&self) -> PathBuf {
        self.dist_dir().join("png")
    }

    /// Generated fonts: `dist/fonts`.
    pub fn fonts_dir(&self) -> PathBuf {
        self.dist_dir().join("fonts")
    }

    pub fn css_dir(&self) -> PathBuf {
        self.dist_dir().join("css")
    }

    pub fn demo_dir(&self) -> PathBuf {
        self.dist_dir().join("demo")
    }

    /// User templates overriding the bundled ones.
    pub fn templates_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.templates)
    }

    /// Directory the archive is written to.
    pub fn archive_dir(&self) -> PathBuf {
        self.resolve(&self.config.paths.archive)
    }
}
