//! In-memory file representation flowing through the stages.
//!
//! An [`Asset`] is read once from disk, handed to exactly one stage and
//! replaced by new assets derived from it. Deriving keeps the naming lineage:
//! the original path and the directory relative to the source root travel
//! with every generated file so outputs land in the mirrored sub-directory.

use std::fs;
use std::path::{Path, PathBuf};

use glob::glob;
use log::debug;

use crate::error::{Error, Result, Stage};

/// A single file plus the metadata needed to name its derivatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path the lineage started from (the source icon).
    pub origin: PathBuf,

    /// Directory relative to the discovery root, empty for top-level files.
    pub relative_dir: PathBuf,

    /// Current basename without extension.
    pub stem: String,

    /// Current extension without the dot.
    pub extension: String,

    /// File contents.
    pub contents: Vec<u8>,
}

impl Asset {
    /// Reads a file found under `root`.
    pub fn read(stage: Stage, root: &Path, path: &Path) -> Result<Self> {
        let contents = fs::read(path).map_err(|e| Error::io(stage, path, e))?;
        let relative_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            origin: path.to_path_buf(),
            relative_dir,
            stem: file_stem(path),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            contents,
        })
    }

    /// Creates an asset with no source file behind it (fonts, rendered templates).
    pub fn generated(file_name: &str, contents: Vec<u8>) -> Self {
        let path = Path::new(file_name);
        Self {
            origin: path.to_path_buf(),
            relative_dir: PathBuf::new(),
            stem: file_stem(path),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default(),
            contents,
        }
    }

    /// Derives a new asset with a new name and contents, keeping the lineage.
    pub fn derive(&self, stem: impl Into<String>, extension: &str, contents: Vec<u8>) -> Self {
        Self {
            origin: self.origin.clone(),
            relative_dir: self.relative_dir.clone(),
            stem: stem.into(),
            extension: extension.to_string(),
            contents,
        }
    }

    /// `stem.extension`.
    pub fn file_name(&self) -> String {
        if self.extension.is_empty() {
            self.stem.clone()
        } else {
            format!("{}.{}", self.stem, self.extension)
        }
    }

    /// Where this asset lands under `out_dir`.
    pub fn destination(&self, out_dir: &Path) -> PathBuf {
        out_dir.join(&self.relative_dir).join(self.file_name())
    }

    /// Writes the asset under `out_dir`, creating directories as needed.
    pub fn write_to(&self, stage: Stage, out_dir: &Path) -> Result<PathBuf> {
        let dest = self.destination(out_dir);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(stage, parent, e))?;
        }
        fs::write(&dest, &self.contents).map_err(|e| Error::io(stage, &dest, e))?;
        debug!("[{stage}] wrote {}", dest.display());
        Ok(dest)
    }

    /// Like [`Asset::write_to`], but leaves an identical existing file alone so
    /// its modification time survives a rebuild. Returns the destination and
    /// whether it was written.
    pub fn write_if_changed(&self, stage: Stage, out_dir: &Path) -> Result<(PathBuf, bool)> {
        let dest = self.destination(out_dir);
        match fs::read(&dest) {
            Ok(existing) if existing == self.contents => {
                debug!("[{stage}] {} unchanged", dest.display());
                Ok((dest, false))
            }
            _ => self.write_to(stage, out_dir).map(|dest| (dest, true)),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Discovery
// ============================================================================

/// Lists files under `root` matching `pattern`, sorted.
///
/// A missing root yields no files rather than an error; a directory that
/// cannot be read is an error.
pub fn discover(stage: Stage, root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        pattern
    );
    let paths = glob(&full_pattern).map_err(|source| Error::Pattern {
        stage,
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(Error::io(stage, path, e.into_error()));
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Discovers and reads every file matching `pattern` under `root`.
pub fn read_all(stage: Stage, root: &Path, pattern: &str) -> Result<Vec<Asset>> {
    discover(stage, root, pattern)?
        .iter()
        .map(|path| Asset::read(stage, root, path))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
