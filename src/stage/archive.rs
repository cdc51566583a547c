//! Archive stage: zip the project tree into `<fontName>-<version>.zip`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use glob::{MatchOptions, Pattern};
use log::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::StageReport;
use crate::asset;
use crate::context::BuildContext;
use crate::error::{Error, Result, Stage};
use crate::naming;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compiled exclusion patterns, matched against root-relative paths.
#[derive(Debug, Clone)]
pub struct Exclusions {
    patterns: Vec<Pattern>,
}

impl Exclusions {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|source| Error::Pattern {
                    stage: Stage::Archive,
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// Adds an exact path, escaped so it matches only itself.
    pub fn with_path(mut self, relative: &Path) -> Self {
        if let Ok(pattern) = Pattern::new(&Pattern::escape(&entry_name(relative))) {
            self.patterns.push(pattern);
        }
        self
    }

    /// True if `relative` or any of its parent directories matches.
    pub fn is_excluded(&self, relative: &Path) -> bool {
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| {
                let name = entry_name(p);
                self.patterns
                    .iter()
                    .any(|pattern| pattern.matches_with(&name, MATCH_OPTIONS))
            })
    }
}

/// Zip entry name: `/`-separated, no leading `./`.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Every file under `root` not excluded, as sorted root-relative paths.
pub fn collect(root: &Path, exclusions: &Exclusions) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = asset::discover(Stage::Archive, root, "**/*")?
        .into_iter()
        .filter_map(|path| path.strip_prefix(root).ok().map(Path::to_path_buf))
        .filter(|relative| {
            let skip = exclusions.is_excluded(relative);
            if skip {
                debug!("[archive] excluding {}", relative.display());
            }
            !skip
        })
        .collect();
    files.sort_by_key(|p| entry_name(p));
    Ok(files)
}

/// Writes `files` (relative to `root`) into a zip at `output`.
///
/// Entries carry a fixed timestamp so the archive depends only on the file
/// contents.
pub fn write_archive(root: &Path, files: &[PathBuf], output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(Stage::Archive, parent, e))?;
    }
    let file = File::create(output).map_err(|e| Error::io(Stage::Archive, output, e))?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(file);
    for relative in files {
        let path = root.join(relative);
        let contents = fs::read(&path).map_err(|e| Error::io(Stage::Archive, &path, e))?;
        zip.start_file(entry_name(relative), options)?;
        zip.write_all(&contents)
            .map_err(|e| Error::io(Stage::Archive, output, e))?;
    }
    zip.finish()?;
    Ok(())
}

/// Packages the project into `<paths.archive>/<fontName>-<version>.zip`.
pub fn run(ctx: &BuildContext) -> Result<StageReport> {
    let start = Instant::now();
    let mut report = StageReport::new("archive".to_string());

    let root = ctx.project_root();
    let output = ctx
        .archive_dir()
        .join(naming::archive_name(&ctx.config().font.name, ctx.version()));

    let mut exclusions = Exclusions::new(ctx.config().archive.exclude.as_slice())?;
    if let Ok(relative) = output.strip_prefix(root) {
        exclusions = exclusions.with_path(relative);
    }

    let files = collect(root, &exclusions)?;
    write_archive(root, &files, &output)?;

    report.duration = start.elapsed();
    info!(
        "[archive] {} entries -> {} in {:?}",
        files.len(),
        output.display(),
        report.duration
    );
    report.written.push(output);
    Ok(report)
}
