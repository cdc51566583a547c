//! Error types shared by every stage of the build.
//!
//! Each stage error carries the [`Stage`] it came from and, where one exists,
//! the asset path involved, so a failed build always reports what broke and
//! on which file.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The pipeline stage an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Recolor,
    Rasterize,
    Font,
    Archive,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Recolor => "recolor",
            Stage::Rasterize => "rasterize",
            Stage::Font => "font",
            Stage::Archive => "archive",
        })
    }
}

/// Configuration or package metadata could not be loaded.
///
/// Always raised before any stage runs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse package metadata {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration:\n{}", .0.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Any failure that aborts a build.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("[{stage}] {}: {source}", path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A conversion engine rejected an input.
    #[error("[{stage}] {}: {message}", path.display())]
    Engine {
        stage: Stage,
        path: PathBuf,
        message: String,
    },

    #[error("[{stage}] invalid pattern `{pattern}`: {source}")]
    Pattern {
        stage: Stage,
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("[font] the font engine finished without emitting glyph metadata")]
    MissingGlyphs,

    #[error("[font] failed to render template `{template}`: {source}")]
    Template {
        template: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    #[error("[archive] {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("unknown task `{0}`")]
    UnknownTask(String),
}

impl Error {
    pub(crate) fn io(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn engine(stage: Stage, path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        Self::Engine {
            stage,
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// The stage the error was raised in, if it came from a stage.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Io { stage, .. } | Error::Engine { stage, .. } | Error::Pattern { stage, .. } => {
                Some(*stage)
            }
            Error::MissingGlyphs | Error::Template { .. } => Some(Stage::Font),
            Error::Archive(_) => Some(Stage::Archive),
            Error::Config(_) | Error::UnknownTask(_) => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
