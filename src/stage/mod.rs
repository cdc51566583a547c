//! The four build stages.
//!
//! Every stage exposes a `run` function taking the shared [`BuildContext`]
//! and returning a [`StageReport`]. Stages never share output paths, so any
//! number of them can run at once within a phase.
//!
//! [`BuildContext`]: crate::context::BuildContext

pub mod archive;
pub mod font;
mod outline;
pub mod rasterize;
pub mod recolor;
pub mod svg_font;
pub mod template;
pub mod ttf_font;

use std::path::PathBuf;
use std::time::Duration;

/// Summary of one finished task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Task name, e.g. `recolor-red`.
    pub task: String,
    /// Files written, in the order they were produced.
    pub written: Vec<PathBuf>,
    /// Outputs left alone because they were already up to date.
    pub skipped: usize,
    pub duration: Duration,
}

impl StageReport {
    pub fn new(task: String) -> Self {
        Self {
            task,
            ..Default::default()
        }
    }
}
