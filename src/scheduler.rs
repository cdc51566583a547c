//! Task graph construction and phased execution.
//!
//! The graph is derived from configuration once: one recolor task per color,
//! one rasterize task per size, one font task and one archive task. Tasks are
//! grouped into phases:
//!
//! 1. every recolor task and the font task
//! 2. every rasterize task
//! 3. the archive task
//!
//! Tasks inside a phase run in parallel on the rayon pool. A phase starts
//! only after every task of the previous one has finished, and the first
//! error stops the build before the next phase begins.

use std::fmt;
use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::context::BuildContext;
use crate::error::{Error, Result};
use crate::stage::font::FontEngine;
use crate::stage::ttf_font::TrueTypeEngine;
use crate::stage::{self, StageReport};

// ============================================================================
// Tasks
// ============================================================================

/// One unit of work in the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Recolor { key: String, color: String },
    Rasterize { key: String, width: u32 },
    Font,
    Archive,
}

impl Task {
    /// Name used on the command line: `recolor-red`, `rasterize-small`,
    /// `font`, `archive`.
    pub fn name(&self) -> String {
        match self {
            Task::Recolor { key, .. } => format!("recolor-{key}"),
            Task::Rasterize { key, .. } => format!("rasterize-{key}"),
            Task::Font => "font".to_string(),
            Task::Archive => "archive".to_string(),
        }
    }

    fn run(&self, ctx: &BuildContext, engine: &dyn FontEngine) -> Result<StageReport> {
        match self {
            Task::Recolor { key, color } => stage::recolor::run(ctx, key, color),
            Task::Rasterize { key, width } => stage::rasterize::run(ctx, key, *width),
            Task::Font => stage::font::run(ctx, engine),
            Task::Archive => stage::archive::run(ctx),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Recolor { color, .. } => write!(f, "{} ({color})", self.name()),
            Task::Rasterize { width, .. } => write!(f, "{} ({width}px)", self.name()),
            Task::Font | Task::Archive => f.write_str(&self.name()),
        }
    }
}

/// Tasks that may run concurrently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phase {
    pub tasks: Vec<Task>,
}

// ============================================================================
// Task Graph
// ============================================================================

/// The ordered phases of a full build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    phases: Vec<Phase>,
}

impl TaskGraph {
    /// Builds the graph for a context's configuration.
    ///
    /// Keys are visited in sorted order so the graph is the same on every run.
    pub fn from_context(ctx: &BuildContext) -> Self {
        let config = ctx.config();

        let mut first = Phase::default();
        first
            .tasks
            .extend(config.colors.iter().map(|(key, color)| Task::Recolor {
                key: key.clone(),
                color: color.clone(),
            }));
        first.tasks.push(Task::Font);

        let second = Phase {
            tasks: config
                .sizes
                .iter()
                .map(|(key, &width)| Task::Rasterize {
                    key: key.clone(),
                    width,
                })
                .collect(),
        };

        let third = Phase {
            tasks: vec![Task::Archive],
        };

        Self {
            phases: vec![first, second, third],
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.phases.iter().flat_map(|p| p.tasks.iter())
    }

    /// Looks a task up by its command-line name.
    pub fn find(&self, name: &str) -> Option<&Task> {
        self.tasks().find(|t| t.name() == name)
    }
}

impl fmt::Display for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, phase) in self.phases.iter().enumerate() {
            writeln!(f, "phase {}:", i + 1)?;
            for task in &phase.tasks {
                writeln!(f, "  {task}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs a [`TaskGraph`] against a [`BuildContext`].
pub struct Pipeline {
    ctx: BuildContext,
    graph: TaskGraph,
    engine: Box<dyn FontEngine>,
}

impl Pipeline {
    /// Creates a pipeline using the bundled [`TrueTypeEngine`].
    pub fn new(ctx: BuildContext) -> Self {
        let graph = TaskGraph::from_context(&ctx);
        Self {
            ctx,
            graph,
            engine: Box::new(TrueTypeEngine),
        }
    }

    /// Replaces the font engine.
    pub fn with_font_engine(mut self, engine: impl FontEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Runs every phase in order.
    ///
    /// Returns the reports of all tasks, phase by phase.
    pub fn build(&self) -> Result<Vec<StageReport>> {
        let start = Instant::now();
        let mut reports = Vec::new();

        for (i, phase) in self.graph.phases().iter().enumerate() {
            info!("phase {}: {} task(s)", i + 1, phase.tasks.len());
            reports.extend(self.run_phase(phase)?);
        }

        let written: usize = reports.iter().map(|r| r.written.len()).sum();
        info!("build finished: {written} files in {:?}", start.elapsed());
        Ok(reports)
    }

    fn run_phase(&self, phase: &Phase) -> Result<Vec<StageReport>> {
        phase
            .tasks
            .par_iter()
            .map(|task| self.execute(task))
            .collect()
    }

    fn execute(&self, task: &Task) -> Result<StageReport> {
        info!("starting {task}");
        task.run(&self.ctx, self.engine.as_ref())
    }

    /// Runs one task by name, ignoring phase ordering.
    pub fn run_task(&self, name: &str) -> Result<StageReport> {
        let task = self
            .graph
            .find(name)
            .ok_or_else(|| Error::UnknownTask(name.to_string()))?;
        self.execute(task)
    }

    /// Runs tasks by name one after another, stopping at the first failure.
    ///
    /// Every name is checked before anything runs.
    pub fn run_tasks<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<StageReport>> {
        let tasks = names
            .iter()
            .map(|name| {
                self.graph
                    .find(name.as_ref())
                    .ok_or_else(|| Error::UnknownTask(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        tasks.into_iter().map(|task| self.execute(task)).collect()
    }
}
