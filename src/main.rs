//! iconpack - build a distributable icon package from a folder of SVG icons

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{LevelFilter, error, info};

use iconpack::{BuildContext, ConfigError, Error, PackageMeta, Pipeline, StageReport, config};

/// iconpack - recolor, rasterize, font and archive a set of SVG icons
#[derive(Parser)]
#[command(name = "iconpack")]
#[command(version)]
struct Cli {
    /// Project root; every other path is relative to it
    #[arg(short = 'C', long, default_value = ".")]
    root: PathBuf,

    /// Configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Configuration used when the primary file does not exist
    #[arg(long, default_value = "config.example.toml")]
    fallback_config: PathBuf,

    /// Package metadata holding the version
    #[arg(long, default_value = "package.json")]
    package: PathBuf,

    /// Rebuild every PNG even if it is newer than its SVG
    #[arg(long)]
    force: bool,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline (default)
    Build,

    /// Run named tasks in order, e.g. `recolor-red rasterize-small`
    Run {
        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// List the tasks of the build, phase by phase
    Tasks,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.stage() {
                Some(stage) => error!("{stage} stage failed: {e}"),
                None => error!("{e}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level.as_str()))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let root = std::path::absolute(&cli.root).map_err(|source| {
        Error::Config(ConfigError::Io {
            path: cli.root.clone(),
            source,
        })
    })?;

    let configuration = config::load(&root.join(&cli.config), &root.join(&cli.fallback_config))?;
    let package = PackageMeta::load(&root.join(&cli.package))?;
    let ctx = BuildContext::new(configuration, package, &root).with_incremental(!cli.force);
    let pipeline = Pipeline::new(ctx);

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => {
            let reports = pipeline.build()?;
            summarize(&reports, &root);
        }
        Commands::Run { tasks } => {
            let reports = pipeline.run_tasks(&tasks)?;
            summarize(&reports, &root);
        }
        Commands::Tasks => print!("{}", pipeline.graph()),
    }
    Ok(())
}

fn summarize(reports: &[StageReport], root: &Path) {
    for report in reports {
        info!(
            "{}: {} written, {} skipped ({:?})",
            report.task,
            report.written.len(),
            report.skipped,
            report.duration
        );
        if report.task == "archive" {
            for path in &report.written {
                let shown = path.strip_prefix(root).unwrap_or(path);
                info!("package ready: {}", shown.display());
            }
        }
    }
}
