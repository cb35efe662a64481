//! # slngen
//!
//! Generates Visual Studio solution files with explicit build dependencies
//! from a tree of MSBuild project files.
//!
//! This is the main entry point for the slngen binary. It handles command
//! parsing, sets up logging and error handling, and dispatches to the
//! command handlers.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use slngen_core::error::SlnError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Solution and dependency graph generator for MSBuild project trees
#[derive(Parser)]
#[command(name = "slngen", version, about = "Generate solutions from MSBuild project trees")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file to use instead of the nearest slngen.toml
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of parser threads (0 = one per CPU)
    #[arg(long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Parse project files one at a time
    #[arg(long, global = true)]
    pub sequential: bool,

    /// What to do with projects lacking a requested configuration
    #[arg(
        long,
        global = true,
        value_name = "POLICY",
        value_parser = ["closest", "skip", "include"],
        ignore_case = true
    )]
    pub unsupported_config: Option<String>,

    /// Write run diagnostics as JSON to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a solution and a DGML graph for every project below a directory
    Build {
        /// Directory searched for project files
        search_dir: PathBuf,
        /// Solution file to write
        output: PathBuf,
        /// Solution configuration, e.g. Debug
        configuration: String,
        /// Solution platform, e.g. "Any CPU" or x64
        platform: String,
        /// MSBuild file listing the projects to include instead of searching
        build_list: Option<PathBuf>,
        /// Item name of the listed projects
        items_name: Option<String>,
    },
    /// Convert project references to assembly references below a directory,
    /// or assembly references back to project references for a build list
    #[command(name = "ProjectRefConvert", alias = "convert")]
    ProjectRefConvert {
        /// Directory to convert, or build list file
        target: PathBuf,
        /// Item name of the listed projects
        items_name: Option<String>,
    },
    /// Report source files that exist on disk but are not declared in their project
    #[command(name = "FindOrphans", alias = "orphans")]
    FindOrphans {
        /// Directory searched for project files
        search_dir: PathBuf,
        /// Pass `fix` to declare the orphans in their projects
        #[arg(value_enum, ignore_case = true)]
        mode: Option<OrphanMode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrphanMode {
    /// Add the missing items to the project files
    Fix,
}

impl Cli {
    /// Flags that override configuration values
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(jobs) = self.jobs {
            overrides.insert("jobs".to_string(), jobs.to_string());
        }
        if self.sequential {
            overrides.insert("parallel".to_string(), "false".to_string());
        }
        if let Some(policy) = &self.unsupported_config {
            overrides.insert("unsupported_config".to_string(), policy.clone());
        }
        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting slngen v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&error));
            if matches!(error, SlnError::InputNotFound { .. }) {
                eprintln!();
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::from(2)
        },
    }
}

fn run_cli(cli: Cli) -> Result<ExitCode, SlnError> {
    let overrides = cli.overrides();
    let ctx = CommandContext::new(cli.config.as_deref(), &overrides, cli.report.clone())?;

    let diagnostics = commands::dispatch_command(cli.command, &ctx)?;
    if diagnostics.has_errors() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = if verbose {
        EnvFilter::new(format!("slngen={}", level))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("slngen={}", level)))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("slngen encountered an unexpected error: {}", panic_info);
        eprintln!("slngen crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/slngen/slngen/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
