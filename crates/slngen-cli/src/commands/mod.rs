//! Command implementations and dispatch logic.
//!
//! Each command loads what it needs through the shared [`CommandContext`],
//! returns a serializable summary together with the run's diagnostics, and
//! leaves reporting to [`dispatch_command`].

use serde::Serialize;
use slngen_config::{ConfigLoader, SlnGenConfig};
use slngen_core::diagnostics::Diagnostics;
use slngen_core::error::{SlnError, SlnResult};
use slngen_msbuild::CorpusOptions;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod build;
pub mod convert;
pub mod orphans;

#[cfg(test)]
mod tests;

use crate::output::report::RunReport;
use crate::output::OutputHandler;
use crate::{Commands, OrphanMode};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub config: SlnGenConfig,
    /// Where to write the JSON run report, if requested
    pub report: Option<PathBuf>,
}

impl CommandContext {
    /// Resolve configuration from every layer and capture the working directory
    pub fn new(
        config_file: Option<&Path>,
        overrides: &HashMap<String, String>,
        report: Option<PathBuf>,
    ) -> SlnResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SlnError::io("Failed to get current directory".to_string(), e))?;
        let config = ConfigLoader::new(cwd.clone()).load(config_file, overrides)?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            config,
            report,
        })
    }

    /// Resolve a command-line path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }

    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions::from(&self.config.discovery)
    }
}

/// Dispatch a command to its handler and report its diagnostics
pub fn dispatch_command(command: Commands, ctx: &CommandContext) -> SlnResult<Diagnostics> {
    match command {
        Commands::Build {
            search_dir,
            output,
            configuration,
            platform,
            build_list,
            items_name,
        } => {
            info!("Generating {} for {}|{}", output.display(), configuration, platform);
            let args = build::BuildArgs {
                search_dir,
                output,
                configuration,
                platform,
                build_list,
                items_name,
            };
            let (summary, diagnostics) = build::execute(args, ctx)?;
            finish("build", &summary, diagnostics, ctx)
        },
        Commands::ProjectRefConvert { target, items_name } => {
            info!("Converting references for {}", target.display());
            let (summary, diagnostics) = convert::execute(&target, items_name, ctx)?;
            finish("ProjectRefConvert", &summary, diagnostics, ctx)
        },
        Commands::FindOrphans { search_dir, mode } => {
            let fix = mode == Some(OrphanMode::Fix);
            info!("Finding orphaned files below {} (fix: {})", search_dir.display(), fix);
            let (summary, diagnostics) = orphans::execute(&search_dir, fix, ctx)?;
            finish("FindOrphans", &summary, diagnostics, ctx)
        },
    }
}

/// Print diagnostics and write the run report
fn finish<S: Serialize>(
    command: &str,
    summary: &S,
    diagnostics: Diagnostics,
    ctx: &CommandContext,
) -> SlnResult<Diagnostics> {
    ctx.output.diagnostics(&diagnostics);
    if let Some(path) = &ctx.report {
        let path = ctx.resolve(path);
        RunReport::new(command, summary, &diagnostics).write(&path)?;
        ctx.output.info(&format!("Report written to {}", path.display()));
    }
    Ok(diagnostics)
}
