//! `slngen FindOrphans` command implementation.

use super::CommandContext;
use serde::Serialize;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::SlnResult;
use slngen_core::utils::path::relative_msbuild_path;
use slngen_msbuild::orphans::total_orphans;
use slngen_msbuild::{Corpus, DirectoryDiscovery, OrphanFinder};
use std::path::Path;
use tracing::warn;

/// What an orphan run found and fixed
#[derive(Debug, Serialize)]
pub struct OrphanSummary {
    pub found: usize,
    pub projects: usize,
    pub fixed: usize,
}

/// Execute the `slngen FindOrphans` command
pub fn execute(search_dir: &Path, fix: bool, ctx: &CommandContext) -> SlnResult<(OrphanSummary, Diagnostics)> {
    let search_dir = ctx.resolve(search_dir);
    let source = DirectoryDiscovery::new(&search_dir, ctx.config.discovery.clone())?;
    let (projects, mut diagnostics) = Corpus::load(&source, &ctx.corpus_options())?.into_parts();

    let finder = OrphanFinder::new(&ctx.config.discovery, &ctx.config.orphans);
    let reports = finder.find(&projects);

    for report in &reports {
        ctx.output.info(&format!("{} ({}):", report.name, report.project.display()));
        let directory = report.project.parent().unwrap_or(source.root());
        for orphan in &report.orphans {
            ctx.output.info(&format!("  {}", relative_msbuild_path(orphan, directory)));
        }
    }

    let found = total_orphans(&reports);
    ctx.output.step(&format!("Found {} orphaned files", found));

    let mut fixed = 0;
    if fix {
        for report in &reports {
            match finder.fix(report) {
                Ok(added) => fixed += added,
                Err(error) => {
                    warn!("{}", error);
                    diagnostics.record_error(DiagnosticKind::FixFailed, report.name.clone(), &error);
                },
            }
        }
        ctx.output.success(&format!("Declared {} files in their projects", fixed));
    }

    let summary = OrphanSummary {
        found,
        projects: reports.len(),
        fixed,
    };
    Ok((summary, diagnostics))
}
