//! `slngen ProjectRefConvert` command implementation.
//!
//! A directory argument converts every project reference below it into an
//! assembly reference. A build list argument converts assembly references
//! between the listed projects back into project references.

use super::CommandContext;
use serde::Serialize;
use slngen_core::diagnostics::Diagnostics;
use slngen_core::error::{SlnError, SlnResult};
use slngen_msbuild::{AuthoritativeBuildList, ConversionReport, Corpus, DirectoryDiscovery, ManifestList, ReferenceConverter};
use std::path::Path;

/// Direction of a conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToAssembly,
    ToProject,
}

/// What a conversion run changed
#[derive(Debug, Serialize)]
pub struct ConvertSummary {
    pub direction: Direction,
    pub projects: usize,
    pub converted: usize,
    pub skipped: usize,
}

/// Execute the `slngen ProjectRefConvert` command
pub fn execute(
    target: &Path,
    items_name: Option<String>,
    ctx: &CommandContext,
) -> SlnResult<(ConvertSummary, Diagnostics)> {
    let target = ctx.resolve(target);
    let converter = ReferenceConverter::new(ctx.config.convert.build_configuration());

    let (direction, projects, mut diagnostics) = if target.is_dir() && items_name.is_none() {
        let source = DirectoryDiscovery::new(&target, ctx.config.discovery.clone())?;
        let (projects, diagnostics) = Corpus::load(&source, &ctx.corpus_options())?.into_parts();
        (Direction::ToAssembly, projects, diagnostics)
    } else {
        if items_name.is_none() && !target.exists() {
            return Err(SlnError::not_found("Search directory or build list", &target));
        }
        let items_name = items_name.unwrap_or_else(|| ctx.config.build_list.items_name.clone());
        let list = AuthoritativeBuildList::load(&target, &items_name)?;
        let source = ManifestList::new(list);
        let (projects, diagnostics) = Corpus::load(&source, &ctx.corpus_options())?.into_parts();
        (Direction::ToProject, projects, diagnostics)
    };

    ctx.output.step(&format!(
        "Converting {} projects {}",
        projects.len(),
        match direction {
            Direction::ToAssembly => "to assembly references",
            Direction::ToProject => "to project references",
        }
    ));

    let reports = match direction {
        Direction::ToAssembly => converter.to_assembly_references(&projects, &mut diagnostics),
        Direction::ToProject => converter.to_project_references(&projects, &mut diagnostics),
    };

    for report in reports.iter().filter(|r| r.converted > 0) {
        ctx.output.info(&format!(
            "  {}: {} converted",
            report.project.display(),
            report.converted
        ));
    }

    let summary = summarize(direction, &reports);
    ctx.output.success(&format!(
        "Converted {} references in {} projects ({} skipped)",
        summary.converted, summary.projects, summary.skipped
    ));
    Ok((summary, diagnostics))
}

fn summarize(direction: Direction, reports: &[ConversionReport]) -> ConvertSummary {
    ConvertSummary {
        direction,
        projects: reports.iter().filter(|r| r.converted > 0).count(),
        converted: reports.iter().map(|r| r.converted).sum(),
        skipped: reports.iter().map(|r| r.skipped).sum(),
    }
}
