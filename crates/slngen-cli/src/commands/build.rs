//! `slngen build` command implementation.
//!
//! Loads the corpus from the search directory or a build list, links it into
//! a dependency graph and writes the solution plus its DGML view. The two
//! outputs fail independently.

use super::CommandContext;
use serde::Serialize;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::BuildConfiguration;
use slngen_emit::{dgml_path, DgmlWriter, SolutionOptions, SolutionWriter};
use slngen_graph::DependencyGraph;
use slngen_msbuild::{AuthoritativeBuildList, Corpus, CorpusSource, DirectoryDiscovery, ManifestList};
use std::path::PathBuf;
use tracing::warn;

/// Positional arguments of `slngen build`
#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub search_dir: PathBuf,
    pub output: PathBuf,
    pub configuration: String,
    pub platform: String,
    pub build_list: Option<PathBuf>,
    pub items_name: Option<String>,
}

/// What a build run produced
#[derive(Debug, Serialize)]
pub struct BuildSummary {
    pub projects: usize,
    pub dependencies: usize,
    pub unresolved: usize,
    pub cycles: usize,
    /// Solution file, when written
    pub solution: Option<PathBuf>,
    /// DGML file, when written
    pub dgml: Option<PathBuf>,
}

/// Execute the `slngen build` command
pub fn execute(args: BuildArgs, ctx: &CommandContext) -> SlnResult<(BuildSummary, Diagnostics)> {
    let search_dir = ctx.resolve(&args.search_dir);
    if !search_dir.is_dir() {
        return Err(SlnError::not_found("Search directory", &search_dir));
    }

    let source: Box<dyn CorpusSource> = match &args.build_list {
        Some(list) => {
            let items_name = args
                .items_name
                .clone()
                .unwrap_or_else(|| ctx.config.build_list.items_name.clone());
            let list = AuthoritativeBuildList::load(&ctx.resolve(list), &items_name)?;
            Box::new(ManifestList::new(list))
        },
        None => Box::new(DirectoryDiscovery::new(&search_dir, ctx.config.discovery.clone())?),
    };

    ctx.output.step(&format!("Loading projects from {}", source.describe()));
    let corpus = Corpus::load(source.as_ref(), &ctx.corpus_options())?;
    let implied = corpus.implied_configurations().to_vec();
    let (projects, mut diagnostics) = corpus.into_parts();

    let graph = DependencyGraph::build(projects);
    graph.report(&mut diagnostics);
    for cycle in graph.cycles() {
        ctx.output.warn(&format!("Circular dependency: {}", graph.format_cycle(cycle)));
    }

    let requested = BuildConfiguration::new(args.configuration, args.platform);
    let options = SolutionOptions::new(&search_dir, requested, &ctx.config.solution).with_implied(&implied);

    let solution_path = ctx.resolve(&args.output);
    let solution = match SolutionWriter::new(&graph, &options).write(&solution_path, &mut diagnostics) {
        Ok(()) => {
            ctx.output.success(&format!(
                "Wrote {} ({} projects, {} dependencies)",
                solution_path.display(),
                graph.project_count(),
                graph.dependency_count()
            ));
            Some(solution_path.clone())
        },
        Err(error) => {
            warn!("{}", error);
            diagnostics.record_error(DiagnosticKind::WriteFailed, solution_path.display().to_string(), &error);
            None
        },
    };

    let graph_path = dgml_path(&search_dir, &solution_path);
    let dgml = match DgmlWriter::new(&graph).write(&graph_path) {
        Ok(()) => {
            ctx.output.success(&format!("Wrote {}", graph_path.display()));
            Some(graph_path)
        },
        Err(error) => {
            warn!("{}", error);
            diagnostics.record_error(DiagnosticKind::WriteFailed, graph_path.display().to_string(), &error);
            None
        },
    };

    let summary = BuildSummary {
        projects: graph.project_count(),
        dependencies: graph.dependency_count(),
        unresolved: graph.unresolved().len(),
        cycles: graph.cycles().len(),
        solution,
        dgml,
    };
    Ok((summary, diagnostics))
}
