//! The set of parsed projects for one run
//!
//! A [`Corpus`] owns every descriptor plus the per-file parse failures and is
//! passed by value through the pipeline. Loading enforces unique identities:
//! a project whose GUID was already taken gets a path-derived one instead.

use crate::discovery::CorpusSource;
use crate::project::parse_project;
use rayon::prelude::*;
use slngen_config::DiscoverySettings;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::{BuildConfiguration, IdOrigin, ProjectDescriptor, ProjectId};
use slngen_core::utils::path::path_key;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// How project files are parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorpusOptions {
    /// Parse on a worker pool
    pub parallel: bool,
    /// Worker count, 0 picks the number of CPUs
    pub jobs: usize,
}

/// A project file that could not be parsed
#[derive(Debug)]
pub struct ParseFailure {
    pub path: PathBuf,
    pub error: SlnError,
}

/// Parsed projects of one run
#[derive(Debug, Default)]
pub struct Corpus {
    projects: Vec<ProjectDescriptor>,
    failures: Vec<ParseFailure>,
    implied_configurations: Vec<BuildConfiguration>,
    diagnostics: Diagnostics,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
        }
    }
}

impl From<&DiscoverySettings> for CorpusOptions {
    fn from(settings: &DiscoverySettings) -> Self {
        Self {
            parallel: settings.parallel,
            jobs: settings.jobs,
        }
    }
}

impl Corpus {
    /// Parse every candidate of `source`
    pub fn load(source: &dyn CorpusSource, options: &CorpusOptions) -> SlnResult<Self> {
        let paths = source.candidate_paths()?;
        info!("Parsing {} project files from {}", paths.len(), source.describe());

        let results = parse_all(&paths, options);

        let mut projects = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        let mut diagnostics = source.diagnostics();
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(project) => projects.push(project),
                Err(error) => {
                    warn!("{}", error);
                    diagnostics.record_error(
                        DiagnosticKind::ParseFailed,
                        path.display().to_string(),
                        &error,
                    );
                    failures.push(ParseFailure { path, error });
                },
            }
        }

        let mut corpus = Self::from_descriptors(projects);
        diagnostics.extend(std::mem::take(&mut corpus.diagnostics));
        corpus.diagnostics = diagnostics;
        corpus.failures = failures;
        corpus.implied_configurations = source.implied_configurations();
        Ok(corpus)
    }

    /// Build a corpus from already parsed descriptors, in the given order
    pub fn from_descriptors(mut projects: Vec<ProjectDescriptor>) -> Self {
        let mut diagnostics = Diagnostics::new();
        assign_unique_ids(&mut projects, &mut diagnostics);
        report_duplicate_names(&projects, &mut diagnostics);

        for project in &projects {
            for unknown in &project.unknown_references {
                diagnostics.record(
                    DiagnosticKind::UnknownReferenceKind,
                    project.name.clone(),
                    format!("{} is neither a project nor an assembly reference", unknown),
                );
            }
            for warning in &project.warnings {
                diagnostics.record(DiagnosticKind::ProjectWarning, project.name.clone(), warning.clone());
            }
        }

        Self {
            projects,
            diagnostics,
            ..Self::default()
        }
    }

    pub fn projects(&self) -> &[ProjectDescriptor] {
        &self.projects
    }

    pub fn failures(&self) -> &[ParseFailure] {
        &self.failures
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Configurations the corpus source asks for in addition to the requested one
    pub fn implied_configurations(&self) -> &[BuildConfiguration] {
        &self.implied_configurations
    }

    /// Look up a project by path, ignoring case
    pub fn find_by_path(&self, path: &Path) -> Option<&ProjectDescriptor> {
        let key = path_key(path);
        self.projects.iter().find(|p| path_key(&p.path) == key)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Split into descriptors and the diagnostics gathered while loading
    pub fn into_parts(self) -> (Vec<ProjectDescriptor>, Diagnostics) {
        (self.projects, self.diagnostics)
    }
}

fn parse_all(paths: &[PathBuf], options: &CorpusOptions) -> Vec<SlnResult<ProjectDescriptor>> {
    if options.parallel && paths.len() > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(options.jobs).build() {
            Ok(pool) => {
                return pool.install(|| paths.par_iter().map(|path| parse_project(path)).collect())
            },
            Err(e) => warn!("Falling back to sequential parsing: {}", e),
        }
    }
    paths.iter().map(|path| parse_project(path)).collect()
}

/// Give every project after the first holder of a GUID a path-derived identity
fn assign_unique_ids(projects: &mut [ProjectDescriptor], diagnostics: &mut Diagnostics) {
    let mut owners: HashMap<ProjectId, PathBuf> = HashMap::new();

    for project in projects.iter_mut() {
        if let Some(owner) = owners.get(&project.id) {
            let original = project.id;
            let mut replacement = ProjectId::from_path(&project.path);
            let mut salt = 0usize;
            while owners.contains_key(&replacement) {
                salt += 1;
                replacement = ProjectId::from_key(&format!("{}#{}", path_key(&project.path), salt));
            }

            warn!(
                "{} reuses GUID {} of {}",
                project.path.display(),
                original,
                owner.display()
            );
            diagnostics.record(
                DiagnosticKind::DuplicateIdentity,
                project.path.display().to_string(),
                format!(
                    "GUID {} is already used by {}; using {}",
                    original,
                    owner.display(),
                    replacement
                ),
            );
            project.id = replacement;
            project.id_origin = IdOrigin::Synthesized;
        }
        owners.insert(project.id, project.path.clone());
    }
}

fn report_duplicate_names(projects: &[ProjectDescriptor], diagnostics: &mut Diagnostics) {
    let mut by_name: HashMap<String, Vec<&ProjectDescriptor>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for project in projects {
        let key = project.name.to_lowercase();
        let entry = by_name.entry(key.clone()).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(project);
    }

    for key in order {
        let holders = &by_name[&key];
        if holders.len() > 1 {
            let paths: Vec<String> = holders.iter().map(|p| p.path.display().to_string()).collect();
            diagnostics.record(
                DiagnosticKind::DuplicateName,
                holders[0].name.clone(),
                format!("{} projects share this name: {}", holders.len(), paths.join(", ")),
            );
        }
    }
}
