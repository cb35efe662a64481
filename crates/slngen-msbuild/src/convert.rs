//! Project reference ⇄ assembly reference conversion
//!
//! Converting to assembly references replaces each `ProjectReference` with a
//! `Reference` whose hint path points at the referenced project's expected
//! build output. Converting back maps assembly names onto the projects of an
//! authoritative list. Both directions rewrite only the reference elements
//! and leave the rest of each file as it was.

use crate::edit::{indent_unit, indentation_at, line_ending, TextEdits};
use crate::project::{groups, parse_project};
use crate::xml::{XmlDocument, XmlElement};
use quick_xml::escape::escape;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::{BuildConfiguration, ProjectDescriptor, Reference};
use slngen_core::utils::path::{path_key, relative_msbuild_path};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome for one project file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub project: PathBuf,
    /// References rewritten
    pub converted: usize,
    /// References left unchanged because they could not be mapped
    pub skipped: usize,
}

/// Rewrites references between the two forms
#[derive(Debug, Clone)]
pub struct ReferenceConverter {
    configuration: BuildConfiguration,
}

/// Referenced projects parsed on demand during one conversion run
struct TargetCache<'a> {
    known: HashMap<String, &'a ProjectDescriptor>,
    parsed: HashMap<String, Result<ProjectDescriptor, String>>,
}

impl<'a> TargetCache<'a> {
    fn new(projects: &'a [ProjectDescriptor]) -> Self {
        Self {
            known: projects.iter().map(|p| (path_key(&p.path), p)).collect(),
            parsed: HashMap::new(),
        }
    }

    fn get(&mut self, path: &Path) -> Result<&ProjectDescriptor, String> {
        let key = path_key(path);
        if let Some(project) = self.known.get(&key) {
            return Ok(*project);
        }
        self.parsed
            .entry(key)
            .or_insert_with(|| parse_project(path).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Layout of the file being edited
struct Layout<'s> {
    newline: &'static str,
    unit: String,
    source: &'s str,
}

impl<'s> Layout<'s> {
    fn of(source: &'s str) -> Self {
        Self {
            newline: line_ending(source),
            unit: indent_unit(source),
            source,
        }
    }

    /// Render an element with metadata children, indented like `replaced`
    fn element(&self, replaced: &XmlElement, name: &str, include: &str, metadata: &[(&str, String)]) -> String {
        let indent = indentation_at(self.source, replaced.span.start);
        let mut text = format!("<{} Include=\"{}\">", name, escape(include));
        for (key, value) in metadata {
            text.push_str(&format!(
                "{}{}{}<{}>{}</{}>",
                self.newline,
                indent,
                self.unit,
                key,
                escape(value.as_str()),
                key
            ));
        }
        text.push_str(&format!("{}{}</{}>", self.newline, indent, name));
        text
    }
}

impl ReferenceConverter {
    /// Create a converter computing output paths for `configuration`
    pub fn new(configuration: BuildConfiguration) -> Self {
        Self { configuration }
    }

    /// Replace project references with assembly references in every project
    pub fn to_assembly_references(
        &self,
        projects: &[ProjectDescriptor],
        diagnostics: &mut Diagnostics,
    ) -> Vec<ConversionReport> {
        let mut cache = TargetCache::new(projects);
        let reports: Vec<ConversionReport> = projects
            .iter()
            .filter_map(|project| {
                match self.project_to_assembly(project, &mut cache, diagnostics) {
                    Ok(report) => Some(report),
                    Err(error) => {
                        warn!("{}", error);
                        diagnostics.record_error(failure_kind(&error), project.name.clone(), &error);
                        None
                    },
                }
            })
            .collect();
        log_summary("assembly", &reports);
        reports
    }

    fn project_to_assembly(
        &self,
        project: &ProjectDescriptor,
        cache: &mut TargetCache<'_>,
        diagnostics: &mut Diagnostics,
    ) -> SlnResult<ConversionReport> {
        let document = XmlDocument::load(&project.path)?;
        let layout = Layout::of(document.source());
        let mut edits = TextEdits::new();
        let mut report = ConversionReport {
            project: project.path.clone(),
            converted: 0,
            skipped: 0,
        };

        for item in groups(&document.root, "ItemGroup")
            .into_iter()
            .flat_map(|group| group.children_named("ProjectReference"))
        {
            let Some(include) = item.attr("Include") else {
                continue;
            };
            let target_path = project.resolve_include(include);

            let replacement = cache.get(&target_path).and_then(|target| {
                let output = target.expected_output(&self.configuration).ok_or_else(|| {
                    format!(
                        "expected output of {} cannot be computed for {}",
                        target.name, self.configuration
                    )
                })?;
                let hint_path = relative_msbuild_path(&output, project.directory());
                Ok(layout.element(
                    item,
                    "Reference",
                    &target.assembly_name,
                    &[("HintPath", hint_path)],
                ))
            });

            match replacement {
                Ok(text) => {
                    edits.replace(item.span, text);
                    report.converted += 1;
                },
                Err(reason) => {
                    report.skipped += 1;
                    record_skip(diagnostics, project, include, reason);
                },
            }
        }

        if !edits.is_empty() {
            debug!("Converting {} references in {}", report.converted, project.path.display());
            document.write(&edits.apply(document.source()))?;
        }
        Ok(report)
    }

    /// Replace assembly references with project references between listed projects
    pub fn to_project_references(
        &self,
        projects: &[ProjectDescriptor],
        diagnostics: &mut Diagnostics,
    ) -> Vec<ConversionReport> {
        let by_assembly = assembly_index(projects, diagnostics);
        let reports: Vec<ConversionReport> = projects
            .iter()
            .filter_map(|project| match project_to_project(project, &by_assembly) {
                Ok(report) => Some(report),
                Err(error) => {
                    warn!("{}", error);
                    diagnostics.record_error(failure_kind(&error), project.name.clone(), &error);
                    None
                },
            })
            .collect();
        log_summary("project", &reports);
        reports
    }
}

/// Map lowercase assembly names to listed projects; ambiguous names are left out
fn assembly_index<'a>(
    projects: &'a [ProjectDescriptor],
    diagnostics: &mut Diagnostics,
) -> HashMap<String, &'a ProjectDescriptor> {
    let mut index: HashMap<String, &ProjectDescriptor> = HashMap::new();
    let mut ambiguous: Vec<String> = Vec::new();

    for project in projects {
        let key = project.assembly_name.to_lowercase();
        if let Some(existing) = index.get(&key) {
            if !ambiguous.contains(&key) {
                diagnostics.record(
                    DiagnosticKind::ConversionSkipped,
                    project.assembly_name.clone(),
                    format!(
                        "assembly name is produced by both {} and {}; its references are not converted",
                        existing.path.display(),
                        project.path.display()
                    ),
                );
                ambiguous.push(key);
            }
        } else {
            index.insert(key, project);
        }
    }

    for key in &ambiguous {
        index.remove(key);
    }
    index
}

fn project_to_project(
    project: &ProjectDescriptor,
    by_assembly: &HashMap<String, &ProjectDescriptor>,
) -> SlnResult<ConversionReport> {
    let document = XmlDocument::load(&project.path)?;
    let layout = Layout::of(document.source());
    let mut edits = TextEdits::new();
    let own_key = path_key(&project.path);

    for item in groups(&document.root, "ItemGroup")
        .into_iter()
        .flat_map(|group| group.children_named("Reference"))
    {
        let Some(include) = item.attr("Include") else {
            continue;
        };
        let name = Reference::assembly(include).assembly_name().to_lowercase();
        let Some(target) = by_assembly.get(&name) else {
            continue;
        };
        if path_key(&target.path) == own_key {
            continue;
        }

        let relative = relative_msbuild_path(&target.path, project.directory());
        edits.replace(
            item.span,
            layout.element(
                item,
                "ProjectReference",
                &relative,
                &[("Project", target.id.to_string()), ("Name", target.name.clone())],
            ),
        );
    }

    let converted = edits.len();
    if converted > 0 {
        debug!("Converting {} references in {}", converted, project.path.display());
        document.write(&edits.apply(document.source()))?;
    }
    Ok(ConversionReport {
        project: project.path.clone(),
        converted,
        skipped: 0,
    })
}

fn record_skip(diagnostics: &mut Diagnostics, project: &ProjectDescriptor, include: &str, reason: String) {
    let error = SlnError::Conversion {
        project: project.path.clone(),
        reason: format!("{}: {}", include, reason),
    };
    warn!("{}", error);
    diagnostics.record_error(DiagnosticKind::ConversionSkipped, project.name.clone(), &error);
}

/// Diagnostic kind of a failure that stopped a whole project
fn failure_kind(error: &SlnError) -> DiagnosticKind {
    match error {
        SlnError::Parse { .. } => DiagnosticKind::ParseFailed,
        _ => DiagnosticKind::WriteFailed,
    }
}

fn log_summary(direction: &str, reports: &[ConversionReport]) {
    let converted: usize = reports.iter().map(|r| r.converted).sum();
    let changed = reports.iter().filter(|r| r.converted > 0).count();
    info!("Converted {} references to {} references in {} projects", converted, direction, changed);
}
