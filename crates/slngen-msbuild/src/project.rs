//! Project descriptor parser
//!
//! Reads the statically declared parts of a project file: identity, names,
//! output kind, configurations, output paths, references and source items.
//! Nothing is evaluated beyond simple `Condition` patterns and a handful of
//! name macros.

use crate::xml::{XmlDocument, XmlElement};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::{
    BuildConfiguration, IdOrigin, OutputKind, OutputPathEntry, ProjectDescriptor, ProjectId,
    Reference, ReferenceKind, SourceItem,
};
use std::path::Path;
use tracing::debug;

const DEFAULT_PLATFORM: &str = "AnyCPU";

/// Parse a project file from disk
pub fn parse_project(path: &Path) -> SlnResult<ProjectDescriptor> {
    debug!("Parsing {}", path.display());
    let document = XmlDocument::load(path)?;
    project_from_document(&document)
}

/// Parse project text as if it were read from `path`
pub fn parse_project_str(path: &Path, text: &str) -> SlnResult<ProjectDescriptor> {
    let document = XmlDocument::parse(path, text)?;
    project_from_document(&document)
}

/// Build a descriptor from an already parsed document
pub fn project_from_document(document: &XmlDocument) -> SlnResult<ProjectDescriptor> {
    let root = &document.root;
    if root.name != "Project" {
        return Err(SlnError::parse(
            document.path(),
            format!("root element is <{}>, expected <Project>", root.name),
        ));
    }

    let mut project = ProjectDescriptor::new(document.path().to_path_buf());
    project.sdk_style = root.attr("Sdk").is_some();

    let default_platform = default_platform(root);
    collect_configurations(root, &default_platform, &mut project);
    read_properties(root, &default_platform, &mut project);
    read_items(root, &mut project);

    debug!(
        "{}: {} references, {} items, {} configurations",
        project.name,
        project.references.len(),
        project.items.len(),
        project.configurations.len()
    );
    Ok(project)
}

/// Groups named `name` at the top level or inside `Choose`/`When`/`Otherwise`
pub(crate) fn groups<'a>(root: &'a XmlElement, name: &str) -> Vec<&'a XmlElement> {
    let mut result = Vec::new();
    collect_groups(root, name, &mut result);
    result
}

fn collect_groups<'a>(parent: &'a XmlElement, name: &str, result: &mut Vec<&'a XmlElement>) {
    for child in &parent.children {
        if child.name == name {
            result.push(child);
        } else if matches!(child.name.as_str(), "Choose" | "When" | "Otherwise") {
            collect_groups(child, name, result);
        }
    }
}

/// Remove whitespace and lowercase, for comparing condition text
fn squash(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches('\'').trim()
}

/// Extract the configuration a simple `Condition` selects.
///
/// Understands `'$(Configuration)|$(Platform)' == 'C|P'` and
/// `'$(Configuration)' == 'C'`; compound conditions yield `None`.
pub fn parse_condition(condition: &str, default_platform: &str) -> Option<BuildConfiguration> {
    let lowered = condition.to_ascii_lowercase();
    if lowered.contains(" and ") || lowered.contains(" or ") || lowered.contains("!=") {
        return None;
    }

    let (lhs, rhs) = condition.split_once("==")?;
    let value = unquote(rhs);
    if value.contains("$(") {
        return None;
    }

    match squash(unquote(lhs)).as_str() {
        "$(configuration)|$(platform)" => BuildConfiguration::parse(value),
        "$(configuration)" if !value.is_empty() => {
            Some(BuildConfiguration::new(value, default_platform))
        },
        _ => None,
    }
}

/// The `<Platform>` a project builds when none is requested
fn default_platform(root: &XmlElement) -> String {
    groups(root, "PropertyGroup")
        .into_iter()
        .flat_map(|group| group.children_named("Platform"))
        .find(|platform| {
            platform
                .attr("Condition")
                .map_or(true, |c| squash(c) == "'$(platform)'==''")
        })
        .map(|platform| platform.text.clone())
        .filter(|text| !text.is_empty() && !text.contains("$("))
        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string())
}

fn collect_configurations(root: &XmlElement, default_platform: &str, project: &mut ProjectDescriptor) {
    for element in root.descendants() {
        if element.name == "ProjectConfiguration" {
            if let Some(config) = element.attr("Include").and_then(BuildConfiguration::parse) {
                project.add_configuration(config);
            }
        }
        if let Some(condition) = element.attr("Condition") {
            if let Some(config) = parse_condition(condition, default_platform) {
                project.add_configuration(config);
            }
        }
    }
}

fn read_properties(root: &XmlElement, default_platform: &str, project: &mut ProjectDescriptor) {
    let mut assembly_name: Option<&str> = None;
    let mut target_name: Option<&str> = None;
    let mut output: Option<OutputKind> = None;

    for group in groups(root, "PropertyGroup") {
        let scope = group
            .attr("Condition")
            .and_then(|c| parse_condition(c, default_platform));

        for property in &group.children {
            let value = property.text.as_str();
            if value.is_empty() {
                continue;
            }
            match property.name.as_str() {
                "ProjectGuid" if project.id_origin == IdOrigin::Synthesized => {
                    match ProjectId::parse(value) {
                        Some(id) => {
                            project.id = id;
                            project.id_origin = IdOrigin::Declared;
                        },
                        None => project
                            .warnings
                            .push(format!("ProjectGuid '{}' is not a GUID", value)),
                    }
                },
                "ProjectName" if !value.contains("$(") => project.name = value.to_string(),
                "AssemblyName" if assembly_name.is_none() => assembly_name = Some(value),
                "TargetName" if target_name.is_none() => target_name = Some(value),
                "OutputType" | "ConfigurationType" if output.is_none() => {
                    output = OutputKind::parse(value);
                    if output.is_none() {
                        project
                            .warnings
                            .push(format!("{} '{}' is not recognized", property.name, value));
                    }
                },
                "OutputPath" | "OutDir" => {
                    let condition = property
                        .attr("Condition")
                        .and_then(|c| parse_condition(c, default_platform))
                        .or_else(|| scope.clone());
                    project.output_paths.push(OutputPathEntry {
                        condition,
                        path: value.to_string(),
                    });
                },
                _ => {},
            }
        }
    }

    if let Some(kind) = output {
        project.output = kind;
    }

    let stem = project.assembly_name.clone();
    if let Some(name) = assembly_name.or(target_name) {
        let expanded = name
            .replace("$(MSBuildProjectName)", &stem)
            .replace("$(ProjectName)", &project.name);
        if expanded.contains("$(") {
            project
                .warnings
                .push(format!("assembly name '{}' cannot be expanded", name));
        } else {
            project.assembly_name = expanded;
        }
    }
}

fn read_items(root: &XmlElement, project: &mut ProjectDescriptor) {
    for group in groups(root, "ItemGroup") {
        for item in &group.children {
            if item.name == "ProjectConfiguration" {
                continue;
            }
            let Some(include) = item.attr("Include").map(str::trim).filter(|i| !i.is_empty()) else {
                continue;
            };

            match ReferenceKind::classify(&item.name) {
                Some(ReferenceKind::Project) => {
                    let mut reference = Reference::project(include);
                    reference.project_guid = item.child_text("Project").and_then(ProjectId::parse);
                    reference.name = item.child_text("Name").map(str::to_string);
                    project.references.push(reference);
                },
                Some(ReferenceKind::Assembly) => {
                    let mut reference = Reference::assembly(include);
                    reference.hint_path = item.child_text("HintPath").map(str::to_string);
                    project.references.push(reference);
                },
                Some(ReferenceKind::Unknown) => {
                    project
                        .unknown_references
                        .push(format!("{} {}", item.name, include));
                },
                None if item.name == "PackageReference" => {},
                None => {
                    for part in include.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                        project.items.push(SourceItem::new(item.name.clone(), part));
                    }
                },
            }
        }
    }
}
