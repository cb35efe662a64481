//! Orphaned file detection and repair
//!
//! An orphan is a build-relevant file under a project's directory that no
//! item of the project includes. SDK-style projects include their sources by
//! wildcard and are skipped. Subtrees owned by nested projects belong to
//! those projects, and projects sharing a directory share their items.

use crate::discovery::walk_files;
use crate::edit::{at_line_start, indent_unit, indentation_at, line_ending, TextEdits};
use crate::project::groups;
use crate::xml::{Span, XmlDocument};
use quick_xml::escape::escape;
use slngen_config::{DiscoverySettings, OrphanSettings};
use slngen_core::error::SlnResult;
use slngen_core::types::ProjectDescriptor;
use slngen_core::utils::path::{get_extension, path_key, relative_msbuild_path};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Orphans of one project
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanReport {
    pub project: PathBuf,
    pub name: String,
    /// Absolute paths, sorted
    pub orphans: Vec<PathBuf>,
}

/// Finds and optionally declares orphaned files
#[derive(Debug, Clone)]
pub struct OrphanFinder {
    discovery: DiscoverySettings,
    extensions: Vec<String>,
}

/// Item element used to declare a file with this extension
pub fn item_type_for(path: &Path) -> &'static str {
    match get_extension(path).as_deref() {
        Some("cs" | "vb" | "fs") => "Compile",
        Some("c" | "cc" | "cpp" | "cxx") => "ClCompile",
        Some("h" | "hh" | "hpp" | "hxx" | "inl") => "ClInclude",
        Some("resx") => "EmbeddedResource",
        Some("xaml") => "Page",
        Some("rc") => "ResourceCompile",
        Some("idl") => "Midl",
        _ => "None",
    }
}

/// Total number of orphans over all reports
pub fn total_orphans(reports: &[OrphanReport]) -> usize {
    reports.iter().map(|r| r.orphans.len()).sum()
}

/// Declared includes of a project, split into literal keys and wildcard patterns
struct DeclaredItems {
    literal: HashSet<String>,
    patterns: Vec<glob::Pattern>,
}

impl DeclaredItems {
    fn collect<'a>(projects: impl Iterator<Item = &'a ProjectDescriptor>) -> Self {
        let mut declared = Self {
            literal: HashSet::new(),
            patterns: Vec::new(),
        };
        for item in projects.flat_map(|p| &p.items) {
            if item.include.contains("$(") {
                continue;
            }
            if item.is_wildcard() {
                if let Ok(pattern) = glob::Pattern::new(&item.key()) {
                    declared.patterns.push(pattern);
                }
            } else {
                declared.literal.insert(item.key());
            }
        }
        declared
    }

    fn contains(&self, key: &str) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.literal.contains(key) || self.patterns.iter().any(|p| p.matches_with(key, options))
    }
}

impl OrphanFinder {
    pub fn new(discovery: &DiscoverySettings, orphans: &OrphanSettings) -> Self {
        Self {
            discovery: discovery.clone(),
            extensions: orphans.extensions.clone(),
        }
    }

    fn is_build_relevant(&self, path: &Path) -> bool {
        get_extension(path).is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Reports for every project with at least one orphan, in project order
    pub fn find(&self, projects: &[ProjectDescriptor]) -> Vec<OrphanReport> {
        let reports: Vec<OrphanReport> = projects
            .iter()
            .filter(|project| !project.sdk_style)
            .map(|project| OrphanReport {
                project: project.path.clone(),
                name: project.name.clone(),
                orphans: self.find_in_project(project, projects),
            })
            .filter(|report| !report.orphans.is_empty())
            .collect();

        info!("Found {} orphaned files in {} projects", total_orphans(&reports), reports.len());
        reports
    }

    /// Orphans of `project`; `all` is the whole corpus
    pub fn find_in_project(
        &self,
        project: &ProjectDescriptor,
        all: &[ProjectDescriptor],
    ) -> Vec<PathBuf> {
        let directory = project.directory();
        let directory_key = path_key(directory);

        let siblings = all
            .iter()
            .filter(|other| path_key(other.directory()) == directory_key);
        let declared = DeclaredItems::collect(std::iter::once(project).chain(siblings));

        let nested: Vec<String> = all
            .iter()
            .map(|other| path_key(other.directory()))
            .filter(|key| {
                key.len() > directory_key.len() && key.starts_with(&format!("{}/", directory_key))
            })
            .collect();

        walk_files(directory, &self.discovery)
            .into_iter()
            .filter(|file| self.is_build_relevant(file))
            .filter(|file| {
                let key = path_key(file);
                !nested.iter().any(|n| key.starts_with(&format!("{}/", n)))
            })
            .filter(|file| {
                let relative = file.strip_prefix(directory).unwrap_or(file);
                let key = path_key(relative);
                !declared.contains(&key)
            })
            .collect()
    }

    /// Declare every orphan of `report` in its project file.
    ///
    /// Returns the number of items added. Other bytes of the file are left
    /// untouched.
    pub fn fix(&self, report: &OrphanReport) -> SlnResult<usize> {
        let document = XmlDocument::load(&report.project)?;
        let source = document.source();
        let root = &document.root;

        let newline = line_ending(source);
        let unit = indent_unit(source);
        let directory = report.project.parent().unwrap_or_else(|| Path::new(""));
        let item_groups = groups(root, "ItemGroup");

        // Item types in first-seen order, each with its includes
        let mut by_type: Vec<(&'static str, Vec<String>)> = Vec::new();
        for orphan in &report.orphans {
            let item_type = item_type_for(orphan);
            let include = relative_msbuild_path(orphan, directory);
            match by_type.iter_mut().find(|(t, _)| *t == item_type) {
                Some((_, includes)) => includes.push(include),
                None => by_type.push((item_type, vec![include])),
            }
        }

        let mut edits = TextEdits::new();
        let mut new_group: Vec<String> = Vec::new();
        for (item_type, includes) in &by_type {
            // Items in a conditional group would only exist for some configurations
            let existing = item_groups.iter().find(|group| {
                !group.self_closing
                    && group.attr("Condition").is_none()
                    && group.children.iter().any(|c| c.name == *item_type)
            });
            match existing.and_then(|group| group.children.last()) {
                Some(last) => {
                    let indent = indentation_at(source, last.span.start);
                    let text: String = includes
                        .iter()
                        .map(|include| format!("{}{}{}", newline, indent, item_line(item_type, include)))
                        .collect();
                    edits.insert(last.span.end, text);
                },
                None => {
                    new_group.extend(includes.iter().map(|include| item_line(item_type, include)))
                },
            }
        }

        if !new_group.is_empty() && root.self_closing {
            let text = expand_empty_root(source, root.span, &new_group, newline, &unit);
            edits.replace(root.span, text);
        } else if !new_group.is_empty() {
            let indent = root
                .children
                .first()
                .map(|child| indentation_at(source, child.span.start).to_string())
                .filter(|indent| !indent.is_empty())
                .unwrap_or_else(|| unit.clone());
            let mut text = String::new();
            if !at_line_start(source, root.content_end) {
                text.push_str(newline);
            }
            text.push_str(&format!("{}<ItemGroup>{}", indent, newline));
            for line in &new_group {
                text.push_str(&format!("{}{}{}{}", indent, unit, line, newline));
            }
            text.push_str(&format!("{}</ItemGroup>{}", indent, newline));
            edits.insert(root.content_end, text);
        }

        let added = report.orphans.len();
        debug!("Declaring {} files in {}", added, report.project.display());
        document.write(&edits.apply(source))?;
        Ok(added)
    }
}

fn item_line(item_type: &str, include: &str) -> String {
    format!("<{} Include=\"{}\" />", item_type, escape(include))
}

/// Rewrite `<Project ... />` as an element holding one item group
fn expand_empty_root(
    source: &str,
    span: Span,
    items: &[String],
    newline: &str,
    unit: &str,
) -> String {
    let tag = &source[span.start..span.end];
    let open = tag.trim_end().trim_end_matches("/>").trim_end();
    let name: String = open
        .trim_start_matches('<')
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != '/')
        .collect();

    let mut text = format!("{}>{}{}<ItemGroup>{}", open, newline, unit, newline);
    for line in items {
        text.push_str(&format!("{}{}{}{}", unit, unit, line, newline));
    }
    text.push_str(&format!("{}</ItemGroup>{}</{}>", unit, newline, name));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::parse_project;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn finder() -> OrphanFinder {
        OrphanFinder::new(&DiscoverySettings::default(), &OrphanSettings::default())
    }

    const APP: &str = "<Project>\r\n  <ItemGroup>\r\n    <Compile Include=\"Program.cs\" />\r\n  </ItemGroup>\r\n</Project>\r\n";

    #[test]
    fn test_item_type_for() {
        assert_eq!(item_type_for(Path::new("a/Foo.cs")), "Compile");
        assert_eq!(item_type_for(Path::new("a/foo.CPP")), "ClCompile");
        assert_eq!(item_type_for(Path::new("a/foo.h")), "ClInclude");
        assert_eq!(item_type_for(Path::new("a/Strings.resx")), "EmbeddedResource");
        assert_eq!(item_type_for(Path::new("a/Main.xaml")), "Page");
        assert_eq!(item_type_for(Path::new("a/notes.txt")), "None");
    }

    #[test]
    fn test_find_and_fix_orphan() {
        let temp_dir = TempDir::new().unwrap();
        let project_path = write(temp_dir.path(), "App/App.csproj", APP);
        write(temp_dir.path(), "App/Program.cs", "");
        write(temp_dir.path(), "App/Foo.cs", "");
        write(temp_dir.path(), "App/readme.md", "");
        write(temp_dir.path(), "App/obj/Generated.cs", "");

        let projects = vec![parse_project(&project_path).unwrap()];
        let reports = finder().find(&projects);
        assert_eq!(total_orphans(&reports), 1);
        assert!(reports[0].orphans[0].ends_with("Foo.cs"));

        assert_eq!(finder().fix(&reports[0]).unwrap(), 1);
        let fixed = std::fs::read_to_string(&project_path).unwrap();
        assert_eq!(
            fixed,
            "<Project>\r\n  <ItemGroup>\r\n    <Compile Include=\"Program.cs\" />\r\n    <Compile Include=\"Foo.cs\" />\r\n  </ItemGroup>\r\n</Project>\r\n"
        );

        // A second run finds nothing
        let projects = vec![parse_project(&project_path).unwrap()];
        assert_eq!(total_orphans(&finder().find(&projects)), 0);
    }

    #[test]
    fn test_fix_adds_item_group_for_new_type() {
        let temp_dir = TempDir::new().unwrap();
        let project_path = write(temp_dir.path(), "App/App.csproj", APP);
        write(temp_dir.path(), "App/Program.cs", "");
        write(temp_dir.path(), "App/Views/Main.xaml", "");

        let projects = vec![parse_project(&project_path).unwrap()];
        let reports = finder().find(&projects);
        finder().fix(&reports[0]).unwrap();

        let fixed = std::fs::read_to_string(&project_path).unwrap();
        assert!(fixed.ends_with(
            "  </ItemGroup>\r\n  <ItemGroup>\r\n    <Page Include=\"Views\\Main.xaml\" />\r\n  </ItemGroup>\r\n</Project>\r\n"
        ));
        let projects = vec![parse_project(&project_path).unwrap()];
        assert!(finder().find(&projects).is_empty());
    }

    #[test]
    fn test_fix_expands_empty_project() {
        let temp_dir = TempDir::new().unwrap();
        let project_path = write(
            temp_dir.path(),
            "Legacy/Legacy.csproj",
            "<Project ToolsVersion=\"4.0\" />\r\n",
        );
        write(temp_dir.path(), "Legacy/Util.cs", "");

        let projects = vec![parse_project(&project_path).unwrap()];
        let reports = finder().find(&projects);
        assert_eq!(finder().fix(&reports[0]).unwrap(), 1);

        let fixed = std::fs::read_to_string(&project_path).unwrap();
        assert_eq!(
            fixed,
            "<Project ToolsVersion=\"4.0\">\r\n  <ItemGroup>\r\n    <Compile Include=\"Util.cs\" />\r\n  </ItemGroup>\r\n</Project>\r\n"
        );
        let projects = vec![parse_project(&project_path).unwrap()];
        assert!(finder().find(&projects).is_empty());
    }

    #[test]
    fn test_fix_skips_conditional_item_group() {
        let temp_dir = TempDir::new().unwrap();
        let project_path = write(
            temp_dir.path(),
            "App/App.csproj",
            "<Project>\r\n  <ItemGroup Condition=\" '$(Configuration)' == 'Debug' \">\r\n    <Compile Include=\"DebugOnly.cs\" />\r\n  </ItemGroup>\r\n  <ItemGroup>\r\n    <Compile Include=\"Program.cs\" />\r\n  </ItemGroup>\r\n</Project>\r\n",
        );
        write(temp_dir.path(), "App/DebugOnly.cs", "");
        write(temp_dir.path(), "App/Program.cs", "");
        write(temp_dir.path(), "App/Foo.cs", "");

        let projects = vec![parse_project(&project_path).unwrap()];
        let reports = finder().find(&projects);
        finder().fix(&reports[0]).unwrap();

        let fixed = std::fs::read_to_string(&project_path).unwrap();
        assert!(fixed.contains(
            "    <Compile Include=\"Program.cs\" />\r\n    <Compile Include=\"Foo.cs\" />\r\n"
        ));
        assert!(!fixed.contains("DebugOnly.cs\" />\r\n    <Compile Include=\"Foo.cs\""));
    }

    #[test]
    fn test_wildcards_nested_projects_and_sdk_style() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let outer = write(
            root,
            "Outer/Outer.csproj",
            "<Project><ItemGroup><Compile Include=\"src\\**\\*.cs\" /></ItemGroup></Project>",
        );
        write(root, "Outer/src/A.cs", "");
        write(root, "Outer/src/deep/B.CS", "");
        write(root, "Outer/Loose.cs", "");
        let inner = write(root, "Outer/Inner/Inner.csproj", "<Project />");
        write(root, "Outer/Inner/Inner.cs", "");
        let sdk = write(root, "Sdk/Sdk.csproj", "<Project Sdk=\"Microsoft.NET.Sdk\" />");
        write(root, "Sdk/Implicit.cs", "");

        let projects: Vec<_> = [outer, inner, sdk]
            .iter()
            .map(|p| parse_project(p).unwrap())
            .collect();
        let reports = finder().find(&projects);

        let orphans: Vec<_> = reports
            .iter()
            .flat_map(|r| r.orphans.iter())
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // Inner.cs belongs to Inner, which declares nothing
        assert_eq!(orphans, vec!["Loose.cs", "Inner.cs"]);
    }

    #[test]
    fn test_projects_sharing_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let a = write(root, "Shared/A.csproj", "<Project><ItemGroup><Compile Include=\"a.cs\" /></ItemGroup></Project>");
        let b = write(root, "Shared/B.csproj", "<Project><ItemGroup><Compile Include=\"b.cs\" /></ItemGroup></Project>");
        write(root, "Shared/a.cs", "");
        write(root, "Shared/b.cs", "");

        let projects: Vec<_> = [a, b].iter().map(|p| parse_project(p).unwrap()).collect();
        assert!(finder().find(&projects).is_empty());
    }
}
