//! Solution file synthesis
//!
//! Renders the `.sln` text format: one project block per project in
//! dependency-first order, optional solution folders mirroring the directory
//! layout, and the configuration tables mapping every solution configuration
//! onto a configuration each project declares.

use indexmap::{IndexMap, IndexSet};
use slngen_config::SolutionSettings;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::SlnResult;
use slngen_core::types::project::SOLUTION_FOLDER_TYPE;
use slngen_core::types::{BuildConfiguration, ProjectDescriptor, ProjectId, UnsupportedConfigPolicy};
use slngen_core::utils::path::{absolutize, path_key};
use slngen_core::utils::{relative_msbuild_path, write_atomic};
use slngen_graph::{DependencyGraph, NodeIndex};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FORMAT_VERSION: &str = "12.00";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Everything the renderer needs besides the graph
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionOptions {
    /// Solution configurations, requested pair first
    pub configurations: Vec<BuildConfiguration>,
    pub policy: UnsupportedConfigPolicy,
    pub nest_folders: bool,
    /// Directory solution folders are computed from
    pub root: PathBuf,
    pub visual_studio_version: String,
    pub minimum_visual_studio_version: String,
}

/// How one project is built for one solution configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationMapping {
    /// Project configuration selected as active
    pub active: BuildConfiguration,
    /// Whether the project is built for this solution configuration
    pub build: bool,
    /// The project does not declare the requested pair
    pub unsupported: bool,
}

/// Renders and writes a solution file for a dependency graph
pub struct SolutionWriter<'a> {
    graph: &'a DependencyGraph,
    options: &'a SolutionOptions,
}

struct Folder {
    id: ProjectId,
    name: String,
    parent: Option<ProjectId>,
}

/// CRLF text buffer with tab indentation
#[derive(Default)]
struct SolutionText {
    text: String,
}

impl SolutionText {
    fn line(&mut self, indent: usize, content: impl Display) {
        for _ in 0..indent {
            self.text.push('\t');
        }
        self.text.push_str(&content.to_string());
        self.text.push_str("\r\n");
    }
}

impl SolutionOptions {
    /// Options for one requested configuration, taking the rest from settings
    pub fn new(root: &Path, requested: BuildConfiguration, settings: &SolutionSettings) -> Self {
        Self {
            configurations: vec![requested],
            policy: settings.unsupported_config,
            nest_folders: settings.nest_folders,
            root: absolutize(root),
            visual_studio_version: settings.visual_studio_version.clone(),
            minimum_visual_studio_version: settings.minimum_visual_studio_version.clone(),
        }
    }

    /// Add configurations requested by a build list, skipping ones already present
    pub fn with_implied(mut self, implied: &[BuildConfiguration]) -> Self {
        for config in implied {
            if !self.configurations.iter().any(|c| c.matches(config)) {
                self.configurations.push(config.clone());
            }
        }
        self
    }

    /// Major version for the `# Visual Studio Version` comment
    fn major_version(&self) -> &str {
        self.visual_studio_version
            .split('.')
            .next()
            .unwrap_or(&self.visual_studio_version)
    }
}

impl ConfigurationMapping {
    /// Map a solution configuration onto a project
    pub fn resolve(
        project: &ProjectDescriptor,
        requested: &BuildConfiguration,
        policy: UnsupportedConfigPolicy,
    ) -> Self {
        if project.configurations.is_empty() {
            return Self {
                active: requested.clone(),
                build: true,
                unsupported: false,
            };
        }

        if let Some(declared) = project.supported(requested) {
            return Self {
                active: declared.clone(),
                build: true,
                unsupported: false,
            };
        }

        let closest = project
            .configurations
            .iter()
            .find(|c| c.same_configuration(requested))
            .or_else(|| project.configurations.first())
            .cloned()
            .unwrap_or_else(|| requested.clone());

        let (active, build) = match policy {
            UnsupportedConfigPolicy::Closest => (closest, true),
            UnsupportedConfigPolicy::Skip => (closest, false),
            UnsupportedConfigPolicy::Include => (requested.clone(), true),
        };
        Self {
            active,
            build,
            unsupported: true,
        }
    }
}

impl<'a> SolutionWriter<'a> {
    pub fn new(graph: &'a DependencyGraph, options: &'a SolutionOptions) -> Self {
        Self { graph, options }
    }

    /// Render the solution text for a solution file at `solution_path`.
    ///
    /// Projects that do not declare a solution configuration are recorded
    /// in `diagnostics`.
    pub fn render(&self, solution_path: &Path, diagnostics: &mut Diagnostics) -> String {
        let solution_dir = absolutize(solution_path.parent().unwrap_or_else(|| Path::new("")));
        let solution_dir = solution_dir.as_path();
        let order = self.graph.build_order();
        let folders = if self.options.nest_folders {
            self.folders(&order)
        } else {
            IndexMap::new()
        };

        let mut out = SolutionText::default();
        out.line(0, "");
        out.line(
            0,
            format!("Microsoft Visual Studio Solution File, Format Version {}", FORMAT_VERSION),
        );
        out.line(0, format!("# Visual Studio Version {}", self.options.major_version()));
        out.line(0, format!("VisualStudioVersion = {}", self.options.visual_studio_version));
        out.line(
            0,
            format!(
                "MinimumVisualStudioVersion = {}",
                self.options.minimum_visual_studio_version
            ),
        );

        for index in &order {
            self.write_project(&mut out, *index, solution_dir);
        }
        for folder in folders.values() {
            out.line(
                0,
                format!(
                    "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                    SOLUTION_FOLDER_TYPE, folder.name, folder.name, folder.id
                ),
            );
            out.line(0, "EndProject");
        }

        out.line(0, "Global");
        out.line(1, "GlobalSection(SolutionConfigurationPlatforms) = preSolution");
        for config in &self.options.configurations {
            out.line(2, format!("{0} = {0}", config.solution_label()));
        }
        out.line(1, "EndGlobalSection");

        out.line(1, "GlobalSection(ProjectConfigurationPlatforms) = postSolution");
        for index in &order {
            self.write_configurations(&mut out, *index, diagnostics);
        }
        out.line(1, "EndGlobalSection");

        out.line(1, "GlobalSection(SolutionProperties) = preSolution");
        out.line(2, "HideSolutionNode = FALSE");
        out.line(1, "EndGlobalSection");

        if !folders.is_empty() {
            out.line(1, "GlobalSection(NestedProjects) = preSolution");
            for index in &order {
                let project = self.graph.project(*index);
                if let Some(parent) = self.project_folder(project) {
                    out.line(2, format!("{} = {}", project.id, parent));
                }
            }
            for folder in folders.values() {
                if let Some(parent) = folder.parent {
                    out.line(2, format!("{} = {}", folder.id, parent));
                }
            }
            out.line(1, "EndGlobalSection");
        }
        out.line(0, "EndGlobal");

        out.text
    }

    /// Render and atomically write the solution file, with a UTF-8 BOM
    pub fn write(&self, solution_path: &Path, diagnostics: &mut Diagnostics) -> SlnResult<()> {
        let text = self.render(solution_path, diagnostics);
        let mut bytes = Vec::with_capacity(UTF8_BOM.len() + text.len());
        bytes.extend_from_slice(UTF8_BOM);
        bytes.extend_from_slice(text.as_bytes());
        write_atomic(solution_path, &bytes)?;
        info!(
            "Wrote {} with {} projects",
            solution_path.display(),
            self.graph.project_count()
        );
        Ok(())
    }

    fn write_project(&self, out: &mut SolutionText, index: NodeIndex, solution_dir: &Path) {
        let project = self.graph.project(index);
        out.line(
            0,
            format!(
                "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                project.kind.type_guid(),
                project.name,
                relative_msbuild_path(&project.path, solution_dir),
                project.id
            ),
        );

        let dependencies = self.graph.dependencies(index);
        if !dependencies.is_empty() {
            out.line(1, "ProjectSection(ProjectDependencies) = postProject");
            for dependency in dependencies {
                let id = self.graph.project(dependency).id;
                out.line(2, format!("{0} = {0}", id));
            }
            out.line(1, "EndProjectSection");
        }
        out.line(0, "EndProject");
    }

    fn write_configurations(&self, out: &mut SolutionText, index: NodeIndex, diagnostics: &mut Diagnostics) {
        let project = self.graph.project(index);
        for config in &self.options.configurations {
            let mapping = ConfigurationMapping::resolve(project, config, self.options.policy);
            if mapping.unsupported {
                debug!(
                    "{} does not declare {}, using {}",
                    project.name, config, mapping.active
                );
                diagnostics.record(
                    DiagnosticKind::UnsupportedConfiguration,
                    project.name.clone(),
                    format!(
                        "{} is not declared; mapped onto {}{}",
                        config.solution_label(),
                        mapping.active.solution_label(),
                        if mapping.build { "" } else { " without building" }
                    ),
                );
            }

            let label = config.solution_label();
            let active = mapping.active.solution_label();
            out.line(2, format!("{}.{}.ActiveCfg = {}", project.id, label, active));
            if mapping.build {
                out.line(2, format!("{}.{}.Build.0 = {}", project.id, label, active));
            }
        }
    }

    /// Directories strictly between the root and each project's own directory
    fn folder_chain(&self, project: &ProjectDescriptor) -> Vec<(String, String)> {
        let Ok(relative) = project.directory().strip_prefix(&self.options.root) else {
            return Vec::new();
        };
        let names: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let mut chain = Vec::new();
        let mut key = PathBuf::new();
        for name in names.iter().take(names.len().saturating_sub(1)) {
            key.push(name);
            chain.push((path_key(&key), name.clone()));
        }
        chain
    }

    fn folders(&self, order: &[NodeIndex]) -> IndexMap<String, Folder> {
        let mut keys: IndexSet<(String, String)> = IndexSet::new();
        for index in order {
            keys.extend(self.folder_chain(self.graph.project(*index)));
        }

        let mut sorted: Vec<(String, String)> = keys.into_iter().collect();
        sorted.sort();

        let mut folders = IndexMap::new();
        for (key, name) in sorted {
            if folders.contains_key(&key) {
                continue;
            }
            let parent = key
                .rsplit_once('/')
                .map(|(parent_key, _)| folder_id(parent_key));
            folders.insert(
                key.clone(),
                Folder {
                    id: folder_id(&key),
                    name,
                    parent,
                },
            );
        }
        folders
    }

    fn project_folder(&self, project: &ProjectDescriptor) -> Option<ProjectId> {
        self.folder_chain(project)
            .last()
            .map(|(key, _)| folder_id(key))
    }
}

fn folder_id(key: &str) -> ProjectId {
    ProjectId::from_key(&format!("folder:{}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use slngen_core::types::Reference;
    use tempfile::TempDir;

    fn project(root: &Path, relative: &str, references: &[&str]) -> ProjectDescriptor {
        let mut project = ProjectDescriptor::new(root.join(relative));
        for reference in references {
            project.references.push(Reference::project(*reference));
        }
        project
    }

    fn options(root: &Path) -> SolutionOptions {
        SolutionOptions::new(
            root,
            BuildConfiguration::new("Debug", "AnyCPU"),
            &SolutionSettings::default(),
        )
    }

    #[test]
    fn test_render_two_projects() {
        let temp_dir = TempDir::new().unwrap();
        let root = absolutize(temp_dir.path());
        let p1 = project(&root, "P1/P1.csproj", &[]);
        let p2 = project(&root, "P2/P2.csproj", &["..\\P1\\P1.csproj"]);
        let (p1_id, p2_id) = (p1.id, p2.id);
        let graph = DependencyGraph::build(vec![p2, p1]);

        let options = options(&root);
        let mut diagnostics = Diagnostics::new();
        let text = SolutionWriter::new(&graph, &options).render(&root.join("All.sln"), &mut diagnostics);

        assert!(text.starts_with("\r\nMicrosoft Visual Studio Solution File, Format Version 12.00\r\n"));
        assert!(text.contains("# Visual Studio Version 17\r\n"));
        assert!(text.contains(&format!(
            "Project(\"{{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}}\") = \"P1\", \"P1\\P1.csproj\", \"{}\"\r\nEndProject\r\n",
            p1_id
        )));
        assert!(text.contains(&format!(
            "\tProjectSection(ProjectDependencies) = postProject\r\n\t\t{0} = {0}\r\n\tEndProjectSection\r\n",
            p1_id
        )));
        // Dependency first
        let p1_at = text.find("\"P1\"").unwrap();
        let p2_at = text.find("\"P2\"").unwrap();
        assert!(p1_at < p2_at);

        assert!(text.contains("\t\tDebug|Any CPU = Debug|Any CPU\r\n"));
        assert!(text.contains(&format!("\t\t{}.Debug|Any CPU.ActiveCfg = Debug|Any CPU\r\n", p2_id)));
        assert!(text.contains(&format!("\t\t{}.Debug|Any CPU.Build.0 = Debug|Any CPU\r\n", p2_id)));
        assert!(text.contains("HideSolutionNode = FALSE"));
        // Projects directly below the root get no folder
        assert!(!text.contains(SOLUTION_FOLDER_TYPE));
        assert!(text.ends_with("EndGlobal\r\n"));
        assert!(!text.replace("\r\n", "").contains('\n'));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let root = PathBuf::from("/repo");
        let build = || {
            DependencyGraph::build(vec![
                project(&root, "src/App/App.csproj", &["..\\Lib\\Lib.csproj"]),
                project(&root, "src/Lib/Lib.csproj", &[]),
                project(&root, "tests/App.Tests/App.Tests.csproj", &["..\\..\\src\\App\\App.csproj"]),
            ])
        };
        let options = options(&root);
        let first = SolutionWriter::new(&build(), &options).render(&root.join("All.sln"), &mut Diagnostics::new());
        let second = SolutionWriter::new(&build(), &options).render(&root.join("All.sln"), &mut Diagnostics::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_solution_folders() {
        let root = PathBuf::from("/repo");
        let app = project(&root, "src/Apps/App/App.csproj", &[]);
        let app_id = app.id;
        let graph = DependencyGraph::build(vec![app]);

        let options = options(&root);
        let text = SolutionWriter::new(&graph, &options).render(&root.join("All.sln"), &mut Diagnostics::new());

        let src = folder_id("src");
        let apps = folder_id("src/apps");
        assert!(text.contains(&format!(
            "Project(\"{}\") = \"src\", \"src\", \"{}\"",
            SOLUTION_FOLDER_TYPE, src
        )));
        assert!(text.contains(&format!("\"Apps\", \"Apps\", \"{}\"", apps)));
        assert!(text.contains("GlobalSection(NestedProjects) = preSolution"));
        assert!(text.contains(&format!("\t\t{} = {}\r\n", app_id, apps)));
        assert!(text.contains(&format!("\t\t{} = {}\r\n", apps, src)));

        let flat = SolutionOptions {
            nest_folders: false,
            ..options.clone()
        };
        let text = SolutionWriter::new(&graph, &flat).render(&root.join("All.sln"), &mut Diagnostics::new());
        assert!(!text.contains("NestedProjects"));
    }

    #[test]
    fn test_configuration_mapping_policies() {
        let mut cpp = ProjectDescriptor::new(PathBuf::from("/repo/Native/Native.vcxproj"));
        cpp.configurations.insert(BuildConfiguration::new("Debug", "Win32"));
        cpp.configurations.insert(BuildConfiguration::new("Release", "x64"));

        // x86 is served by Win32
        let x86 = BuildConfiguration::new("Debug", "x86");
        let mapping = ConfigurationMapping::resolve(&cpp, &x86, UnsupportedConfigPolicy::Skip);
        assert_eq!(mapping.active, BuildConfiguration::new("Debug", "Win32"));
        assert!(mapping.build);
        assert!(!mapping.unsupported);

        let arm = BuildConfiguration::new("Release", "ARM64");
        let closest = ConfigurationMapping::resolve(&cpp, &arm, UnsupportedConfigPolicy::Closest);
        assert_eq!(closest.active, BuildConfiguration::new("Release", "x64"));
        assert!(closest.build && closest.unsupported);

        let skip = ConfigurationMapping::resolve(&cpp, &arm, UnsupportedConfigPolicy::Skip);
        assert_eq!(skip.active, BuildConfiguration::new("Release", "x64"));
        assert!(!skip.build);

        let include = ConfigurationMapping::resolve(&cpp, &arm, UnsupportedConfigPolicy::Include);
        assert_eq!(include.active, arm);
        assert!(include.build);

        // Nothing of the same name: first declared
        let profile = BuildConfiguration::new("Profile", "x64");
        let fallback = ConfigurationMapping::resolve(&cpp, &profile, UnsupportedConfigPolicy::Closest);
        assert_eq!(fallback.active, BuildConfiguration::new("Debug", "Win32"));
    }

    #[test]
    fn test_skip_policy_omits_build_line() {
        let root = PathBuf::from("/repo");
        let mut lib = project(&root, "Lib/Lib.csproj", &[]);
        lib.configurations.insert(BuildConfiguration::new("Debug", "AnyCPU"));
        let lib_id = lib.id;
        let graph = DependencyGraph::build(vec![lib]);

        let mut options = options(&root).with_implied(&[
            BuildConfiguration::new("Debug", "Any CPU"),
            BuildConfiguration::new("Release", "AnyCPU"),
        ]);
        options.policy = UnsupportedConfigPolicy::Skip;
        assert_eq!(options.configurations.len(), 2);

        let mut diagnostics = Diagnostics::new();
        let text = SolutionWriter::new(&graph, &options).render(&root.join("All.sln"), &mut diagnostics);

        assert!(text.contains("\t\tRelease|Any CPU = Release|Any CPU\r\n"));
        assert!(text.contains(&format!("{}.Release|Any CPU.ActiveCfg = Debug|Any CPU", lib_id)));
        assert!(!text.contains(&format!("{}.Release|Any CPU.Build.0", lib_id)));
        assert_eq!(diagnostics.count(DiagnosticKind::UnsupportedConfiguration), 1);
    }

    #[test]
    fn test_write_adds_bom_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let root = absolutize(temp_dir.path());
        let graph = DependencyGraph::build(vec![project(&root, "P1/P1.csproj", &[])]);
        let options = options(&root);
        let path = root.join("All.sln");
        std::fs::write(&path, "stale").unwrap();

        SolutionWriter::new(&graph, &options)
            .write(&path, &mut Diagnostics::new())
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert!(String::from_utf8(bytes).unwrap().contains("\"P1\""));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let root = absolutize(temp_dir.path());
        let graph = DependencyGraph::build(Vec::new());
        let options = options(&root);

        let result = SolutionWriter::new(&graph, &options).write(&root.join("missing/All.sln"), &mut Diagnostics::new());
        assert!(matches!(result, Err(slngen_core::SlnError::Write { .. })));
    }
}
