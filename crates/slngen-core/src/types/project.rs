//! Project descriptor types.
//!
//! Defines the parsed representation of one MSBuild project file.

use super::{BuildConfiguration, Reference, ReferenceKind};
use crate::utils::hash::stable_uuid;
use crate::utils::path::{item_key, msbuild_to_native, normalize_path};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Solution project-type GUID of solution folders
pub const SOLUTION_FOLDER_TYPE: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

/// Output path used when a project declares none
pub const DEFAULT_OUTPUT_PATH: &str = "bin\\$(Configuration)\\";

/// Unique project identity (the `ProjectGuid`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

/// Where a project's identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdOrigin {
    /// Read from `<ProjectGuid>`
    Declared,
    /// Derived from the normalized project path
    Synthesized,
}

/// Language family of a project, derived from its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectKind {
    CSharp,
    Cpp,
    VisualBasic,
    FSharp,
    Other,
}

/// What a project produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    Executable,
    WindowsExecutable,
    Library,
    StaticLibrary,
    Utility,
    Module,
}

/// A declared item such as `<Compile Include="Foo.cs" />`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceItem {
    pub item_type: String,
    pub include: String,
}

/// An `OutputPath`/`OutDir` property, optionally scoped to one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPathEntry {
    pub condition: Option<BuildConfiguration>,
    pub path: String,
}

/// One parsed project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub id: ProjectId,
    pub id_origin: IdOrigin,
    pub name: String,
    pub assembly_name: String,
    /// Absolute, normalized path of the project file
    pub path: PathBuf,
    pub kind: ProjectKind,
    pub output: OutputKind,
    pub sdk_style: bool,
    pub items: Vec<SourceItem>,
    pub configurations: IndexSet<BuildConfiguration>,
    pub output_paths: Vec<OutputPathEntry>,
    pub references: Vec<Reference>,
    /// `*Reference` elements of a kind that is neither traversed nor converted
    pub unknown_references: Vec<String>,
    /// Constructs the parser skipped, such as unreadable conditions
    pub warnings: Vec<String>,
}

impl ProjectId {
    /// Parse `{GUID}`, `GUID` in any case
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim().trim_start_matches('{').trim_end_matches('}');
        Uuid::parse_str(trimmed).ok().map(Self)
    }

    /// Derive a stable identity from an arbitrary key
    pub fn from_key(key: &str) -> Self {
        Self(stable_uuid(key))
    }

    /// Derive a stable identity from a project path
    pub fn from_path(path: &Path) -> Self {
        Self::from_key(&crate::utils::path::path_key(path))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.0.hyphenated())
    }
}

impl ProjectKind {
    /// Detect the kind from a project file extension
    pub fn from_path(path: &Path) -> Self {
        match crate::utils::path::get_extension(path).as_deref() {
            Some("csproj") => ProjectKind::CSharp,
            Some("vcxproj") => ProjectKind::Cpp,
            Some("vbproj") => ProjectKind::VisualBasic,
            Some("fsproj") => ProjectKind::FSharp,
            _ => ProjectKind::Other,
        }
    }

    /// Project-type GUID written in front of each solution entry
    pub fn type_guid(&self) -> &'static str {
        match self {
            ProjectKind::CSharp => "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}",
            ProjectKind::Cpp => "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}",
            ProjectKind::VisualBasic => "{F184B08F-C81C-45F6-A57F-5ABD9991F28F}",
            ProjectKind::FSharp => "{F2A71F9B-5D33-465A-A702-920D77279786}",
            // Common Project System
            ProjectKind::Other => "{13B669BE-BB05-4DDF-9536-439F39A36129}",
        }
    }
}

impl OutputKind {
    /// Parse `<OutputType>` or `<ConfigurationType>` values
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exe" | "application" => Some(OutputKind::Executable),
            "winexe" | "appcontainerexe" => Some(OutputKind::WindowsExecutable),
            "library" | "dynamiclibrary" | "winmdobj" => Some(OutputKind::Library),
            "staticlibrary" => Some(OutputKind::StaticLibrary),
            "utility" | "makefile" => Some(OutputKind::Utility),
            "module" => Some(OutputKind::Module),
            _ => None,
        }
    }

    /// File extension of the built artifact
    pub fn artifact_extension(&self) -> Option<&'static str> {
        match self {
            OutputKind::Executable | OutputKind::WindowsExecutable => Some("exe"),
            OutputKind::Library => Some("dll"),
            OutputKind::StaticLibrary => Some("lib"),
            OutputKind::Module => Some("netmodule"),
            OutputKind::Utility => None,
        }
    }

    /// Short label, used as DGML category
    pub fn label(&self) -> &'static str {
        match self {
            OutputKind::Executable => "Executable",
            OutputKind::WindowsExecutable => "WindowsExecutable",
            OutputKind::Library => "Library",
            OutputKind::StaticLibrary => "StaticLibrary",
            OutputKind::Utility => "Utility",
            OutputKind::Module => "Module",
        }
    }
}

impl SourceItem {
    pub fn new(item_type: impl Into<String>, include: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            include: include.into(),
        }
    }

    /// Comparison key: lowercase, `/` separated, relative to the project directory
    pub fn key(&self) -> String {
        item_key(&self.include)
    }

    /// Check if the include is a wildcard pattern
    pub fn is_wildcard(&self) -> bool {
        self.include.contains('*') || self.include.contains('?')
    }
}

impl ProjectDescriptor {
    /// Create a descriptor with a path-derived identity and no items
    pub fn new(path: PathBuf) -> Self {
        let path = normalize_path(&path);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id: ProjectId::from_path(&path),
            id_origin: IdOrigin::Synthesized,
            name: stem.clone(),
            assembly_name: stem,
            kind: ProjectKind::from_path(&path),
            path,
            output: OutputKind::Library,
            sdk_style: false,
            items: Vec::new(),
            configurations: IndexSet::new(),
            output_paths: Vec::new(),
            references: Vec::new(),
            unknown_references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Directory containing the project file
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// References that participate in the dependency graph
    pub fn project_references(&self) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Project)
    }

    /// References to compiled assemblies
    pub fn assembly_references(&self) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Assembly)
    }

    /// Absolute path a project reference include points at
    pub fn resolve_include(&self, include: &str) -> PathBuf {
        normalize_path(&self.directory().join(msbuild_to_native(include)))
    }

    /// Declare a configuration unless an equivalent spelling is already present.
    ///
    /// `Debug|AnyCPU` and `Debug|Any CPU` are the same pair; the first
    /// spelling seen is kept.
    pub fn add_configuration(&mut self, config: BuildConfiguration) -> bool {
        if self.configurations.iter().any(|c| c.matches(&config)) {
            return false;
        }
        self.configurations.insert(config)
    }

    /// Declared configuration matching `requested`, allowing platform aliases
    pub fn supported(&self, requested: &BuildConfiguration) -> Option<&BuildConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.matches(requested))
            .or_else(|| self.configurations.iter().find(|c| c.matches_alias(requested)))
    }

    /// Raw output path for a configuration, falling back to the MSBuild default
    pub fn output_path_for(&self, config: &BuildConfiguration) -> String {
        let scoped = self
            .output_paths
            .iter()
            .find(|e| e.condition.as_ref().is_some_and(|c| c.matches_alias(config)));
        let unscoped = self.output_paths.iter().find(|e| e.condition.is_none());
        let raw = scoped
            .or(unscoped)
            .map(|e| e.path.as_str())
            .unwrap_or(DEFAULT_OUTPUT_PATH);

        raw.replace("$(Configuration)", &config.configuration)
            .replace("$(Platform)", &config.project_platform())
            .replace("$(AssemblyName)", &self.assembly_name)
            .replace("$(TargetName)", &self.assembly_name)
            .replace("$(ProjectName)", &self.name)
            .replace("$(MSBuildProjectName)", &self.name)
    }

    /// Expected absolute path of the built artifact.
    ///
    /// Returns `None` when the project produces no artifact or the output path
    /// still contains macros that cannot be expanded without a build.
    pub fn expected_output(&self, config: &BuildConfiguration) -> Option<PathBuf> {
        let extension = self.output.artifact_extension()?;
        let mut directory = self.output_path_for(config);
        for dir_macro in ["$(ProjectDir)", "$(MSBuildProjectDirectory)\\", "$(MSBuildProjectDirectory)"] {
            directory = directory.replace(dir_macro, "");
        }
        if directory.contains("$(") {
            return None;
        }
        let file = format!("{}.{}", self.assembly_name, extension);
        let base = self.directory().join(msbuild_to_native(&directory));
        Some(normalize_path(&base.join(file)))
    }
}
