//! Resolved configuration with built-in defaults

use slngen_core::types::{BuildConfiguration, UnsupportedConfigPolicy};

/// Fully resolved configuration used by every command
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlnGenConfig {
    pub discovery: DiscoverySettings,
    pub solution: SolutionSettings,
    pub build_list: BuildListSettings,
    pub orphans: OrphanSettings,
    pub convert: ConvertSettings,
}

/// Which files count as projects and how they are parsed
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySettings {
    /// Project file extensions, without the dot
    pub project_extensions: Vec<String>,
    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
    /// Parse project files on a worker pool
    pub parallel: bool,
    /// Worker count, 0 picks the number of CPUs
    pub jobs: usize,
}

/// Solution file rendering
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionSettings {
    pub unsupported_config: UnsupportedConfigPolicy,
    /// Mirror the directory layout as solution folders
    pub nest_folders: bool,
    pub visual_studio_version: String,
    pub minimum_visual_studio_version: String,
}

/// Authoritative build list handling
#[derive(Debug, Clone, PartialEq)]
pub struct BuildListSettings {
    /// Item name used when a build list is given without one
    pub items_name: String,
}

/// Orphan detection
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanSettings {
    /// Build-relevant file extensions, without the dot
    pub extensions: Vec<String>,
}

/// Reference conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSettings {
    /// Configuration used to compute referenced projects' output paths
    pub configuration: String,
    pub platform: String,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            project_extensions: strings(&["csproj", "vcxproj", "vbproj", "fsproj"]),
            exclude_dirs: strings(&["bin", "obj", ".git", ".vs", "node_modules"]),
            parallel: true,
            jobs: 0,
        }
    }
}

impl Default for SolutionSettings {
    fn default() -> Self {
        Self {
            unsupported_config: UnsupportedConfigPolicy::Closest,
            nest_folders: true,
            visual_studio_version: "17.0.31903.59".to_string(),
            minimum_visual_studio_version: "10.0.40219.1".to_string(),
        }
    }
}

impl Default for BuildListSettings {
    fn default() -> Self {
        Self {
            items_name: "ProjectsToBuild".to_string(),
        }
    }
}

impl Default for OrphanSettings {
    fn default() -> Self {
        Self {
            extensions: strings(&[
                "cs", "vb", "fs", "c", "cc", "cpp", "cxx", "h", "hh", "hpp", "hxx", "inl", "resx",
                "xaml", "rc", "idl",
            ]),
        }
    }
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            configuration: "Debug".to_string(),
            platform: "AnyCPU".to_string(),
        }
    }
}

impl DiscoverySettings {
    /// Check if a lowercase extension names a project file
    pub fn is_project_extension(&self, extension: &str) -> bool {
        self.project_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    /// Check if a directory name is excluded from traversal
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}

impl ConvertSettings {
    /// Configuration pair used for output path computation
    pub fn build_configuration(&self) -> BuildConfiguration {
        BuildConfiguration::new(&self.configuration, &self.platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SlnGenConfig::default();
        assert!(config.discovery.is_project_extension("csproj"));
        assert!(config.discovery.is_project_extension("VCXPROJ"));
        assert!(!config.discovery.is_project_extension("sln"));
        assert!(config.discovery.is_excluded_dir("obj"));
        assert!(config.discovery.parallel);
        assert_eq!(config.solution.unsupported_config, UnsupportedConfigPolicy::Closest);
        assert_eq!(config.build_list.items_name, "ProjectsToBuild");
        assert!(config.orphans.extensions.contains(&"cs".to_string()));
        assert_eq!(
            config.convert.build_configuration(),
            BuildConfiguration::new("Debug", "AnyCPU")
        );
    }
}
