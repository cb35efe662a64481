//! slngen.toml parsing
//!
//! Every field is optional: a file only overrides what it names, and the
//! layers are folded onto [`SlnGenConfig`] defaults by the merge module.

use crate::settings::SlnGenConfig;
use crate::ConfigResult;
use serde::{Deserialize, Serialize};
use slngen_core::error::SlnError;
use slngen_core::types::UnsupportedConfigPolicy;
use std::path::Path;

/// Contents of one slngen.toml file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlnGenToml {
    pub discovery: DiscoverySection,
    pub solution: SolutionSection,
    pub build_list: BuildListSection,
    pub orphans: OrphansSection,
    pub convert: ConvertSection,
}

/// `[discovery]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    pub project_extensions: Option<Vec<String>>,
    pub exclude_dirs: Option<Vec<String>>,
    pub parallel: Option<bool>,
    pub jobs: Option<usize>,
}

/// `[solution]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolutionSection {
    pub unsupported_config: Option<UnsupportedConfigPolicy>,
    pub nest_folders: Option<bool>,
    pub visual_studio_version: Option<String>,
    pub minimum_visual_studio_version: Option<String>,
}

/// `[build_list]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildListSection {
    pub items_name: Option<String>,
}

/// `[orphans]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrphansSection {
    pub extensions: Option<Vec<String>>,
}

/// `[convert]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertSection {
    pub configuration: Option<String>,
    pub platform: Option<String>,
}

impl SlnGenToml {
    /// Fold this layer onto a resolved configuration
    pub fn apply_to(&self, config: &mut SlnGenConfig) {
        let discovery = &self.discovery;
        if let Some(extensions) = &discovery.project_extensions {
            config.discovery.project_extensions = normalize_extensions(extensions);
        }
        if let Some(dirs) = &discovery.exclude_dirs {
            config.discovery.exclude_dirs = dirs.clone();
        }
        if let Some(parallel) = discovery.parallel {
            config.discovery.parallel = parallel;
        }
        if let Some(jobs) = discovery.jobs {
            config.discovery.jobs = jobs;
        }

        let solution = &self.solution;
        if let Some(policy) = solution.unsupported_config {
            config.solution.unsupported_config = policy;
        }
        if let Some(nest) = solution.nest_folders {
            config.solution.nest_folders = nest;
        }
        if let Some(version) = &solution.visual_studio_version {
            config.solution.visual_studio_version = version.clone();
        }
        if let Some(version) = &solution.minimum_visual_studio_version {
            config.solution.minimum_visual_studio_version = version.clone();
        }

        if let Some(items_name) = &self.build_list.items_name {
            config.build_list.items_name = items_name.clone();
        }
        if let Some(extensions) = &self.orphans.extensions {
            config.orphans.extensions = normalize_extensions(extensions);
        }
        if let Some(configuration) = &self.convert.configuration {
            config.convert.configuration = configuration.clone();
        }
        if let Some(platform) = &self.convert.platform {
            config.convert.platform = platform.clone();
        }
    }
}

/// Strip leading dots and lowercase extension lists
fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Parse TOML string into a configuration layer
pub fn parse_slngen_toml(content: &str) -> ConfigResult<SlnGenToml> {
    let config: SlnGenToml = ::toml::from_str(content).map_err(|e| SlnError::ConfigValidation {
        field: "slngen.toml".to_string(),
        reason: e.to_string(),
    })?;

    validate_config(&config)?;

    Ok(config)
}

/// Validate values serde cannot check
pub fn validate_config(config: &SlnGenToml) -> ConfigResult<()> {
    if let Some(extensions) = &config.discovery.project_extensions {
        if normalize_extensions(extensions).is_empty() {
            return Err(SlnError::ConfigValidation {
                field: "discovery.project_extensions".to_string(),
                reason: "at least one project extension is required".to_string(),
            });
        }
    }

    if let Some(items_name) = &config.build_list.items_name {
        if items_name.trim().is_empty() || items_name.contains(char::is_whitespace) {
            return Err(SlnError::ConfigValidation {
                field: "build_list.items_name".to_string(),
                reason: format!("'{}' is not a valid MSBuild item name", items_name),
            });
        }
    }

    for (field, value) in [
        ("convert.configuration", &config.convert.configuration),
        ("convert.platform", &config.convert.platform),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(SlnError::ConfigValidation {
                field: field.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

/// Load and parse slngen.toml from file path
pub fn load_from_file(path: &Path) -> ConfigResult<SlnGenToml> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SlnError::io(format!("Failed to read {}", path.display()), e))?;

    parse_slngen_toml(&content).map_err(|e| match e {
        SlnError::ConfigValidation { field, reason } => SlnError::ConfigValidation {
            field,
            reason: format!("in file {}: {}", path.display(), reason),
        },
        other => other,
    })
}
