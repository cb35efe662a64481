//! Authoritative build list
//!
//! A build list is an MSBuild file whose item group names the exact set of
//! projects to include. When one is given, directory discovery is ignored.

use crate::project::groups;
use crate::xml::{XmlDocument, XmlElement};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::BuildConfiguration;
use slngen_core::utils::path::{absolutize, msbuild_to_native, normalize_path, path_key};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One listed project
#[derive(Debug, Clone, PartialEq)]
pub struct BuildListEntry {
    /// Absolute, normalized project path
    pub path: PathBuf,
    /// Configurations named by the item's metadata
    pub configurations: Vec<BuildConfiguration>,
}

/// Ordered, de-duplicated projects read from a build list file
#[derive(Debug, Clone)]
pub struct AuthoritativeBuildList {
    pub manifest: PathBuf,
    pub items_name: String,
    pub entries: Vec<BuildListEntry>,
    /// Includes that could not be resolved to a path
    pub skipped: Vec<String>,
}

impl AuthoritativeBuildList {
    /// Load the items named `items_name` from `manifest`
    pub fn load(manifest: &Path, items_name: &str) -> SlnResult<Self> {
        if !manifest.is_file() {
            return Err(SlnError::not_found("Build list", manifest));
        }
        let manifest = absolutize(manifest);
        let document = XmlDocument::load(&manifest)?;
        let base = manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut list = Self {
            manifest: manifest.clone(),
            items_name: items_name.to_string(),
            entries: Vec::new(),
            skipped: Vec::new(),
        };
        let mut index: HashMap<String, usize> = HashMap::new();

        for group in groups(&document.root, "ItemGroup") {
            for item in group.children_named(items_name) {
                list.add_item(item, &base, &mut index);
            }
        }

        if list.entries.is_empty() {
            warn!(
                "Build list {} has no '{}' items",
                manifest.display(),
                items_name
            );
        }
        debug!("Build list {} names {} projects", manifest.display(), list.entries.len());
        Ok(list)
    }

    fn add_item(&mut self, item: &XmlElement, base: &Path, index: &mut HashMap<String, usize>) {
        let Some(include) = item.attr("Include") else {
            return;
        };

        let excluded: HashSet<String> = item
            .attr("Exclude")
            .into_iter()
            .flat_map(|exclude| exclude.split(';'))
            .filter_map(|part| expand(part, base))
            .flat_map(|part| resolve(&part, base))
            .map(|path| path_key(&path))
            .collect();
        let configurations = item_configurations(item);

        for part in include.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some(expanded) = expand(part, base) else {
                warn!("Skipping build list entry '{}': unexpanded property", part);
                self.skipped.push(part.to_string());
                continue;
            };
            for path in resolve(&expanded, base) {
                let key = path_key(&path);
                if excluded.contains(&key) {
                    continue;
                }
                match index.get(&key) {
                    Some(&existing) => {
                        let entry = &mut self.entries[existing];
                        for config in &configurations {
                            if !entry.configurations.contains(config) {
                                entry.configurations.push(config.clone());
                            }
                        }
                    },
                    None => {
                        index.insert(key, self.entries.len());
                        self.entries.push(BuildListEntry {
                            path,
                            configurations: configurations.clone(),
                        });
                    },
                }
            }
        }
    }

    /// Listed project paths in list order
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    /// Distinct configurations named by any entry, first-seen order
    pub fn implied_configurations(&self) -> Vec<BuildConfiguration> {
        let mut configurations: Vec<BuildConfiguration> = Vec::new();
        for config in self.entries.iter().flat_map(|e| &e.configurations) {
            if !configurations.iter().any(|c| c.matches(config)) {
                configurations.push(config.clone());
            }
        }
        configurations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Expand directory macros; `None` when other macros remain
fn expand(include: &str, base: &Path) -> Option<String> {
    let trimmed = include.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut text = trimmed.to_string();
    for dir_macro in ["$(MSBuildThisFileDirectory)", "$(MSBuildProjectDirectory)\\", "$(MSBuildProjectDirectory)"] {
        if text.contains(dir_macro) {
            text = text.replace(dir_macro, &format!("{}/", base.display()));
        }
    }
    if text.contains("$(") {
        None
    } else {
        Some(text)
    }
}

/// Resolve an include to files, expanding wildcards against the file system
fn resolve(include: &str, base: &Path) -> Vec<PathBuf> {
    let native = msbuild_to_native(include);
    if !include.contains('*') && !include.contains('?') {
        let absolute = if native.is_absolute() {
            native
        } else {
            base.join(native)
        };
        return vec![normalize_path(&absolute)];
    }

    let pattern = if native.is_absolute() {
        normalize_path(&native).to_string_lossy().into_owned()
    } else {
        format!(
            "{}/{}",
            glob::Pattern::escape(&base.to_string_lossy()),
            normalize_path(&native).to_string_lossy()
        )
    };
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    match glob::glob_with(&pattern, options) {
        Ok(paths) => {
            let mut matched: Vec<PathBuf> = paths
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .map(|p| normalize_path(&p))
                .collect();
            matched.sort_by_key(|p| path_key(p));
            matched
        },
        Err(e) => {
            warn!("Invalid wildcard '{}': {}", include, e);
            Vec::new()
        },
    }
}

/// Configuration metadata of a list item, as attributes or child elements
fn item_configurations(item: &XmlElement) -> Vec<BuildConfiguration> {
    let metadata = |name: &str| -> Option<String> {
        item.attr(name)
            .or_else(|| item.child_text(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut properties: HashMap<String, String> = HashMap::new();
    for name in ["AdditionalProperties", "Properties"] {
        if let Some(value) = metadata(name) {
            for pair in value.split(';') {
                if let Some((key, value)) = pair.split_once('=') {
                    properties.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
                }
            }
        }
    }

    let configuration = metadata("Configuration").or_else(|| properties.get("configuration").cloned());
    let platform = metadata("Platform").or_else(|| properties.get("platform").cloned());

    match (configuration, platform) {
        (Some(configuration), Some(platform)) => {
            vec![BuildConfiguration::new(configuration, platform)]
        },
        (Some(configuration), None) => vec![BuildConfiguration::new(configuration, "AnyCPU")],
        _ => Vec::new(),
    }
}
