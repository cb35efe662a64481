//! Project discovery
//!
//! The pipeline takes its project paths from a [`CorpusSource`]: either a
//! recursive directory walk or an authoritative build list. The choice is made
//! once, at the top of a run.

use crate::manifest::AuthoritativeBuildList;
use slngen_config::DiscoverySettings;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::types::BuildConfiguration;
use slngen_core::utils::path::{absolutize, get_extension, path_key};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Where the project paths of a run come from
pub trait CorpusSource: Send + Sync {
    /// Project files to parse, in a deterministic order
    fn candidate_paths(&self) -> SlnResult<Vec<PathBuf>>;

    /// Solution configurations requested by the source itself
    fn implied_configurations(&self) -> Vec<BuildConfiguration> {
        Vec::new()
    }

    /// Conditions found while listing the candidates
    fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new()
    }

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Recursive search below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryDiscovery {
    root: PathBuf,
    settings: DiscoverySettings,
}

/// Projects named by an authoritative build list
#[derive(Debug, Clone)]
pub struct ManifestList {
    list: AuthoritativeBuildList,
}

impl DirectoryDiscovery {
    /// Create a discovery source; the root must be an existing directory
    pub fn new(root: &Path, settings: DiscoverySettings) -> SlnResult<Self> {
        if !root.is_dir() {
            return Err(SlnError::not_found("Search directory", root));
        }
        Ok(Self {
            root: absolutize(root),
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CorpusSource for DirectoryDiscovery {
    fn candidate_paths(&self) -> SlnResult<Vec<PathBuf>> {
        discover_projects(&self.root, &self.settings)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

impl ManifestList {
    pub fn new(list: AuthoritativeBuildList) -> Self {
        Self { list }
    }

    pub fn list(&self) -> &AuthoritativeBuildList {
        &self.list
    }
}

impl CorpusSource for ManifestList {
    fn candidate_paths(&self) -> SlnResult<Vec<PathBuf>> {
        Ok(self.list.paths())
    }

    fn implied_configurations(&self) -> Vec<BuildConfiguration> {
        self.list.implied_configurations()
    }

    fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for include in &self.list.skipped {
            diagnostics.record(
                DiagnosticKind::ListEntrySkipped,
                self.list.manifest.display().to_string(),
                format!("{} uses a property that cannot be expanded", include),
            );
        }
        diagnostics
    }

    fn describe(&self) -> String {
        format!("build list {} ({})", self.list.manifest.display(), self.list.items_name)
    }
}

/// All files below `root`, skipping excluded directories, sorted by path key
pub fn walk_files(root: &Path, settings: &DiscoverySettings) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !settings.is_excluded_dir(&entry.file_name().to_string_lossy())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();

    files.sort_by_key(|path| path_key(path));
    files
}

/// Find project files below `root`
pub fn discover_projects(root: &Path, settings: &DiscoverySettings) -> SlnResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SlnError::not_found("Search directory", root));
    }

    let mut projects: Vec<PathBuf> = walk_files(root, settings)
        .into_iter()
        .filter(|path| {
            get_extension(path).is_some_and(|extension| settings.is_project_extension(&extension))
        })
        .map(|path| absolutize(&path))
        .collect();

    projects.sort_by_key(|path| path_key(path));
    projects.dedup_by_key(|path| path_key(path));
    debug!("Discovered {} project files under {}", projects.len(), root.display());
    Ok(projects)
}
