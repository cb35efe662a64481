//! Configuration/platform pairs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (configuration, platform) pair such as `Debug|AnyCPU`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildConfiguration {
    pub configuration: String,
    pub platform: String,
}

impl BuildConfiguration {
    /// Create a new configuration pair
    pub fn new(configuration: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            platform: platform.into(),
        }
    }

    /// Parse the MSBuild `Configuration|Platform` notation
    pub fn parse(text: &str) -> Option<Self> {
        let (configuration, platform) = text.trim().split_once('|')?;
        let configuration = configuration.trim();
        let platform = platform.trim();
        if configuration.is_empty() || platform.is_empty() {
            return None;
        }
        Some(Self::new(configuration, platform))
    }

    /// Platform name as written in solution files (`AnyCPU` becomes `Any CPU`)
    pub fn solution_platform(&self) -> String {
        if platform_key(&self.platform) == "anycpu" {
            "Any CPU".to_string()
        } else {
            self.platform.clone()
        }
    }

    /// Platform name as written in project files (`Any CPU` becomes `AnyCPU`)
    pub fn project_platform(&self) -> String {
        if platform_key(&self.platform) == "anycpu" {
            "AnyCPU".to_string()
        } else {
            self.platform.clone()
        }
    }

    /// Solution-side label, e.g. `Debug|Any CPU`
    pub fn solution_label(&self) -> String {
        format!("{}|{}", self.configuration, self.solution_platform())
    }

    /// Compare configuration names only
    pub fn same_configuration(&self, other: &BuildConfiguration) -> bool {
        self.configuration.eq_ignore_ascii_case(&other.configuration)
    }

    /// Exact match ignoring case and spacing of the platform name
    pub fn matches(&self, other: &BuildConfiguration) -> bool {
        self.same_configuration(other) && platform_key(&self.platform) == platform_key(&other.platform)
    }

    /// Match allowing the `x86`/`Win32` aliasing used by C++ projects
    pub fn matches_alias(&self, other: &BuildConfiguration) -> bool {
        if !self.same_configuration(other) {
            return false;
        }
        let a = platform_key(&self.platform);
        let b = platform_key(&other.platform);
        a == b || (is_x86(&a) && is_x86(&b))
    }
}

fn is_x86(key: &str) -> bool {
    key == "x86" || key == "win32"
}

/// Lowercase platform name with spaces removed
pub fn platform_key(platform: &str) -> String {
    platform
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// What to emit for a project that does not declare the requested pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedConfigPolicy {
    /// Map onto the closest declared pair (same configuration, else first declared) and build it
    #[default]
    Closest,
    /// Keep the project in the solution but do not build it for that pair
    Skip,
    /// Map onto the requested pair unconditionally
    Include,
}

impl UnsupportedConfigPolicy {
    /// Parse a policy name (case-insensitive)
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "closest" => Some(Self::Closest),
            "skip" => Some(Self::Skip),
            "include" => Some(Self::Include),
            _ => None,
        }
    }
}

impl fmt::Display for BuildConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.configuration, self.platform)
    }
}
