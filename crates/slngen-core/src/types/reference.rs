//! Project and assembly reference types.
//!
//! Reference items are classified once, at parse time, into a closed set of
//! kinds so that later stages never look at raw element names.

use super::ProjectId;
use serde::{Deserialize, Serialize};

/// Kind of a reference item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `ProjectReference`: points at another project file
    Project,
    /// `Reference`: points at a compiled assembly, never traversed
    Assembly,
    /// Any other `*Reference` item (COM, native, web...)
    Unknown,
}

/// A reference declared by a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    /// Raw `Include` attribute
    pub include: String,
    /// `<Project>` metadata of a project reference
    pub project_guid: Option<ProjectId>,
    /// `<Name>` metadata
    pub name: Option<String>,
    /// `<HintPath>` metadata of an assembly reference
    pub hint_path: Option<String>,
}

impl ReferenceKind {
    /// Classify an item element name.
    ///
    /// Returns `None` for items that are not references at all, and for
    /// `PackageReference`, which names an external package.
    pub fn classify(element: &str) -> Option<Self> {
        match element {
            "ProjectReference" => Some(ReferenceKind::Project),
            "Reference" => Some(ReferenceKind::Assembly),
            "PackageReference" => None,
            other if other.ends_with("Reference") || other == "WebReferenceUrl" => {
                Some(ReferenceKind::Unknown)
            },
            _ => None,
        }
    }
}

impl Reference {
    /// Create a project reference to a relative project path
    pub fn project(include: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Project,
            include: include.into(),
            project_guid: None,
            name: None,
            hint_path: None,
        }
    }

    /// Create an assembly reference
    pub fn assembly(include: impl Into<String>) -> Self {
        Self {
            kind: ReferenceKind::Assembly,
            include: include.into(),
            project_guid: None,
            name: None,
            hint_path: None,
        }
    }

    /// Simple assembly name: `Foo` for `Foo, Version=1.0.0.0, Culture=neutral`
    pub fn assembly_name(&self) -> &str {
        self.include
            .split(',')
            .next()
            .map(str::trim)
            .unwrap_or_default()
    }
}
