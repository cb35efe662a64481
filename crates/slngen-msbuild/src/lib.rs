//! MSBuild project handling for slngen
//!
//! This crate reads project files into project descriptors, finds them on
//! disk or in an authoritative build list, and rewrites them in place for the
//! orphan fixer and the reference converter. Rewrites splice text into the
//! original file so untouched bytes survive unchanged.

pub mod convert;
pub mod corpus;
pub mod discovery;
pub mod edit;
pub mod manifest;
pub mod orphans;
pub mod project;
pub mod xml;

// Re-export main types
pub use convert::{ConversionReport, ReferenceConverter};
pub use corpus::{Corpus, CorpusOptions, ParseFailure};
pub use discovery::{discover_projects, CorpusSource, DirectoryDiscovery, ManifestList};
pub use manifest::{AuthoritativeBuildList, BuildListEntry};
pub use orphans::{OrphanFinder, OrphanReport};
pub use project::{parse_project, parse_project_str};
pub use xml::{Span, XmlDocument, XmlElement};
