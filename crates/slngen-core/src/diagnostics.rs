//! Aggregated run diagnostics.
//!
//! Recoverable per-item conditions are collected here while a run proceeds
//! and reported together at the end, instead of aborting the run.

use crate::error::SlnError;
use serde::Serialize;
use std::fmt;

/// Category of a recoverable condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseFailed,
    ListEntrySkipped,
    UnresolvedReference,
    CycleDetected,
    DuplicateIdentity,
    DuplicateName,
    UnsupportedConfiguration,
    UnknownReferenceKind,
    ProjectWarning,
    WriteFailed,
    ConversionSkipped,
    FixFailed,
}

/// A single reported condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Project, file or cycle the condition is about
    pub subject: String,
    pub message: String,
}

/// Ordered collection of diagnostics for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl DiagnosticKind {
    /// Check if this condition means part of the requested output is missing
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DiagnosticKind::ParseFailed | DiagnosticKind::WriteFailed | DiagnosticKind::FixFailed
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::ParseFailed => "parse failed",
            DiagnosticKind::ListEntrySkipped => "list entry skipped",
            DiagnosticKind::UnresolvedReference => "unresolved reference",
            DiagnosticKind::CycleDetected => "cycle detected",
            DiagnosticKind::DuplicateIdentity => "duplicate identity",
            DiagnosticKind::DuplicateName => "duplicate name",
            DiagnosticKind::UnsupportedConfiguration => "unsupported configuration",
            DiagnosticKind::UnknownReferenceKind => "unknown reference kind",
            DiagnosticKind::ProjectWarning => "project warning",
            DiagnosticKind::WriteFailed => "write failed",
            DiagnosticKind::ConversionSkipped => "conversion skipped",
            DiagnosticKind::FixFailed => "fix failed",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.kind, self.subject, self.message)
    }
}

impl Diagnostics {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a condition
    pub fn record(
        &mut self,
        kind: DiagnosticKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
        });
    }

    /// Record a recoverable error under the given kind
    pub fn record_error(&mut self, kind: DiagnosticKind, subject: impl Into<String>, error: &SlnError) {
        self.record(kind, subject, error.to_string());
    }

    /// Append all entries of another collection
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Entries of one kind
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if any entry is error-level
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.kind.is_error())
    }

    /// Count per kind, sorted by kind
    pub fn summary(&self) -> Vec<(DiagnosticKind, usize)> {
        let mut counts: Vec<(DiagnosticKind, usize)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(kind, _)| *kind == entry.kind) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.kind, 1)),
            }
        }
        counts.sort_by_key(|(kind, _)| *kind);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());

        diagnostics.record(DiagnosticKind::UnresolvedReference, "App", "..\\Missing\\Missing.csproj");
        diagnostics.record(DiagnosticKind::UnresolvedReference, "Tool", "..\\Gone\\Gone.csproj");
        diagnostics.record(DiagnosticKind::CycleDetected, "A -> B -> A", "2 projects");

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.count(DiagnosticKind::UnresolvedReference), 2);
        assert!(!diagnostics.has_errors());
        assert_eq!(
            diagnostics.summary(),
            vec![
                (DiagnosticKind::UnresolvedReference, 2),
                (DiagnosticKind::CycleDetected, 1)
            ]
        );
    }

    #[test]
    fn test_errors_and_extend() {
        let mut first = Diagnostics::new();
        let mut second = Diagnostics::new();
        second.record_error(
            DiagnosticKind::ParseFailed,
            "Broken.csproj",
            &SlnError::parse("Broken.csproj", "unexpected end of file"),
        );
        first.extend(second);

        assert!(first.has_errors());
        let entry = first.iter().next().unwrap();
        assert!(entry.to_string().starts_with("parse failed [Broken.csproj]"));
    }

    #[test]
    fn test_serializes_kind_as_snake_case() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(DiagnosticKind::DuplicateName, "Core", "2 projects named Core");
        let json = serde_json::to_string(&diagnostics).unwrap();
        assert!(json.contains("\"duplicate_name\""));
    }
}
