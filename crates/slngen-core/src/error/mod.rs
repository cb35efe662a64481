//! Error types and result aliases for slngen operations.
//!
//! Provides a unified error type that covers all possible error conditions
//! across the slngen crates with actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all slngen operations
#[derive(Error, Debug)]
pub enum SlnError {
    // Input errors
    #[error("{what} not found: {}", path.display())]
    InputNotFound { what: String, path: PathBuf },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    // Graph errors
    #[error("Unresolved project reference from {from} to {target}")]
    UnresolvedReference { from: String, target: String },

    #[error("Circular dependency detected: {cycle}")]
    CycleDetected { cycle: String },

    // Conversion errors
    #[error("Cannot convert reference in {}: {reason}", project.display())]
    Conversion { project: PathBuf, reason: String },

    // Config errors
    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Output errors
    #[error("Failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for slngen operations
pub type SlnResult<T> = Result<T, SlnError>;

impl SlnError {
    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Create a parse error for a file
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error for a required input
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Check if this error only affects a single item of a run
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SlnError::Parse { .. }
                | SlnError::UnresolvedReference { .. }
                | SlnError::CycleDetected { .. }
                | SlnError::Conversion { .. }
                | SlnError::Write { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SlnError::InputNotFound { .. } => {
                Some("Check that the directory or build list path exists and is readable")
            },
            SlnError::Parse { .. } => {
                Some("Open the project file in an editor and fix the malformed XML")
            },
            SlnError::UnresolvedReference { .. } => {
                Some("Make sure the referenced project is under the search root or in the build list")
            },
            SlnError::CycleDetected { .. } => {
                Some("Remove circular project references by restructuring your projects")
            },
            SlnError::ConfigValidation { .. } => Some("Check slngen.toml and SLNGEN_* variables"),
            SlnError::Write { .. } => {
                Some("Check that the output directory exists and is writable")
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SlnError::not_found("Search directory", "/missing/dir");
        assert_eq!(err.to_string(), "Search directory not found: /missing/dir");

        let err = SlnError::parse("/src/App.csproj", "unexpected end of file");
        assert!(err.to_string().contains("App.csproj"));
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_recoverable() {
        assert!(SlnError::parse("a.csproj", "bad").is_recoverable());
        assert!(!SlnError::not_found("Build list", "list.proj").is_recoverable());
        assert!(SlnError::CycleDetected {
            cycle: "A -> B -> A".to_string()
        }
        .is_recoverable());
    }

    #[test]
    fn test_suggestions() {
        assert!(SlnError::not_found("Build list", "x").suggestion().is_some());
        let io = SlnError::io(
            "boom".to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(io.suggestion().is_none());
    }
}
