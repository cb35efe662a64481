//! JSON run report written with `--report`

use serde::Serialize;
use slngen_core::diagnostics::{DiagnosticKind, Diagnostics};
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::utils::write_atomic;
use std::path::Path;

/// Machine-readable outcome of one command
#[derive(Debug, Serialize)]
pub struct RunReport<'a, S: Serialize> {
    pub command: &'a str,
    pub version: &'static str,
    pub summary: &'a S,
    pub totals: Vec<(DiagnosticKind, usize)>,
    pub diagnostics: &'a Diagnostics,
}

impl<'a, S: Serialize> RunReport<'a, S> {
    pub fn new(command: &'a str, summary: &'a S, diagnostics: &'a Diagnostics) -> Self {
        Self {
            command,
            version: env!("CARGO_PKG_VERSION"),
            summary,
            totals: diagnostics.summary(),
            diagnostics,
        }
    }

    /// Serialize as pretty JSON and write atomically
    pub fn write(&self, path: &Path) -> SlnResult<()> {
        let mut json = serde_json::to_vec_pretty(self)
            .map_err(|e| SlnError::io("Failed to serialize run report".to_string(), e.into()))?;
        json.push(b'\n');
        write_atomic(path, &json)
    }
}
