//! Terminal output formatting and utilities.
//!
//! This module provides consistent output formatting across all commands,
//! including colors, error messages and the end-of-run diagnostics summary.

pub mod colors;
pub mod errors;
pub mod report;

use slngen_core::diagnostics::Diagnostics;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("✗"), message);
    }

    /// Print a headline for a phase of the run
    pub fn step(&self, message: &str) {
        println!("{}", self.colors.bold(message));
    }

    /// Print every diagnostic of a run followed by per-kind totals
    pub fn diagnostics(&self, diagnostics: &Diagnostics) {
        if diagnostics.is_empty() {
            return;
        }

        for diagnostic in diagnostics.iter() {
            let line = format!("{}: {}: {}", diagnostic.kind, diagnostic.subject, diagnostic.message);
            if diagnostic.kind.is_error() {
                self.error(&line);
            } else {
                self.warn(&line);
            }
        }

        let totals: Vec<String> = diagnostics
            .summary()
            .into_iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        self.info(&format!("Diagnostics: {}", totals.join(", ")));
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
