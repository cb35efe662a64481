//! Terminal color support detection and formatting.
//!
//! Provides automatic color detection that respects the NO_COLOR environment
//! variable and TTY detection, so redirected output stays plain.

use std::env;
use std::io::{self, IsTerminal};

/// Color support detection and formatting
pub struct ColorSupport {
    enabled: bool,
}

impl ColorSupport {
    /// Detect color support automatically
    pub fn detect() -> Self {
        Self {
            enabled: Self::should_use_colors(),
        }
    }

    /// Check if colors should be used
    fn should_use_colors() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        io::stderr().is_terminal() && io::stdout().is_terminal()
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }

    /// Format text in green
    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    /// Format text in yellow
    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    /// Format text in red
    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Format text as dim/gray
    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    /// Format text in bold
    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}
