//! Configuration layering, fallback logic, and environment overrides

use crate::settings::SlnGenConfig;
use crate::toml::{load_from_file, SlnGenToml};
use crate::{ConfigResult, CONFIG_FILE_NAME};
use slngen_core::error::SlnError;
use slngen_core::types::UnsupportedConfigPolicy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment variables that override configuration
pub const ENV_PREFIX: &str = "SLNGEN_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file (~/.slngen/config.toml)
    Global(PathBuf),
    /// Project slngen.toml found from the working directory upwards
    Project(PathBuf),
    /// File named with --config
    Explicit(PathBuf),
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: PathBuf) -> Self {
        Self { cwd }
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.is_file())
    }

    /// Load the project layer, preferring an explicitly named file
    pub fn load_project_config(
        &self,
        explicit: Option<&Path>,
    ) -> ConfigResult<Option<(SlnGenToml, ConfigSource)>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SlnError::not_found("Configuration file", path));
            }
            let config = load_from_file(path)?;
            return Ok(Some((config, ConfigSource::Explicit(path.to_path_buf()))));
        }

        match self.resolve_config_path(CONFIG_FILE_NAME) {
            Some(path) => {
                let config = load_from_file(&path)?;
                Ok(Some((config, ConfigSource::Project(path))))
            },
            None => Ok(None),
        }
    }

    /// Load global configuration
    pub fn load_global_config(&self) -> ConfigResult<Option<(SlnGenToml, ConfigSource)>> {
        let Some(home_dir) = dirs::home_dir() else {
            return Ok(None);
        };

        let global_config_path = home_dir.join(".slngen").join("config.toml");
        if global_config_path.is_file() {
            let config = load_from_file(&global_config_path)?;
            Ok(Some((config, ConfigSource::Global(global_config_path))))
        } else {
            Ok(None)
        }
    }

    /// Resolve the effective configuration from every layer
    pub fn load(
        &self,
        explicit: Option<&Path>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<SlnGenConfig> {
        let global = self.load_global_config()?;
        let project = self.load_project_config(explicit)?;

        for (_, source) in global.iter().chain(project.iter()) {
            debug!("Using configuration from {:?}", source);
        }

        ConfigLayering::merge_configs(
            global.map(|(config, _)| config),
            project.map(|(config, _)| config),
            &ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )
    }
}

impl ConfigLayering {
    /// Merge multiple configuration layers onto the defaults
    pub fn merge_configs(
        global_config: Option<SlnGenToml>,
        project_config: Option<SlnGenToml>,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<SlnGenConfig> {
        let mut merged = SlnGenConfig::default();

        if let Some(global) = global_config {
            global.apply_to(&mut merged);
        }
        if let Some(project) = project_config {
            project.apply_to(&mut merged);
        }

        // Apply environment variable overrides
        for (key, value) in env_overrides {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                Self::apply_override(&mut merged, &name.to_ascii_lowercase(), value, key)?;
            }
        }

        // Apply CLI flag overrides (highest priority)
        for (key, value) in cli_overrides {
            Self::apply_override(&mut merged, key, value, key)?;
        }

        Ok(merged)
    }

    /// Apply one named override; `origin` names the variable or flag in errors
    fn apply_override(
        config: &mut SlnGenConfig,
        key: &str,
        value: &str,
        origin: &str,
    ) -> ConfigResult<()> {
        let invalid = |reason: String| SlnError::ConfigValidation {
            field: origin.to_string(),
            reason,
        };

        match key {
            "parallel" => {
                config.discovery.parallel = parse_bool(value)
                    .ok_or_else(|| invalid(format!("expected true or false, got '{}'", value)))?;
            },
            "jobs" => {
                config.discovery.jobs = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("expected a number, got '{}'", value)))?;
            },
            "unsupported_config" => {
                config.solution.unsupported_config = UnsupportedConfigPolicy::parse(value)
                    .ok_or_else(|| {
                        invalid(format!("expected closest, skip or include, got '{}'", value))
                    })?;
            },
            "nest_folders" => {
                config.solution.nest_folders = parse_bool(value)
                    .ok_or_else(|| invalid(format!("expected true or false, got '{}'", value)))?;
            },
            "items_name" => {
                config.build_list.items_name = value.trim().to_string();
            },
            "convert_configuration" => {
                config.convert.configuration = value.trim().to_string();
            },
            "convert_platform" => {
                config.convert.platform = value.trim().to_string();
            },
            _ => {
                // Unknown override, ignore
                debug!("Ignoring unknown configuration override {}", origin);
            },
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toml::parse_slngen_toml;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_config_path_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[solution]\nnest_folders = false\n").unwrap();

        let nested = temp_dir.path().join("src").join("App");
        std::fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::new(nested);
        assert_eq!(loader.resolve_config_path(CONFIG_FILE_NAME), Some(config_path));
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[build_list]\nitems_name = \"Official\"\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        let (config, source) = loader.load_project_config(None).unwrap().unwrap();

        assert_eq!(config.build_list.items_name.as_deref(), Some("Official"));
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path().to_path_buf());
        let missing = temp_dir.path().join("missing.toml");

        let result = loader.load_project_config(Some(&missing));
        assert!(matches!(result, Err(SlnError::InputNotFound { .. })));
    }

    #[test]
    fn test_merge_configs() {
        let global = parse_slngen_toml(
            "[solution]\nnest_folders = false\nunsupported_config = \"include\"\n[discovery]\njobs = 2\n",
        )
        .unwrap();
        let project = parse_slngen_toml("[solution]\nunsupported_config = \"skip\"\n").unwrap();

        let env_overrides = HashMap::from([
            ("SLNGEN_JOBS".to_string(), "8".to_string()),
            ("SLNGEN_ITEMS_NAME".to_string(), "FromEnv".to_string()),
        ]);
        let cli_overrides = HashMap::from([("parallel".to_string(), "false".to_string())]);

        let merged =
            ConfigLayering::merge_configs(Some(global), Some(project), &env_overrides, &cli_overrides)
                .unwrap();

        // Global value survives where the project is silent
        assert!(!merged.solution.nest_folders);
        // Project overrides global
        assert_eq!(merged.solution.unsupported_config, UnsupportedConfigPolicy::Skip);
        // Environment overrides files
        assert_eq!(merged.discovery.jobs, 8);
        assert_eq!(merged.build_list.items_name, "FromEnv");
        // CLI override applied last
        assert!(!merged.discovery.parallel);
    }

    #[test]
    fn test_invalid_override() {
        let env_overrides = HashMap::from([("SLNGEN_PARALLEL".to_string(), "maybe".to_string())]);
        let result = ConfigLayering::merge_configs(None, None, &env_overrides, &HashMap::new());

        match result {
            Err(SlnError::ConfigValidation { field, .. }) => assert_eq!(field, "SLNGEN_PARALLEL"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_env_overrides() {
        std::env::set_var("SLNGEN_TEST_MARKER", "1");
        std::env::set_var("NOT_SLNGEN_VAR", "ignored");

        let overrides = ConfigLayering::collect_env_overrides();

        assert!(overrides.contains_key("SLNGEN_TEST_MARKER"));
        assert!(!overrides.contains_key("NOT_SLNGEN_VAR"));

        std::env::remove_var("SLNGEN_TEST_MARKER");
        std::env::remove_var("NOT_SLNGEN_VAR");
    }
}
