//! Configuration schema (autovault.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Generator configuration
///
/// Relative paths are resolved against `project_root`, which is the directory
/// holding the config file when loaded with [`GeneratorConfig::from_file`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Staging model template (`${source}`, `${hashdiff}`, ...)
    pub staging_template_path: PathBuf,

    /// Satellite hash diff template (`${hashdiff_name}`, `${columns}`)
    pub sat_hashdiff_template_path: PathBuf,

    /// Hub name -> abbreviation dictionary used for link names
    pub name_dictionary_path: PathBuf,

    /// Where stg_*.sql files are written
    pub output_directory: PathBuf,

    /// Where metadata files are discovered when none are given explicitly
    pub metadata_directory: PathBuf,

    /// Keep going after a file fails instead of aborting the batch
    pub continue_on_error: bool,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            staging_template_path: PathBuf::from("templates/staging_model.sql"),
            sat_hashdiff_template_path: PathBuf::from("templates/sat_hashdiff.sql"),
            name_dictionary_path: PathBuf::from("name_dictionary.json"),
            output_directory: PathBuf::from("models/raw_vault/stages"),
            metadata_directory: PathBuf::from("source_metadata"),
            continue_on_error: false,
            project_root: PathBuf::new(),
        }
    }
}

impl GeneratorConfig {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        tracing::debug!(config = %path.display(), "loaded generator config");

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Replace the output directory with a path relative to `working_directory`
    ///
    /// Command-line paths are relative to where the command runs, not to the
    /// config file, so the result is stored already resolved.
    pub fn override_output_directory(&mut self, path: &Path, working_directory: &Path) {
        self.output_directory = working_directory.join(path);
    }

    pub fn staging_template(&self) -> PathBuf {
        self.resolve(&self.staging_template_path)
    }

    pub fn sat_hashdiff_template(&self) -> PathBuf {
        self.resolve(&self.sat_hashdiff_template_path)
    }

    pub fn name_dictionary(&self) -> PathBuf {
        self.resolve(&self.name_dictionary_path)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.resolve(&self.output_directory)
    }

    pub fn metadata_directory(&self) -> PathBuf {
        self.resolve(&self.metadata_directory)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.output_directory, PathBuf::from("models/raw_vault/stages"));
        assert_eq!(config.name_dictionary(), PathBuf::from("name_dictionary.json"));
        assert!(!config.continue_on_error);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml(
            r#"
            output_directory = "out"
            continue_on_error = true
            "#,
        )
        .unwrap();

        assert_eq!(config.output_directory, PathBuf::from("out"));
        assert!(config.continue_on_error);
        assert_eq!(config.staging_template_path, PathBuf::from("templates/staging_model.sql"));
    }

    #[test]
    fn invalid_toml() {
        let err = GeneratorConfig::from_toml("output_directory = [").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn paths_resolve_against_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("autovault.toml");
        std::fs::write(&config_path, "name_dictionary_path = \"dicts/names.json\"\n").unwrap();

        let config = GeneratorConfig::from_file(&config_path).unwrap();
        assert_eq!(config.project_root, dir.path());
        assert_eq!(config.name_dictionary(), dir.path().join("dicts/names.json"));
        assert_eq!(config.output_directory(), dir.path().join("models/raw_vault/stages"));
    }

    #[test]
    fn absolute_paths_are_kept() {
        let mut config = GeneratorConfig::default();
        config.project_root = PathBuf::from("/project");
        config.output_directory = PathBuf::from("/var/out");

        assert_eq!(config.output_directory(), PathBuf::from("/var/out"));
        assert_eq!(config.staging_template(), PathBuf::from("/project/templates/staging_model.sql"));
    }

    #[test]
    fn output_override_ignores_project_root() {
        let mut config = GeneratorConfig::default();
        config.project_root = PathBuf::from("/project");

        config.override_output_directory(Path::new("out"), Path::new("/work"));
        assert_eq!(config.output_directory(), PathBuf::from("/work/out"));

        config.override_output_directory(Path::new("/var/stages"), Path::new("/work"));
        assert_eq!(config.output_directory(), PathBuf::from("/var/stages"));
    }

    #[test]
    fn config_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autovault.toml");

        let mut config = GeneratorConfig::default();
        config.continue_on_error = true;
        config.save_to_file(&path).unwrap();

        let loaded = GeneratorConfig::from_file(&path).unwrap();
        assert!(loaded.continue_on_error);
        assert_eq!(loaded.metadata_directory, config.metadata_directory);
    }
}
