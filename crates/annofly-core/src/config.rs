//! Configuration for annofly (annofly.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Template discovery settings
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Batch validation settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Project root directory (set when loading from a file)
    #[serde(skip)]
    pub project_root: PathBuf,
}

/// Template discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory searched when a bare template name is given
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

/// Batch validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Default path for the JSON report
    #[serde(default = "default_batch_report")]
    pub report: PathBuf,

    /// Stop the run once this many records are invalid (0 = no limit)
    #[serde(default)]
    pub max_invalid: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            report: default_batch_report(),
            max_invalid: 0,
        }
    }
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_batch_report() -> PathBuf {
    PathBuf::from("batch-report.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates: TemplatesConfig::default(),
            batch: BatchConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        // Set project root to the config file's directory
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve a template argument to a file path
    ///
    /// A bare name (no separator, no extension) resolves inside the
    /// configured templates directory; anything else is taken as a path
    /// relative to the project root.
    pub fn resolve_template(&self, template: &str) -> PathBuf {
        let given = Path::new(template);
        let is_bare = given.extension().is_none()
            && !template.contains('/')
            && !template.contains(std::path::MAIN_SEPARATOR);
        if is_bare {
            self.project_root
                .join(&self.templates.dir)
                .join(format!("{}.json", template))
        } else if given.is_absolute() {
            given.to_path_buf()
        } else {
            self.project_root.join(given)
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
}
