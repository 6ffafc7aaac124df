//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Main configuration struct matching the courseweave.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub course: CourseConfig,
    pub paths: PathsConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub format: FormatConfig,

    /// Media files kept even when no page references them
    #[serde(default)]
    pub keep_media: Vec<String>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub intro: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub content: PathBuf,
    pub output: PathBuf,

    #[serde(default)]
    pub media: Option<PathBuf>,

    #[serde(default)]
    pub templates: Option<PathBuf>,
}

/// Exclusion rules applied by the loader before any pass runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Theme names
    #[serde(default)]
    pub exclude_themes: Vec<String>,

    /// `theme/module` pairs
    #[serde(default)]
    pub exclude_modules: Vec<String>,

    /// `theme/module/file` triples
    #[serde(default)]
    pub exclude_steps: Vec<String>,

    /// When non-empty, only modules with one of these levels are built
    #[serde(default)]
    pub levels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_format_command")]
    pub command: String,

    #[serde(default = "default_format_args")]
    pub args: Vec<String>,
}

fn default_format_command() -> String {
    String::from("tidy")
}

fn default_format_args() -> Vec<String> {
    vec!["-q".into(), "-m".into(), "-utf8".into()]
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_format_command(),
            args: default_format_args(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from YAML text; paths stay relative to the cwd
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        if config.course.title.trim().is_empty() {
            return Err(ConfigError::MissingField("course.title".to_string()));
        }
        Ok(config)
    }

    /// Build a configuration in code (used by embedders and tests)
    pub fn new(title: &str, content: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            course: CourseConfig {
                title: title.to_string(),
                description: None,
                intro: None,
            },
            paths: PathsConfig {
                content: content.into(),
                output: output.into(),
                media: None,
                templates: None,
            },
            filter: FilterConfig::default(),
            format: FormatConfig::default(),
            keep_media: Vec::new(),
            config_path: None,
        }
    }

    /// Get the content directory, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Get the source media directory, if one is configured
    pub fn media_dir(&self) -> Option<PathBuf> {
        self.paths.media.as_ref().map(|p| self.resolve_path(p))
    }

    /// Get the template override directory (None means built-in only)
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.paths.templates.as_ref().map(|p| self.resolve_path(p))
    }

    /// Resolve an arbitrary path relative to the config file location
    pub fn resolve_relative(&self, path: &Path) -> PathBuf {
        self.resolve_path(path)
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(parent) = self.config_path.as_ref().and_then(|p| p.parent()) {
            parent.join(path)
        } else {
            path.to_path_buf()
        }
    }
}
