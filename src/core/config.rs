//! Configuration management

use crate::core::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub comments: CommentConfig,
    pub tree: TreeConfig,
    pub provider: ProviderConfig,
    pub merge: MergeConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentConfig {
    /// Prefix of in-comment instructions (`cldoc:begin-category(...)`)
    pub instruction_marker: String,
    /// Character right after the comment opener that hides a comment
    pub ignore_marker: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Name affixes marking a free function as a constructor of its return type
    pub constructor_hints: Vec<String>,
    /// Extensions treated as headers when ordering the documented files
    pub header_extensions: Vec<String>,
}

/// Options handed to the AST provider when it is initialized
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Extra compiler flags
    pub flags: Vec<String>,
    /// Source language passed with `-x`
    pub language: String,
    /// Location of the native parser library, if not on the default path
    pub library_path: Option<PathBuf>,
}

/// External description files merged into the tree
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Markdown files or directories searched for them
    pub files: Vec<PathBuf>,
    /// Program every file is passed through before merging
    pub filter: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `CXXDOC_LOG` is not set
    pub filter: String,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            instruction_marker: "cldoc".to_string(),
            ignore_marker: '-',
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            constructor_hints: vec![
                "new".to_string(),
                "init".to_string(),
                "alloc".to_string(),
                "create".to_string(),
            ],
            header_extensions: vec![
                "h".to_string(),
                "hh".to_string(),
                "hpp".to_string(),
                "hxx".to_string(),
            ],
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            flags: vec![],
            language: "c++".to_string(),
            library_path: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Full argument list for the parser: language selection followed by user flags
    pub fn arguments(&self) -> Vec<String> {
        let mut args = vec!["-x".to_string(), self.language.clone()];
        args.extend(self.flags.iter().cloned());
        args
    }
}

impl Config {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::from_file(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = Self::cxxdoc_home()?;
        Ok(home.join("config.toml"))
    }

    /// Get the cxxdoc home directory
    pub fn cxxdoc_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("CXXDOC_HOME") {
            return Ok(PathBuf::from(home));
        }

        ProjectDirs::from("dev", "cxxdoc", "cxxdoc")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| Error::ConfigError {
                message: "Could not determine cxxdoc home directory".to_string(),
            })
    }

    fn validate(&self) -> Result<()> {
        let marker = &self.comments.instruction_marker;
        if marker.is_empty() || !marker.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::ConfigError {
                message: format!("instruction marker `{}` must be a plain identifier", marker),
            });
        }
        if self.tree.constructor_hints.iter().any(|h| h.is_empty()) {
            return Err(Error::ConfigError {
                message: "constructor hints must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
