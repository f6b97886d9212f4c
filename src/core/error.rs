//! Error types for cxxdoc

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using cxxdoc's Error
pub type Result<T> = std::result::Result<T, Error>;

/// cxxdoc error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid {marker} instruction `{instruction}` at {location}")]
    InvalidInstruction {
        marker: String,
        instruction: String,
        location: String,
    },

    #[error("No category name specified (or too many) at {location}")]
    MissingCategoryName { location: String },

    #[error("Failed to end category at {location}: too many arguments")]
    EndCategoryArguments { location: String },

    #[error("Failed to end category at {location}: no category to end")]
    NoCategoryToEnd { location: String },

    #[error("Failed to end category `{requested}` at {location}: current category is `{current}`")]
    CategoryMismatch {
        requested: String,
        current: String,
        location: String,
    },

    #[error("Category `{name}` is never closed in {path}")]
    UnclosedCategory { name: String, path: PathBuf },

    #[error("Could not build documentation: {count} parser error(s) in {path}")]
    Diagnostics { path: PathBuf, count: usize },

    #[error("Failed to merge {path}: {message}")]
    Merge { path: PathBuf, message: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
