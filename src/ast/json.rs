//! JSON Dump Provider
//!
//! Serves translation units from a JSON file written by an external
//! clang-based dumper. The dump holds either one unit or
//! `{"units": [...]}`.
//!
//! @module ast/json

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::types::TranslationUnit;
use super::AstProvider;
use crate::core::config::ProviderConfig;
use crate::core::error::{Error, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum Dump {
    Many { units: Vec<TranslationUnit> },
    One(TranslationUnit),
}

/// Provider backed by pre-parsed units
#[derive(Debug)]
pub struct JsonProvider {
    units: HashMap<PathBuf, TranslationUnit>,
    config: ProviderConfig,
}

impl JsonProvider {
    /// Load every unit of a dump file
    pub fn open(path: &Path, config: ProviderConfig) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let units = match serde_json::from_str::<Dump>(&content)? {
            Dump::Many { units } => units,
            Dump::One(unit) => vec![unit],
        };

        debug!(dump = %path.display(), units = units.len(), "Loaded AST dump");
        Self::from_units(units, config)
    }

    /// Serve already constructed units
    pub fn from_units(
        units: impl IntoIterator<Item = TranslationUnit>,
        config: ProviderConfig,
    ) -> Result<Self> {
        let mut map = HashMap::new();
        for unit in units {
            unit.validate()?;
            map.insert(unit.path.clone(), unit);
        }
        Ok(Self { units: map, config })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Paths of the units still available
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.units.keys().map(PathBuf::as_path)
    }
}

impl AstProvider for JsonProvider {
    fn parse(&mut self, path: &Path) -> Result<TranslationUnit> {
        debug!(
            file = %path.display(),
            args = ?self.config.arguments(),
            "Parsing"
        );

        self.units.remove(path).ok_or_else(|| Error::Provider {
            message: format!("no translation unit for {}", path.display()),
        })
    }
}
