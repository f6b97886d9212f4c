//! Documented Source Set
//!
//! The files whose symbols end up in the documentation. Translation units
//! are processed sources first, then headers, so a header's declarations
//! are attributed to it only when no source file pulled it in earlier.
//!
//! @module core/sources

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::config::TreeConfig;

/// Ordered set of documented files
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    ordered: Vec<PathBuf>,
    members: HashSet<PathBuf>,
}

impl SourceSet {
    /// Build the set, classifying headers by extension
    pub fn new<I, P>(paths: I, config: &TreeConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut set = Self::default();
        let mut headers = Vec::new();

        for path in paths {
            let path = path.as_ref().to_path_buf();
            if !set.members.insert(path.clone()) {
                continue;
            }

            let is_header = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| config.header_extensions.iter().any(|h| h.eq_ignore_ascii_case(e)))
                .unwrap_or(false);

            if is_header {
                headers.push(path);
            } else {
                set.ordered.push(path);
            }
        }

        set.ordered.extend(headers);
        set
    }

    /// Whether a file is documented
    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains(path)
    }

    /// Files in processing order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.ordered.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
