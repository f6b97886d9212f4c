//! Free Function Grouping
//!
//! C libraries model objects as a struct plus free functions
//! (`foo_new`, `foo_free(struct foo *)`). When such a function has no
//! enclosing scope, the tree asks a `StructAffinity` which types to try as
//! its owner.
//!
//! @module tree/affinity

use smallvec::SmallVec;

use super::node::FunctionInfo;
use crate::ast::TypeInfo;
use crate::core::config::TreeConfig;

/// Policy choosing candidate owner types for a free function
pub trait StructAffinity {
    /// Types to try in order; the first naming a struct, enum or typedef node wins
    fn candidates<'a>(&self, name: &str, function: &'a FunctionInfo) -> SmallVec<[&'a TypeInfo; 2]>;
}

/// Constructor-like names (`hint_` prefix or `_hint` suffix) group by return
/// type, everything else by the type of the first argument
#[derive(Debug, Clone)]
pub struct NameHintAffinity {
    hints: Vec<String>,
}

impl NameHintAffinity {
    pub fn new<I, S>(hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hints: hints.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &TreeConfig) -> Self {
        Self::new(config.constructor_hints.iter().cloned())
    }

    pub fn is_constructor(&self, name: &str) -> bool {
        self.hints.iter().any(|hint| {
            name.strip_prefix(hint.as_str())
                .map_or(false, |rest| rest.starts_with('_'))
                || name
                    .strip_suffix(hint.as_str())
                    .map_or(false, |rest| rest.ends_with('_'))
        })
    }
}

impl Default for NameHintAffinity {
    fn default() -> Self {
        Self::from_config(&TreeConfig::default())
    }
}

impl StructAffinity for NameHintAffinity {
    fn candidates<'a>(&self, name: &str, function: &'a FunctionInfo) -> SmallVec<[&'a TypeInfo; 2]> {
        let mut out = SmallVec::new();

        if self.is_constructor(name) {
            if let Some(ret) = &function.return_type {
                out.push(ret);
            }
        }
        if let Some(first) = function.arguments.first() {
            out.push(&first.ty);
        }

        out
    }
}
