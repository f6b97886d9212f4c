//! cxxdoc - Documentation model for C and C++ sources
//!
//! Turns parsed translation units into a documentation tree: one node per
//! symbol, comments attached from the token stream, categories and C-style
//! struct grouping applied, and `<Name>` references resolved.

pub mod ast;
pub mod cli;
pub mod comments;
pub mod core;
pub mod tree;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
pub use crate::core::sources::SourceSet;
pub use crate::tree::{Tree, TreeBuilder};
