//! AST Provider Interface
//!
//! The tree builder never talks to a native parser directly. Anything that
//! can hand out `TranslationUnit`s for a path implements `AstProvider`.
//!
//! @module ast

pub mod builder;
pub mod json;
pub mod types;

pub use builder::UnitBuilder;
pub use json::JsonProvider;
pub use types::{
    Access, Cursor, CursorFlags, CursorId, CursorKind, Diagnostic, Extent, Severity,
    SourceLocation, Token, TokenKind, TranslationUnit, TypeInfo,
};

use std::path::Path;

use crate::core::error::Result;

/// Source of parsed translation units
pub trait AstProvider {
    /// Parse one documented file
    fn parse(&mut self, path: &Path) -> Result<TranslationUnit>;
}
