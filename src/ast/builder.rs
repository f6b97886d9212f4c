//! Translation Unit Builder
//!
//! Assembles a `TranslationUnit` cursor by cursor. Providers that walk a
//! native AST use it to fill the arena, and it keeps hand-written units
//! short.
//!
//! @module ast/builder

use std::path::{Path, PathBuf};

use super::types::{
    Cursor, CursorId, CursorKind, Diagnostic, Extent, Severity, SourceLocation, Token, TokenKind,
    TranslationUnit,
};

/// Incremental builder for a translation unit
pub struct UnitBuilder {
    unit: TranslationUnit,
}

impl UnitBuilder {
    /// Start a unit for `path` with an empty root cursor
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = Cursor::new(CursorKind::TranslationUnit, path.to_string_lossy());

        Self {
            unit: TranslationUnit {
                path,
                root: CursorId(0),
                cursors: vec![root],
                tokens: Default::default(),
                includes: vec![],
                diagnostics: vec![],
            },
        }
    }

    #[inline]
    pub fn root(&self) -> CursorId {
        self.unit.root
    }

    /// Add a declaration at `at`; both parents are set to `parent`
    pub fn declare(
        &mut self,
        parent: CursorId,
        kind: CursorKind,
        spelling: &str,
        usr: &str,
        at: SourceLocation,
    ) -> CursorId {
        let mut cursor = Cursor::new(kind, spelling);
        cursor.usr = usr.to_string();
        cursor.extent = Some(Extent {
            start: at.clone(),
            end: at.clone(),
        });
        cursor.location = Some(at);
        self.push(parent, cursor)
    }

    /// Add a cursor sharing its parent's location (access specifiers, references, ...)
    pub fn child(&mut self, parent: CursorId, kind: CursorKind, spelling: &str) -> CursorId {
        let mut cursor = Cursor::new(kind, spelling);
        let parent_cursor = &self.unit.cursors[parent.index()];
        cursor.location = parent_cursor.location.clone();
        cursor.extent = parent_cursor.extent.clone();
        self.push(parent, cursor)
    }

    /// Add a fully prepared cursor under `parent`
    pub fn push(&mut self, parent: CursorId, mut cursor: Cursor) -> CursorId {
        let id = CursorId(self.unit.cursors.len() as u32);
        if parent != self.unit.root {
            cursor.semantic_parent.get_or_insert(parent);
        }
        cursor.lexical_parent.get_or_insert(parent);
        self.unit.cursors.push(cursor);
        self.unit.cursors[parent.index()].children.push(id);
        id
    }

    pub fn cursor_mut(&mut self, id: CursorId) -> &mut Cursor {
        &mut self.unit.cursors[id.index()]
    }

    /// Add a token; its end is derived from the spelling
    pub fn token(
        &mut self,
        kind: TokenKind,
        spelling: &str,
        start: SourceLocation,
    ) -> &mut Self {
        let newlines = spelling.matches('\n').count() as u32;
        let end_column = match spelling.rfind('\n') {
            Some(pos) => (spelling.len() - pos) as u32,
            None => start.column + spelling.len() as u32,
        };
        let end = SourceLocation {
            file: start.file.clone(),
            line: start.line + newlines,
            column: end_column,
            offset: start.offset + spelling.len() as u32,
        };

        self.unit
            .tokens
            .entry(start.file.clone())
            .or_default()
            .push(Token {
                kind,
                spelling: spelling.to_string(),
                extent: Extent { start, end },
            });
        self
    }

    pub fn comment(&mut self, spelling: &str, start: SourceLocation) -> &mut Self {
        self.token(TokenKind::Comment, spelling, start)
    }

    pub fn include(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.unit.includes.push(path.as_ref().to_path_buf());
        self
    }

    pub fn diagnostic(&mut self, severity: Severity, message: &str) -> &mut Self {
        self.unit.diagnostics.push(Diagnostic {
            severity,
            message: message.to_string(),
            location: None,
        });
        self
    }

    /// Finish the unit, ordering every token stream by offset
    pub fn finish(mut self) -> TranslationUnit {
        for tokens in self.unit.tokens.values_mut() {
            tokens.sort_by_key(|t| t.extent.start.offset);
        }
        self.unit
    }
}
