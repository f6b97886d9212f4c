//! Per-file Comment Database
//!
//! Built once from a file's token stream. Runs of adjacent comment tokens
//! become one `Comment`, keyed by the offset of the token that follows the
//! run. Instruction comments (`cldoc:begin-category(Name)`) open and close
//! category regions instead.
//!
//! @module comments/database

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, error};

use super::comment::Comment;
use super::range_map::RangeMap;
use super::sorted::Sorted;
use crate::ast::Token;
use crate::core::config::CommentConfig;
use crate::core::error::{Error, Result};

/// `marker:name(args)`; the marker is checked against the configured one
static INSTRUCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+):([a-zA-Z_-]+)(\(([^\)]*)\))?").unwrap());

fn instruction<'t>(text: &'t str, marker: &str) -> Option<Captures<'t>> {
    INSTRUCTION_RE.captures(text).filter(|caps| &caps[1] == marker)
}

fn comment_offset(comment: &Comment) -> u32 {
    comment.location.offset
}

/// Comments and category regions of one source file
#[derive(Debug)]
pub struct CommentsDatabase {
    path: PathBuf,
    comments: Sorted<Comment, u32>,
    categories: RangeMap<String>,
    category_names: Vec<String>,
}

impl CommentsDatabase {
    /// Extract comments and categories from `tokens`
    pub fn build(path: &Path, tokens: &[Token], config: &CommentConfig) -> Result<Self> {
        let mut db = Self {
            path: path.to_path_buf(),
            comments: Sorted::new(comment_offset),
            categories: RangeMap::new(),
            category_names: Vec::new(),
        };

        db.extract(tokens, config)?;

        if let Some(name) = db.categories.top() {
            error!(file = %path.display(), category = %name, "Unclosed category");
            return Err(Error::UnclosedCategory {
                name: name.clone(),
                path: path.to_path_buf(),
            });
        }

        debug!(
            file = %path.display(),
            comments = db.comments.len(),
            categories = db.category_names.len(),
            "Extracted comments"
        );

        Ok(db)
    }

    fn extract(&mut self, tokens: &[Token], config: &CommentConfig) -> Result<()> {
        let mut i = 0;

        while i < tokens.len() {
            if !tokens[i].is_comment() {
                i += 1;
                continue;
            }

            let mut run: Vec<String> = Vec::new();
            let mut prev: Option<&Token> = None;
            let mut directive = false;

            while let Some(token) = tokens.get(i).filter(|t| t.is_comment()) {
                let cleaned = clean(token, config.ignore_marker);

                if let Some(text) = cleaned
                    .as_deref()
                    .filter(|t| instruction(t, &config.instruction_marker).is_some())
                {
                    run = vec![text.to_string()];
                    directive = true;
                    break;
                }

                if let Some(p) = prev {
                    if p.extent.end.line + 1 < token.extent.start.line {
                        run.clear();
                    }
                }

                if let Some(text) = cleaned {
                    run.push(text);
                }

                prev = Some(token);
                i += 1;
            }

            // Runs reaching the end of the stream document nothing
            let Some(anchor) = tokens.get(i) else {
                break;
            };

            if directive {
                self.apply_instruction(anchor, &run[0], config)?;
            } else {
                let text = run.join("\n");
                if !text.trim().is_empty() {
                    self.comments
                        .insert_left(Comment::new(text, anchor.extent.start.clone()));
                }
            }

            i += 1;
        }

        Ok(())
    }

    fn apply_instruction(
        &mut self,
        token: &Token,
        text: &str,
        config: &CommentConfig,
    ) -> Result<()> {
        let Some(caps) = instruction(text, &config.instruction_marker) else {
            return Ok(());
        };

        let location = token.extent.start.to_string();
        let name = &caps[2];
        let args: Vec<&str> = match caps.get(4).map(|m| m.as_str()) {
            Some(args) if !args.is_empty() => args.split(',').map(str::trim).collect(),
            _ => vec![],
        };

        let result = match name {
            "begin-category" => {
                if args.len() != 1 {
                    Err(Error::MissingCategoryName { location })
                } else {
                    self.categories
                        .push(args[0].to_string(), token.extent.start.offset);
                    self.category_names.push(args[0].to_string());
                    Ok(())
                }
            }
            "end-category" => match self.categories.top().cloned() {
                None => Err(Error::NoCategoryToEnd { location }),
                Some(_) if args.len() > 1 => Err(Error::EndCategoryArguments { location }),
                Some(current) if args.len() == 1 && current != args[0] => {
                    Err(Error::CategoryMismatch {
                        requested: args[0].to_string(),
                        current,
                        location,
                    })
                }
                Some(_) => {
                    self.categories.pop(token.extent.end.offset);
                    Ok(())
                }
            },
            _ => Err(Error::InvalidInstruction {
                marker: config.instruction_marker.clone(),
                instruction: name.to_string(),
                location,
            }),
        };

        if let Err(e) = &result {
            error!(file = %self.path.display(), "{}", e);
        }
        result
    }

    /// Comment documenting the token at `offset`
    pub fn lookup(&self, offset: u32) -> Option<&Comment> {
        self.comments.find(&offset)
    }

    /// Innermost category region containing `offset`
    pub fn lookup_category(&self, offset: u32) -> Option<&str> {
        self.categories.find(offset).map(String::as_str)
    }

    /// Category names in declaration order
    pub fn category_names(&self) -> &[String] {
        &self.category_names
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

// =============================================================================
// CLEANING
// =============================================================================

/// Strip comment markers and re-indent; `None` for ignored comments
fn clean(token: &Token, ignore: char) -> Option<String> {
    let prelen = token.extent.start.column.saturating_sub(1) as usize;
    let s = token.spelling.trim();

    if let Some(rest) = s.strip_prefix("//") {
        if rest.starts_with(ignore) {
            return None;
        }
        let rest = rest.strip_prefix(['/', '!']).unwrap_or(rest);
        if rest.starts_with(ignore) {
            return None;
        }
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return Some(rest.trim_end().to_string());
    }

    let inner = s.strip_prefix("/*")?.strip_suffix("*/")?;
    if inner.starts_with(ignore) {
        return None;
    }
    let inner = match inner.strip_prefix(['*', '!']) {
        Some(rest) if !rest.starts_with('*') => rest,
        _ => inner,
    };

    let lines: Vec<&str> = inner.lines().collect();
    if lines.len() == 1 && lines[0].starts_with(' ') {
        return Some(lines[0][1..].trim_end().to_string());
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let mut line = line;

        let cut = line
            .char_indices()
            .nth(prelen)
            .map(|(i, _)| i)
            .unwrap_or(line.len());
        let prefix = &line[..cut];
        if prelen == 0 || (!prefix.is_empty() && prefix.chars().all(char::is_whitespace)) {
            line = line[cut..].trim_end();
        }

        if line.starts_with(" *") || line.starts_with("  ") {
            line = &line[2..];
            line = line.strip_prefix(' ').unwrap_or(line);
        }

        out.push(line);
    }

    let start = out.iter().position(|l| !l.is_empty())?;
    let end = out.iter().rposition(|l| !l.is_empty()).unwrap_or(start);
    Some(out[start..=end].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{SourceLocation, TokenKind, UnitBuilder};

    struct Source {
        builder: UnitBuilder,
    }

    impl Source {
        fn new() -> Self {
            Self {
                builder: UnitBuilder::new("a.h"),
            }
        }

        fn comment(mut self, text: &str, line: u32, column: u32, offset: u32) -> Self {
            self.builder
                .comment(text, SourceLocation::new("a.h", line, column, offset));
            self
        }

        fn ident(mut self, text: &str, line: u32, offset: u32) -> Self {
            self.builder.token(
                TokenKind::Identifier,
                text,
                SourceLocation::new("a.h", line, 1, offset),
            );
            self
        }

        fn build(self) -> Result<CommentsDatabase> {
            self.build_with(&CommentConfig::default())
        }

        fn build_with(self, config: &CommentConfig) -> Result<CommentsDatabase> {
            let unit = self.builder.finish();
            CommentsDatabase::build(Path::new("a.h"), unit.tokens_for(Path::new("a.h")), config)
        }
    }

    #[test]
    fn test_adjacent_line_comments_merge() {
        let db = Source::new()
            .comment("// Foo.", 1, 1, 0)
            .comment("// Bar.", 2, 1, 8)
            .ident("int", 3, 16)
            .build()
            .unwrap();

        assert_eq!(db.lookup(16).unwrap().text, "Foo.\nBar.");
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_gap_discards_earlier_run() {
        let db = Source::new()
            .comment("// Foo.", 1, 1, 0)
            .comment("// Bar.", 3, 1, 9)
            .ident("int", 4, 17)
            .build()
            .unwrap();

        assert_eq!(db.lookup(17).unwrap().text, "Bar.");
    }

    #[test]
    fn test_ignored_comment_keeps_adjacency() {
        let db = Source::new()
            .comment("// Foo.", 1, 1, 0)
            .comment("//- hidden", 2, 1, 8)
            .comment("// Bar.", 3, 1, 19)
            .ident("x", 4, 27)
            .build()
            .unwrap();

        assert_eq!(db.lookup(27).unwrap().text, "Foo.\nBar.");
    }

    #[test]
    fn test_block_comment_reindent() {
        let db = Source::new()
            .comment("/**\n     * First line.\n     *\n     * Second.\n     */", 1, 5, 4)
            .ident("void", 6, 60)
            .build()
            .unwrap();

        assert_eq!(db.lookup(60).unwrap().text, "First line.\n\nSecond.");
    }

    #[test]
    fn test_single_line_block_comment() {
        let db = Source::new()
            .comment("/* Short. */", 1, 1, 0)
            .ident("int", 2, 13)
            .build()
            .unwrap();

        assert_eq!(db.lookup(13).unwrap().text, "Short.");
        assert!(db.lookup(12).is_none());
    }

    #[test]
    fn test_trailing_run_dropped() {
        let db = Source::new()
            .ident("int", 1, 0)
            .comment("// dangling", 2, 1, 4)
            .build()
            .unwrap();

        assert!(db.is_empty());
    }

    #[test]
    fn test_categories() {
        let db = Source::new()
            .comment("// cldoc:begin-category(Ops)", 1, 1, 0)
            .ident("void", 2, 30)
            .comment("// cldoc:begin-category(Inner)", 3, 1, 40)
            .ident("int", 4, 72)
            .comment("// cldoc:end-category()", 5, 1, 80)
            .ident("int", 6, 104)
            .comment("// cldoc:end-category(Ops)", 7, 1, 110)
            .ident("int", 8, 140)
            .build()
            .unwrap();

        assert_eq!(db.category_names(), &["Ops".to_string(), "Inner".to_string()]);
        assert_eq!(db.lookup_category(72), Some("Inner"));
        assert_eq!(db.lookup_category(104), Some("Ops"));
        assert_eq!(db.lookup_category(140), None);
        assert!(db.is_empty());
    }

    #[test]
    fn test_directive_truncates_run() {
        let db = Source::new()
            .comment("// Lost text.", 1, 1, 0)
            .comment("// cldoc:begin-category(A)", 2, 1, 14)
            .ident("int", 3, 41)
            .comment("// cldoc:end-category(A)", 4, 1, 45)
            .ident("int", 5, 70)
            .build()
            .unwrap();

        assert!(db.lookup(41).is_none());
        assert_eq!(db.lookup_category(41), Some("A"));
    }

    #[test]
    fn test_unknown_instruction_is_fatal() {
        let err = Source::new()
            .comment("// cldoc:frobnicate(x)", 1, 1, 0)
            .ident("int", 2, 23)
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::InvalidInstruction { .. }));
    }

    #[test]
    fn test_configured_marker() {
        let config = CommentConfig {
            instruction_marker: "doc".to_string(),
            ..Default::default()
        };
        let db = Source::new()
            .comment("// cldoc:frobnicate(x)", 1, 1, 0)
            .ident("int", 2, 23)
            .comment("// doc:begin-category(A)", 3, 1, 27)
            .ident("int", 4, 52)
            .comment("// doc:end-category()", 5, 1, 56)
            .ident("int", 6, 78)
            .build_with(&config)
            .unwrap();

        assert_eq!(db.lookup(23).unwrap().text, "cldoc:frobnicate(x)");
        assert_eq!(db.lookup_category(52), Some("A"));
        assert_eq!(db.lookup_category(78), None);
    }

    #[test]
    fn test_category_errors() {
        let err = Source::new()
            .comment("// cldoc:end-category(A)", 1, 1, 0)
            .ident("int", 2, 25)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::NoCategoryToEnd { .. }));

        let err = Source::new()
            .comment("// cldoc:begin-category()", 1, 1, 0)
            .ident("int", 2, 26)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingCategoryName { .. }));

        let err = Source::new()
            .comment("// cldoc:begin-category(A)", 1, 1, 0)
            .ident("int", 2, 27)
            .comment("// cldoc:end-category(B)", 3, 1, 31)
            .ident("int", 4, 56)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::CategoryMismatch { .. }));

        let err = Source::new()
            .comment("// cldoc:begin-category(A)", 1, 1, 0)
            .ident("int", 2, 27)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::UnclosedCategory { .. }));
    }

    #[test]
    fn test_clean_markers() {
        let tok = |s: &str, column: u32| Token {
            kind: TokenKind::Comment,
            spelling: s.to_string(),
            extent: crate::ast::Extent {
                start: SourceLocation::new("a.h", 1, column, 0),
                end: SourceLocation::new("a.h", 1, column, 0),
            },
        };

        assert_eq!(clean(&tok("/// Doc line", 1), '-').as_deref(), Some("Doc line"));
        assert_eq!(clean(&tok("//! Doc line", 1), '-').as_deref(), Some("Doc line"));
        assert_eq!(clean(&tok("//-hidden", 1), '-'), None);
        assert_eq!(clean(&tok("/*- hidden */", 1), '-'), None);
        assert_eq!(clean(&tok("/** Doc. */", 1), '-').as_deref(), Some("Doc."));
        assert_eq!(clean(&tok("/**/", 1), '-'), None);
    }
}
