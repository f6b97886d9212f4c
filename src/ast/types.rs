//! Provider Data Model
//!
//! Cursors, tokens, types and diagnostics as delivered by the C/C++ parsing
//! library. A translation unit owns its cursors in an arena; cursors refer
//! to each other by `CursorId`.
//!
//! @module ast/types

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

// =============================================================================
// IDS
// =============================================================================

/// Index of a cursor inside its translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorId(pub u32);

impl CursorId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// =============================================================================
// CURSOR KIND
// =============================================================================

/// Kind of an AST cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorKind {
    TranslationUnit,
    UnexposedDecl,
    Namespace,
    ClassDecl,
    StructDecl,
    UnionDecl,
    EnumDecl,
    EnumConstantDecl,
    FieldDecl,
    VarDecl,
    FunctionDecl,
    CxxMethod,
    Constructor,
    Destructor,
    ConversionFunction,
    TypedefDecl,
    TypeAliasDecl,
    ClassTemplate,
    FunctionTemplate,
    TemplateTypeParameter,
    TemplateNonTypeParameter,
    CxxAccessSpecifier,
    CxxBaseSpecifier,
    ObjcProtocolRef,
    UsingDirective,
    UsingDeclaration,
    NamespaceAlias,
    StaticAssert,
    TypeRef,
    TemplateRef,
    NamespaceRef,
    ParmDecl,
    Statement,
    Expression,
    /// Anything the provider reports that has no dedicated variant
    #[serde(other)]
    Other,
}

impl CursorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranslationUnit => "translation_unit",
            Self::UnexposedDecl => "unexposed_decl",
            Self::Namespace => "namespace",
            Self::ClassDecl => "class_decl",
            Self::StructDecl => "struct_decl",
            Self::UnionDecl => "union_decl",
            Self::EnumDecl => "enum_decl",
            Self::EnumConstantDecl => "enum_constant_decl",
            Self::FieldDecl => "field_decl",
            Self::VarDecl => "var_decl",
            Self::FunctionDecl => "function_decl",
            Self::CxxMethod => "cxx_method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::ConversionFunction => "conversion_function",
            Self::TypedefDecl => "typedef_decl",
            Self::TypeAliasDecl => "type_alias_decl",
            Self::ClassTemplate => "class_template",
            Self::FunctionTemplate => "function_template",
            Self::TemplateTypeParameter => "template_type_parameter",
            Self::TemplateNonTypeParameter => "template_non_type_parameter",
            Self::CxxAccessSpecifier => "cxx_access_specifier",
            Self::CxxBaseSpecifier => "cxx_base_specifier",
            Self::ObjcProtocolRef => "objc_protocol_ref",
            Self::UsingDirective => "using_directive",
            Self::UsingDeclaration => "using_declaration",
            Self::NamespaceAlias => "namespace_alias",
            Self::StaticAssert => "static_assert",
            Self::TypeRef => "type_ref",
            Self::TemplateRef => "template_ref",
            Self::NamespaceRef => "namespace_ref",
            Self::ParmDecl => "parm_decl",
            Self::Statement => "statement",
            Self::Expression => "expression",
            Self::Other => "other",
        }
    }

    /// Record-like declarations whose members carry access levels
    #[inline]
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            Self::ClassDecl | Self::StructDecl | Self::UnionDecl | Self::ClassTemplate
        )
    }
}

// =============================================================================
// ACCESS
// =============================================================================

/// C++ access level; the declaration order is the documentation sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
    None,
}

impl Default for Access {
    fn default() -> Self {
        Self::None
    }
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::None => "none",
        }
    }
}

// =============================================================================
// FLAGS
// =============================================================================

bitflags! {
    /// Declaration properties reported by the provider
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[repr(transparent)]
    pub struct CursorFlags: u16 {
        const STATIC = 0b0000_0001;
        const VIRTUAL = 0b0000_0010;
        const PURE_VIRTUAL = 0b0000_0100;
        /// Const-qualified method
        const CONST = 0b0000_1000;
        /// `enum class` / `enum struct`
        const SCOPED_ENUM = 0b0010_0000;
        /// Class template introduced with `struct`
        const STRUCT_KEYWORD = 0b0100_0000;
    }
}

impl Default for CursorFlags {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// LOCATIONS
// =============================================================================

/// Position in a source file (1-based line and column, 0-based byte offset)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32, offset: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Source range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub start: SourceLocation,
    pub end: SourceLocation,
}

// =============================================================================
// TYPES
// =============================================================================

/// Type of a declaration, argument or return value
///
/// For pointers and references `declaration` names the cursor declaring the
/// pointee, so `struct foo *` points at `foo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeInfo {
    /// Type as written (`const foo *`)
    pub spelling: String,
    /// Qualified name of the underlying declaration (`ns::foo`) or the builtin name
    pub typename: String,
    pub declaration: Option<CursorId>,
    pub builtin: bool,
    /// `const`, `volatile`, `*`, `&` ... in source order
    pub qualifiers: Vec<String>,
    pub template_arguments: Vec<TypeInfo>,
    pub array_size: Option<u64>,
}

impl TypeInfo {
    pub fn named(spelling: impl Into<String>) -> Self {
        let spelling = spelling.into();
        Self {
            typename: spelling.clone(),
            spelling,
            ..Default::default()
        }
    }

    pub fn builtin(spelling: impl Into<String>) -> Self {
        Self {
            builtin: true,
            ..Self::named(spelling)
        }
    }
}

// =============================================================================
// CURSOR
// =============================================================================

/// One node of the provider's AST
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursor {
    pub kind: CursorKind,
    #[serde(default)]
    pub spelling: String,
    /// Unified symbol resolution id; empty when the cursor declares nothing
    #[serde(default)]
    pub usr: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
    #[serde(default)]
    pub extent: Option<Extent>,
    #[serde(default)]
    pub semantic_parent: Option<CursorId>,
    #[serde(default)]
    pub lexical_parent: Option<CursorId>,
    #[serde(default)]
    pub children: Vec<CursorId>,
    #[serde(default, rename = "type")]
    pub ty: Option<TypeInfo>,
    #[serde(default)]
    pub result_type: Option<TypeInfo>,
    /// Aliased type of typedefs and type aliases
    #[serde(default)]
    pub underlying_type: Option<TypeInfo>,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub flags: CursorFlags,
    #[serde(default)]
    pub enum_value: Option<i64>,
    /// Template a specialization was instantiated from
    #[serde(default)]
    pub specialized_template: Option<CursorId>,
}

impl Cursor {
    pub fn new(kind: CursorKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            usr: String::new(),
            location: None,
            extent: None,
            semantic_parent: None,
            lexical_parent: None,
            children: vec![],
            ty: None,
            result_type: None,
            underlying_type: None,
            access: Access::None,
            flags: CursorFlags::empty(),
            enum_value: None,
            specialized_template: None,
        }
    }

    /// File the cursor is located in, if any
    #[inline]
    pub fn file(&self) -> Option<&Path> {
        self.location.as_ref().map(|l| l.file.as_path())
    }

    #[inline]
    pub fn usr(&self) -> Option<&str> {
        if self.usr.is_empty() {
            None
        } else {
            Some(&self.usr)
        }
    }

    /// Start of the declaration's extent, falling back to its location
    pub fn start(&self) -> Option<&SourceLocation> {
        self.extent
            .as_ref()
            .map(|e| &e.start)
            .or(self.location.as_ref())
    }
}

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

/// Lexical token of a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: String,
    pub extent: Extent,
}

impl Token {
    #[inline]
    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }
}

// =============================================================================
// DIAGNOSTICS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    #[inline]
    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.message),
            None => f.write_str(&self.message),
        }
    }
}

// =============================================================================
// TRANSLATION UNIT
// =============================================================================

/// Parsed source file with everything the tree builder consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub path: PathBuf,
    pub root: CursorId,
    pub cursors: Vec<Cursor>,
    /// Token stream of the main file and of every included file, in source order
    #[serde(default)]
    pub tokens: BTreeMap<PathBuf, Vec<Token>>,
    #[serde(default)]
    pub includes: Vec<PathBuf>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl TranslationUnit {
    /// Cursor by id; ids are checked by `validate`
    #[inline]
    pub fn cursor(&self, id: CursorId) -> &Cursor {
        &self.cursors[id.index()]
    }

    #[inline]
    pub fn get(&self, id: CursorId) -> Option<&Cursor> {
        self.cursors.get(id.index())
    }

    /// Top-level cursors
    pub fn top_level(&self) -> &[CursorId] {
        &self.cursor(self.root).children
    }

    /// Tokens of one file; empty when the provider did not tokenize it
    pub fn tokens_for(&self, path: &Path) -> &[Token] {
        self.tokens.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check that every cursor reference points inside the arena and that
    /// child lists never lead back to an ancestor
    pub fn validate(&self) -> Result<()> {
        let len = self.cursors.len();
        let check = |id: CursorId, what: &str| -> Result<()> {
            if id.index() < len {
                Ok(())
            } else {
                Err(Error::Provider {
                    message: format!(
                        "{}: {} refers to cursor {} of {}",
                        self.path.display(),
                        what,
                        id.0,
                        len
                    ),
                })
            }
        };

        check(self.root, "root")?;
        for cursor in &self.cursors {
            for &child in &cursor.children {
                check(child, "child")?;
            }
            for id in [
                cursor.semantic_parent,
                cursor.lexical_parent,
                cursor.specialized_template,
            ]
            .into_iter()
            .flatten()
            {
                check(id, "parent")?;
            }
            for ty in [&cursor.ty, &cursor.result_type, &cursor.underlying_type]
                .into_iter()
                .flatten()
            {
                if let Some(decl) = ty.declaration {
                    check(decl, "type declaration")?;
                }
            }
        }

        self.check_acyclic()
    }

    /// Depth-first walk over child lists; shared subtrees are fine, cycles are not
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            New,
            Open,
            Done,
        }

        let mut marks = vec![Mark::New; self.cursors.len()];

        for start in 0..self.cursors.len() {
            if marks[start] != Mark::New {
                continue;
            }
            marks[start] = Mark::Open;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                let Some(child) = self.cursors[id].children.get(next) else {
                    marks[id] = Mark::Done;
                    stack.pop();
                    continue;
                };
                top.1 += 1;

                let child = child.index();
                match marks[child] {
                    Mark::New => {
                        marks[child] = Mark::Open;
                        stack.push((child, 0));
                    }
                    Mark::Open => {
                        return Err(Error::Provider {
                            message: format!(
                                "{}: cursor {} is its own ancestor",
                                self.path.display(),
                                child
                            ),
                        });
                    }
                    Mark::Done => {}
                }
            }
        }

        Ok(())
    }
}
