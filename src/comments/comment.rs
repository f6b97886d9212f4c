//! Documentation Comment
//!
//! A comment is created unsegmented (its whole text is the body), split into
//! brief/body/parameter/return fields when it is merged into a node, and
//! finally turned into components by the reference resolver.
//!
//! @module comments/comment

use serde::Serialize;
use smallvec::SmallVec;

use super::parser;
use crate::ast::SourceLocation;
use crate::tree::NodeId;

// =============================================================================
// COMPONENTS
// =============================================================================

/// Resolved reference to one or more nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Matching nodes, deduplicated, in lookup order
    pub targets: SmallVec<[NodeId; 2]>,
    /// Text from `<[display]name>`
    pub display: Option<String>,
    /// Name or pattern as written
    pub original: String,
}

/// Piece of a resolved documentation field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Component {
    Text(String),
    /// Indented `[code]` block, prefix removed
    Example(String),
    /// Fenced block including its fences
    MarkdownCode(String),
    Reference(Reference),
    /// Reference that matched nothing; holds the name as written
    Unresolved(String),
}

impl Component {
    /// Markup-safe rendering of an unresolved reference
    pub fn escaped_unresolved(name: &str) -> String {
        format!(
            "&lt;{}&gt;",
            name.replace('*', "\\*").replace('_', "\\_")
        )
    }
}

// =============================================================================
// DOC STRING
// =============================================================================

/// Text of one comment field plus its components once resolved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocString {
    pub text: String,
    pub components: Vec<Component>,
}

impl DocString {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let components = if text.is_empty() {
            vec![]
        } else {
            vec![Component::Text(text.clone())]
        };
        Self { text, components }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Description of one function parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDoc {
    pub name: String,
    pub doc: DocString,
}

// =============================================================================
// COMMENT
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    /// Cleaned comment text as extracted from the source
    pub text: String,
    /// Location of the token the comment documents
    #[serde(skip)]
    pub location: SourceLocation,
    pub brief: DocString,
    pub doc: DocString,
    pub params: Vec<ParamDoc>,
    pub returns: DocString,
    #[serde(skip)]
    resolved: bool,
}

impl Comment {
    pub fn new(text: impl Into<String>, location: SourceLocation) -> Self {
        let text = text.into();
        Self {
            doc: DocString::new(text.clone()),
            text,
            location,
            brief: DocString::default(),
            params: vec![],
            returns: DocString::default(),
            resolved: false,
        }
    }

    /// Split the text into fields; keeps the raw body when no brief line exists
    pub fn segment(&mut self) {
        let parts = parser::segment(&self.text);
        if parts.brief.is_empty() {
            return;
        }

        self.brief = DocString::new(parts.brief);
        self.doc = DocString::new(parts.body);
        self.returns = DocString::new(parts.returns);
        self.params = parts
            .params
            .into_iter()
            .map(|(name, doc)| ParamDoc {
                name,
                doc: DocString::new(doc),
            })
            .collect();
    }

    /// Parameter description by name
    pub fn param(&self, name: &str) -> Option<&DocString> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.doc)
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub(crate) fn mark_resolved(&mut self) {
        self.resolved = true;
    }

    /// Every field that carries text
    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = &mut DocString> {
        std::iter::once(&mut self.brief)
            .chain(std::iter::once(&mut self.doc))
            .chain(self.params.iter_mut().map(|p| &mut p.doc))
            .chain(std::iter::once(&mut self.returns))
            .filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("a.h", 1, 1, 0)
    }

    #[test]
    fn test_unsegmented_comment_is_body() {
        let c = Comment::new("Some text.", loc());
        assert!(c.brief.is_empty());
        assert_eq!(c.doc.components, vec![Component::Text("Some text.".into())]);
        assert!(!c.is_resolved());
    }

    #[test]
    fn test_segment_fields() {
        let mut c = Comment::new(
            "Open a file.\n\nOpens the file at <path>.\n\n@param path the path\n@return a handle",
            loc(),
        );
        c.segment();

        assert_eq!(c.brief.text, "Open a file.");
        assert_eq!(c.doc.text, "Opens the file at <path>.");
        assert_eq!(c.param("path").unwrap().text, "the path");
        assert_eq!(c.returns.text, "a handle");
        assert_eq!(c.fields_mut().count(), 4);
    }

    #[test]
    fn test_empty_comment() {
        let mut c = Comment::new("", loc());
        c.segment();
        assert!(c.brief.is_empty());
        assert!(c.doc.is_empty());
        assert!(c.doc.components.is_empty());
        assert_eq!(c.fields_mut().count(), 0);
    }

    #[test]
    fn test_escaped_unresolved() {
        assert_eq!(
            Component::escaped_unresolved("a_b*"),
            "&lt;a\\_b\\*&gt;"
        );
    }
}
