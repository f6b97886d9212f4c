//! Documentation Nodes
//!
//! Nodes live in the tree's arena and refer to each other by `NodeId`.
//! Ownership is strictly tree-shaped (a parent owns its children); base,
//! subclass and reference links are plain ids.
//!
//! @module tree/node

use std::borrow::Cow;

use compact_str::CompactString;
use serde::Serialize;
use smallvec::SmallVec;

use crate::ast::{Access, CursorFlags, CursorId, SourceLocation, TypeInfo};
use crate::comments::Comment;

// =============================================================================
// IDS
// =============================================================================

/// Index of a node in the tree arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Cursor identity across translation units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorRef {
    pub unit: u32,
    pub cursor: CursorId,
}

// =============================================================================
// NODE KIND
// =============================================================================

/// Kind of documented symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Category,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    EnumValue,
    Field,
    Variable,
    Function,
    Method,
    Constructor,
    Destructor,
    ConversionFunction,
    Typedef,
    TemplateTypeParameter,
    TemplateNonTypeParameter,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Category => "category",
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::EnumValue => "enum_value",
            Self::Field => "field",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::ConversionFunction => "conversion_function",
            Self::Typedef => "typedef",
            Self::TemplateTypeParameter => "template_type_parameter",
            Self::TemplateNonTypeParameter => "template_non_type_parameter",
        }
    }

    /// Ordinal used as the second sort key
    pub fn sort_category(&self) -> u8 {
        match self {
            Self::Root | Self::Category => 0,
            Self::Namespace => 1,
            Self::TemplateTypeParameter | Self::TemplateNonTypeParameter => 2,
            Self::Class | Self::Struct | Self::Union => 3,
            Self::Enum => 4,
            Self::EnumValue => 5,
            Self::Field | Self::Variable => 6,
            Self::Typedef => 7,
            Self::Constructor => 8,
            Self::Destructor => 9,
            Self::Method | Self::ConversionFunction => 10,
            Self::Function => 11,
        }
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }

    /// Kinds that can be renamed through a typedef when declared without a name
    #[inline]
    pub fn is_record(&self) -> bool {
        self.is_class() || *self == Self::Enum
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Method
                | Self::Constructor
                | Self::Destructor
                | Self::ConversionFunction
        )
    }

    #[inline]
    pub fn is_template_parameter(&self) -> bool {
        matches!(
            self,
            Self::TemplateTypeParameter | Self::TemplateNonTypeParameter
        )
    }
}

// =============================================================================
// KIND DATA
// =============================================================================

/// Base class or implemented protocol of a class
#[derive(Debug, Clone, Serialize)]
pub struct Base {
    #[serde(skip)]
    pub cursor: CursorRef,
    pub access: Access,
    /// Qualified name as written in the base specifier
    pub typename: String,
    /// Resolved target, if it is part of the tree
    pub node: Option<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    pub bases: Vec<Base>,
    pub implements: Vec<Base>,
    pub subclasses: Vec<NodeId>,
    pub implemented_by: Vec<NodeId>,
    /// Access applied to members while the class body is visited
    #[serde(skip)]
    pub current_access: Access,
}

impl ClassInfo {
    pub fn new(default_access: Access) -> Self {
        Self {
            bases: vec![],
            implements: vec![],
            subclasses: vec![],
            implemented_by: vec![],
            current_access: default_access,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Argument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionInfo {
    pub return_type: Option<TypeInfo>,
    pub arguments: Vec<Argument>,
    #[serde(skip)]
    pub flags: CursorFlags,
}

impl FunctionInfo {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(CursorFlags::STATIC)
    }

    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(CursorFlags::VIRTUAL)
    }

    #[inline]
    pub fn is_pure_virtual(&self) -> bool {
        self.flags.contains(CursorFlags::PURE_VIRTUAL)
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.flags.contains(CursorFlags::CONST)
    }
}

/// Kind-specific payload
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "data", rename_all = "snake_case")]
pub enum NodeDetails {
    Plain,
    Class(ClassInfo),
    Enum { scoped: bool },
    EnumValue { value: i64 },
    Function(FunctionInfo),
    Typedef { underlying: TypeInfo },
    /// Fields, variables and non-type template parameters
    Typed {
        #[serde(rename = "type")]
        ty: TypeInfo,
    },
}

/// Template parameters of a node built from a template declaration
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateInfo {
    pub parameters: Vec<NodeId>,
}

// =============================================================================
// NODE
// =============================================================================

/// One documented symbol
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Name as declared; empty for anonymous declarations
    pub spelling: CompactString,
    pub usr: Option<String>,
    pub cursor: Option<CursorRef>,
    /// Start of the declaration that created the node
    pub location: Option<SourceLocation>,
    pub access: Access,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Insertion position within the parent
    pub sort_index: usize,
    /// 1-based number among the parent's anonymous children, 0 when named
    pub anonymous_id: u32,
    pub(crate) num_anon: u32,
    /// Extra comment anchors from redeclarations and typedefs
    pub(crate) anchors: SmallVec<[SourceLocation; 2]>,
    pub comment: Option<Comment>,
    /// Name of the typedef an unnamed record is known by
    pub typedef_name: Option<CompactString>,
    pub details: NodeDetails,
    pub template: Option<TemplateInfo>,
    pub process_children: bool,
    pub(crate) qid: Option<String>,
    pub(crate) refid: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind, spelling: impl Into<CompactString>, details: NodeDetails) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            usr: None,
            cursor: None,
            location: None,
            access: Access::Public,
            children: vec![],
            parent: None,
            sort_index: 0,
            anonymous_id: 0,
            num_anon: 0,
            anchors: SmallVec::new(),
            comment: None,
            typedef_name: None,
            details,
            template: None,
            process_children: false,
            qid: None,
            refid: None,
        }
    }

    /// Display name: typedef name for renamed records, `(anonymous::N)` for unnamed ones
    pub fn name(&self) -> Cow<'_, str> {
        if let Some(name) = &self.typedef_name {
            return Cow::Borrowed(name.as_str());
        }
        if self.spelling.is_empty() && self.anonymous_id > 0 {
            return Cow::Owned(format!("(anonymous::{})", self.anonymous_id));
        }
        Cow::Borrowed(self.spelling.as_str())
    }

    /// Declared without a name and not renamed by a typedef
    #[inline]
    pub fn is_unnamed(&self) -> bool {
        self.spelling.is_empty() && self.typedef_name.is_none()
    }

    /// Whether the node is skipped when building qualified names
    pub fn is_anonymous(&self) -> bool {
        match &self.details {
            NodeDetails::Enum { scoped } => !scoped,
            _ if self.kind.is_class() => self.is_unnamed(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_templated(&self) -> bool {
        self.template.is_some()
    }

    /// Own declaration start followed by the recorded extra anchors
    pub fn comment_locations(&self) -> impl Iterator<Item = &SourceLocation> {
        self.location.iter().chain(self.anchors.iter())
    }

    /// Record an extra anchor; a location already known is ignored
    pub fn add_anchor(&mut self, location: SourceLocation) {
        if self.comment_locations().all(|known| *known != location) {
            self.anchors.push(location);
        }
    }

    /// Attach a comment unless one is present; `force` replaces it
    pub fn merge_comment(&mut self, mut comment: Comment, force: bool) -> bool {
        if self.comment.is_some() && !force {
            return false;
        }
        comment.segment();
        self.comment = Some(comment);
        true
    }

    pub fn class_info(&self) -> Option<&ClassInfo> {
        match &self.details {
            NodeDetails::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn class_info_mut(&mut self) -> Option<&mut ClassInfo> {
        match &mut self.details {
            NodeDetails::Class(info) => Some(info),
            _ => None,
        }
    }

    pub fn function_info(&self) -> Option<&FunctionInfo> {
        match &self.details {
            NodeDetails::Function(info) => Some(info),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_naming() {
        let mut node = Node::new(NodeKind::Struct, "", NodeDetails::Class(ClassInfo::new(Access::Public)));
        assert_eq!(node.name(), "");
        assert!(node.is_anonymous());

        node.anonymous_id = 2;
        assert_eq!(node.name(), "(anonymous::2)");

        node.typedef_name = Some("point_t".into());
        assert_eq!(node.name(), "point_t");
        assert!(!node.is_anonymous());
    }

    #[test]
    fn test_enum_scoping() {
        let plain = Node::new(NodeKind::Enum, "Color", NodeDetails::Enum { scoped: false });
        let scoped = Node::new(NodeKind::Enum, "Mode", NodeDetails::Enum { scoped: true });
        assert!(plain.is_anonymous());
        assert!(!scoped.is_anonymous());
        assert!(!plain.is_unnamed());
    }

    #[test]
    fn test_merge_comment_keeps_first() {
        let loc = SourceLocation::new("a.h", 1, 1, 0);
        let mut node = Node::new(NodeKind::Function, "f", NodeDetails::Plain);

        assert!(node.merge_comment(Comment::new("First.", loc.clone()), false));
        assert!(!node.merge_comment(Comment::new("Second.", loc.clone()), false));
        assert_eq!(node.comment.as_ref().unwrap().brief.text, "First.");

        assert!(node.merge_comment(Comment::new("Third.", loc), true));
        assert_eq!(node.comment.as_ref().unwrap().brief.text, "Third.");
    }

    #[test]
    fn test_anchors_are_unique() {
        let mut node = Node::new(NodeKind::Field, "x", NodeDetails::Plain);
        node.location = Some(SourceLocation::new("a.h", 1, 5, 4));

        node.add_anchor(SourceLocation::new("a.h", 1, 5, 4));
        node.add_anchor(SourceLocation::new("a.h", 3, 5, 30));
        node.add_anchor(SourceLocation::new("a.h", 3, 5, 30));
        assert_eq!(node.comment_locations().count(), 2);
    }

    #[test]
    fn test_sort_categories() {
        assert!(NodeKind::Namespace.sort_category() < NodeKind::Class.sort_category());
        assert!(NodeKind::Enum.sort_category() < NodeKind::EnumValue.sort_category());
        assert!(NodeKind::Constructor.sort_category() < NodeKind::Destructor.sort_category());
        assert!(NodeKind::Method.sort_category() < NodeKind::Function.sort_category());
    }
}
