//! Cursor Kind Registry
//!
//! Closed map from cursor kind to the node it produces. Built once; kinds
//! mapped to `Entry::Skip` are dropped silently, kinds absent from the map
//! are offered to the enclosing node instead.
//!
//! @module tree/registry

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::node::{Argument, ClassInfo, FunctionInfo, NodeDetails, NodeKind};
use crate::ast::{Access, Cursor, CursorFlags, CursorKind, TranslationUnit, TypeInfo};

/// What a cursor turns into
#[derive(Debug)]
pub struct Shape {
    pub kind: NodeKind,
    pub details: NodeDetails,
    pub templated: bool,
    pub process_children: bool,
}

impl Shape {
    fn leaf(kind: NodeKind, details: NodeDetails) -> Self {
        Self {
            kind,
            details,
            templated: false,
            process_children: false,
        }
    }

    fn scope(kind: NodeKind, details: NodeDetails) -> Self {
        Self {
            process_children: true,
            ..Self::leaf(kind, details)
        }
    }

    fn templated(mut self) -> Self {
        self.templated = true;
        self.process_children = true;
        self
    }
}

pub type Constructor = fn(&TranslationUnit, &Cursor) -> Shape;

pub enum Entry {
    Skip,
    Build(Constructor),
}

static REGISTRY: Lazy<HashMap<CursorKind, Entry>> = Lazy::new(|| {
    use CursorKind as K;

    let mut map: HashMap<CursorKind, Entry> = HashMap::new();

    for kind in [
        K::UsingDirective,
        K::UsingDeclaration,
        K::NamespaceAlias,
        K::StaticAssert,
    ] {
        map.insert(kind, Entry::Skip);
    }

    let builders: [(CursorKind, Constructor); 19] = [
        (K::Namespace, namespace),
        (K::ClassDecl, class),
        (K::StructDecl, structure),
        (K::UnionDecl, union),
        (K::ClassTemplate, class_template),
        (K::EnumDecl, enumeration),
        (K::EnumConstantDecl, enum_value),
        (K::FieldDecl, field),
        (K::VarDecl, variable),
        (K::FunctionDecl, function),
        (K::CxxMethod, method),
        (K::Constructor, constructor),
        (K::Destructor, destructor),
        (K::ConversionFunction, conversion),
        (K::FunctionTemplate, function_template),
        (K::TypedefDecl, typedef),
        (K::TypeAliasDecl, typedef),
        (K::TemplateTypeParameter, template_type_parameter),
        (K::TemplateNonTypeParameter, template_non_type_parameter),
    ];
    for (kind, build) in builders {
        map.insert(kind, Entry::Build(build));
    }

    map
});

/// Registry entry for a cursor kind
pub fn lookup(kind: CursorKind) -> Option<&'static Entry> {
    REGISTRY.get(&kind)
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

fn namespace(_: &TranslationUnit, _: &Cursor) -> Shape {
    Shape::scope(NodeKind::Namespace, NodeDetails::Plain)
}

fn class(_: &TranslationUnit, _: &Cursor) -> Shape {
    Shape::scope(NodeKind::Class, NodeDetails::Class(ClassInfo::new(Access::Private)))
}

fn structure(_: &TranslationUnit, _: &Cursor) -> Shape {
    Shape::scope(NodeKind::Struct, NodeDetails::Class(ClassInfo::new(Access::Public)))
}

fn union(_: &TranslationUnit, _: &Cursor) -> Shape {
    Shape::scope(NodeKind::Union, NodeDetails::Class(ClassInfo::new(Access::Public)))
}

fn class_template(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    let shape = if cursor.flags.contains(CursorFlags::STRUCT_KEYWORD) {
        structure(unit, cursor)
    } else {
        class(unit, cursor)
    };
    shape.templated()
}

fn enumeration(_: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::scope(
        NodeKind::Enum,
        NodeDetails::Enum {
            scoped: cursor.flags.contains(CursorFlags::SCOPED_ENUM),
        },
    )
}

fn enum_value(_: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(
        NodeKind::EnumValue,
        NodeDetails::EnumValue {
            value: cursor.enum_value.unwrap_or_default(),
        },
    )
}

fn typed(cursor: &Cursor) -> NodeDetails {
    NodeDetails::Typed {
        ty: cursor.ty.clone().unwrap_or_default(),
    }
}

fn field(_: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Field, typed(cursor))
}

fn variable(_: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Variable, typed(cursor))
}

fn function_info(unit: &TranslationUnit, cursor: &Cursor) -> NodeDetails {
    let arguments = cursor
        .children
        .iter()
        .map(|&id| unit.cursor(id))
        .filter(|c| c.kind == CursorKind::ParmDecl)
        .map(|c| Argument {
            name: c.spelling.clone(),
            ty: c.ty.clone().unwrap_or_else(TypeInfo::default),
        })
        .collect();

    NodeDetails::Function(FunctionInfo {
        return_type: cursor.result_type.clone(),
        arguments,
        flags: cursor.flags,
    })
}

fn function(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Function, function_info(unit, cursor))
}

fn method(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Method, function_info(unit, cursor))
}

fn constructor(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Constructor, function_info(unit, cursor))
}

fn destructor(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::Destructor, function_info(unit, cursor))
}

fn conversion(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::ConversionFunction, function_info(unit, cursor))
}

fn function_template(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    let in_class = cursor
        .semantic_parent
        .and_then(|id| unit.get(id))
        .map(|p| p.kind.is_class_like())
        .unwrap_or(false);

    let kind = if in_class {
        NodeKind::Method
    } else {
        NodeKind::Function
    };
    Shape::leaf(kind, function_info(unit, cursor)).templated()
}

fn typedef(unit: &TranslationUnit, cursor: &Cursor) -> Shape {
    let only_type_ref = matches!(
        cursor.children.as_slice(),
        [only] if unit.cursor(*only).kind == CursorKind::TypeRef
    );

    let details = NodeDetails::Typedef {
        underlying: cursor.underlying_type.clone().unwrap_or_default(),
    };
    Shape {
        process_children: !only_type_ref,
        ..Shape::leaf(NodeKind::Typedef, details)
    }
}

fn template_type_parameter(_: &TranslationUnit, _: &Cursor) -> Shape {
    Shape::leaf(NodeKind::TemplateTypeParameter, NodeDetails::Plain)
}

fn template_non_type_parameter(_: &TranslationUnit, cursor: &Cursor) -> Shape {
    Shape::leaf(NodeKind::TemplateNonTypeParameter, typed(cursor))
}
