//! Symbol Tree Builder
//!
//! Visits translation units depth-first, creating one node per unique
//! symbol (USR) and recording every redeclaration as an extra comment
//! anchor. Once all units are visited, `finish` parents orphaned nodes,
//! attaches comments and resolves class hierarchies.
//!
//! @module tree/builder

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::affinity::{NameHintAffinity, StructAffinity};
use super::node::{Base, CursorRef, Node, NodeId, NodeKind, TemplateInfo};
use super::registry::{self, Entry};
use super::symbols::Tree;
use crate::ast::{AstProvider, CursorId, CursorKind, Severity, TranslationUnit};
use crate::comments::CommentsDatabase;
use crate::core::config::{CommentConfig, Config};
use crate::core::error::{Error, Result};
use crate::core::sources::SourceSet;

/// Kinds consumed elsewhere that never warrant an "unhandled" warning
const IGNORED_KINDS: &[CursorKind] = &[
    CursorKind::TypeRef,
    CursorKind::TemplateRef,
    CursorKind::ParmDecl,
];

// =============================================================================
// BUILDER
// =============================================================================

/// Builds a `Tree` from translation units
pub struct TreeBuilder {
    tree: Tree,
    sources: SourceSet,
    comments: CommentConfig,
    affinity: Box<dyn StructAffinity>,
    units: Vec<TranslationUnit>,
    /// Files whose cursors were fully visited by an earlier unit
    processed: HashSet<PathBuf>,
    /// Files visited by the current unit
    processing: HashSet<PathBuf>,
}

impl TreeBuilder {
    pub fn new(config: &Config, sources: SourceSet) -> Self {
        Self {
            tree: Tree::new(),
            sources,
            comments: config.comments.clone(),
            affinity: Box::new(NameHintAffinity::from_config(&config.tree)),
            units: Vec::new(),
            processed: HashSet::new(),
            processing: HashSet::new(),
        }
    }

    /// Replace the policy grouping free functions under structs
    pub fn with_affinity(mut self, affinity: Box<dyn StructAffinity>) -> Self {
        self.affinity = affinity;
        self
    }

    /// Parse and visit every documented file not already covered by an include
    pub fn process<P: AstProvider + ?Sized>(&mut self, provider: &mut P) -> Result<()> {
        let files: Vec<PathBuf> = self.sources.iter().map(Path::to_path_buf).collect();

        for file in files {
            if self.processed.contains(&file) {
                debug!(file = %file.display(), "Already processed");
                continue;
            }

            let unit = provider.parse(&file)?;
            self.add_unit(unit)?;
        }

        Ok(())
    }

    /// Visit one parsed translation unit
    pub fn add_unit(&mut self, unit: TranslationUnit) -> Result<()> {
        unit.validate()?;
        self.check_diagnostics(&unit)?;

        let mut extract: Vec<PathBuf> = vec![unit.path.clone()];
        for include in &unit.includes {
            if self.processed.contains(include)
                || !self.sources.contains(include)
                || extract.contains(include)
            {
                continue;
            }
            extract.push(include.clone());
        }

        for file in &extract {
            let db = CommentsDatabase::build(file, unit.tokens_for(file), &self.comments)?;
            self.add_categories(db.category_names());
            self.tree.comments.insert(file.clone(), db);
        }

        let index = self.units.len() as u32;
        let before = self.tree.order.len();
        self.visit(&unit, index, unit.top_level(), None);

        debug!(
            file = %unit.path.display(),
            cursors = unit.cursors.len(),
            nodes = self.tree.order.len() - before,
            comment_files = extract.len(),
            "Visited"
        );

        for file in self.processing.drain() {
            self.processed.insert(file);
        }
        self.units.push(unit);

        Ok(())
    }

    fn check_diagnostics(&self, unit: &TranslationUnit) -> Result<()> {
        if unit.diagnostics.is_empty() {
            return Ok(());
        }

        warn!(
            file = %unit.path.display(),
            count = unit.diagnostics.len(),
            "Parser diagnostics"
        );

        for diagnostic in &unit.diagnostics {
            match diagnostic.severity {
                _ if diagnostic.is_error() => error!("{}", diagnostic),
                Severity::Warning => warn!("{}", diagnostic),
                _ => debug!("{}", diagnostic),
            }
        }

        let errors = unit.diagnostics.iter().filter(|d| d.is_error()).count();

        if errors > 0 {
            error!(file = %unit.path.display(), "Could not build documentation due to parser errors");
            return Err(Error::Diagnostics {
                path: unit.path.clone(),
                count: errors,
            });
        }

        Ok(())
    }

    /// Create category nodes for `Outer::Inner` style names
    fn add_categories(&mut self, names: &[String]) {
        for name in names {
            self.tree.add_category(name);
        }
    }

    // =========================================================================
    // VISITING
    // =========================================================================

    fn visit(&mut self, unit: &TranslationUnit, index: u32, cursors: &[CursorId], parent: Option<NodeId>) {
        for &id in cursors {
            let cursor = unit.cursor(id);

            let Some(file) = cursor.file() else {
                self.visit(unit, index, &cursor.children, None);
                continue;
            };

            if self.processed.contains(file) || !self.sources.contains(file) {
                continue;
            }

            if cursor.kind == CursorKind::UnexposedDecl {
                self.visit(unit, index, &cursor.children, parent);
                continue;
            }

            if !self.processing.contains(file) {
                self.processing.insert(file.to_path_buf());
            }

            let key = CursorRef { unit: index, cursor: id };

            match registry::lookup(cursor.kind) {
                Some(Entry::Skip) => {}
                Some(Entry::Build(build)) => {
                    let existing = cursor.usr().and_then(|usr| self.tree.lookup_usr(usr));
                    let parent_is_typedef = parent
                        .map(|p| self.tree.node(p).kind == NodeKind::Typedef)
                        .unwrap_or(false);

                    let node = match existing {
                        // Members were registered when the record itself was visited
                        Some(found) if self.is_unnamed_record(found) && parent_is_typedef => {
                            if let Some(typedef) = parent {
                                self.register_anon_typedef(found, typedef);
                            }
                            None
                        }
                        Some(found) if !self.is_unnamed_record(found) => {
                            self.tree.cursor_to_node.insert(key, found);
                            if let Some(start) = cursor.start() {
                                self.tree.node_mut(found).add_anchor(start.clone());
                            }
                            Some(found)
                        }
                        // New symbol, or a distinct unnamed record sharing a USR
                        _ => {
                            let shape = build(unit, cursor);
                            let mut node = Node::new(shape.kind, cursor.spelling.as_str(), shape.details);
                            node.usr = cursor.usr().map(str::to_string);
                            node.cursor = Some(key);
                            node.location = cursor.start().cloned();
                            node.process_children = shape.process_children;
                            if shape.templated {
                                node.template = Some(TemplateInfo::default());
                            }

                            let created = self.tree.push(node);
                            self.register_node(created, key, parent);
                            Some(created)
                        }
                    };

                    if let Some(node) = node {
                        if self.tree.node(node).process_children {
                            self.visit(unit, index, &cursor.children, Some(node));
                        }
                    }
                }
                None => {
                    let owner = cursor
                        .semantic_parent
                        .and_then(|sp| {
                            self.tree
                                .cursor_to_node
                                .get(&CursorRef { unit: index, cursor: sp })
                                .copied()
                        })
                        .or(parent);

                    let handled = owner
                        .map(|p| self.offer_to_parent(p, unit, key))
                        .unwrap_or(false);

                    if !handled && !IGNORED_KINDS.contains(&cursor.kind) {
                        warn!(
                            kind = cursor.kind.as_str(),
                            location = %cursor.location.as_ref().map(|l| l.to_string()).unwrap_or_default(),
                            "Unhandled cursor"
                        );
                    }
                }
            }
        }
    }

    fn is_unnamed_record(&self, id: NodeId) -> bool {
        let node = self.tree.node(id);
        node.kind.is_record() && node.is_unnamed()
    }

    fn register_node(&mut self, id: NodeId, key: CursorRef, parent: Option<NodeId>) {
        self.tree.order.push(id);
        if let Some(usr) = self.tree.node(id).usr.clone() {
            self.tree.usr_to_node.insert(usr, id);
        }
        self.tree.cursor_to_node.insert(key, id);

        let Some(parent) = parent else {
            return;
        };

        // Typedefs own the declarations nested in them
        if self.tree.node(parent).kind == NodeKind::Typedef {
            self.tree.append(parent, id);
        }

        if let Some(access) = self.tree.node(parent).class_info().map(|c| c.current_access) {
            self.tree.node_mut(id).access = access;
        }
    }

    /// `typedef struct { ... } name;`: the record takes the typedef's name
    /// and identity, the typedef itself disappears
    fn register_anon_typedef(&mut self, record: NodeId, typedef: NodeId) {
        let (name, location, usr, cursor) = {
            let t = self.tree.node(typedef);
            (t.spelling.clone(), t.location.clone(), t.usr.clone(), t.cursor)
        };

        let node = self.tree.node_mut(record);
        node.typedef_name = Some(name);
        if let Some(location) = location {
            node.add_anchor(location);
        }

        self.tree.order.retain(|&id| id != typedef);
        if let Some(usr) = usr {
            self.tree.usr_to_node.insert(usr, record);
        }
        if let Some(cursor) = cursor {
            self.tree.cursor_to_node.insert(cursor, record);
        }
    }

    /// Let the enclosing node consume a cursor that creates no node
    fn offer_to_parent(&mut self, parent: NodeId, unit: &TranslationUnit, key: CursorRef) -> bool {
        let cursor = unit.cursor(key.cursor);
        let templated_function = {
            let node = self.tree.node(parent);
            node.kind.is_function() && node.is_templated()
        };

        let Some(info) = self.tree.node_mut(parent).class_info_mut() else {
            // Template bodies carry statements and references only
            return templated_function;
        };

        match cursor.kind {
            CursorKind::CxxAccessSpecifier => {
                info.current_access = cursor.access;
                true
            }
            CursorKind::CxxBaseSpecifier | CursorKind::ObjcProtocolRef => {
                let ty = cursor.ty.as_ref();
                let typename = ty
                    .map(|t| t.typename.clone())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| cursor.spelling.clone());
                let declaration = ty.and_then(|t| t.declaration).unwrap_or(key.cursor);

                let base = Base {
                    cursor: CursorRef {
                        unit: key.unit,
                        cursor: declaration,
                    },
                    access: cursor.access,
                    typename,
                    node: None,
                };

                if cursor.kind == CursorKind::CxxBaseSpecifier {
                    info.bases.push(base);
                } else {
                    info.implements.push(base);
                }
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // POST-PASS
    // =========================================================================

    /// Parent every orphan, attach comments and link class hierarchies
    pub fn finish(self) -> Tree {
        let TreeBuilder {
            mut tree,
            units,
            affinity,
            ..
        } = self;
        tree.units = units;

        for id in tree.order.clone() {
            if tree.parent(id).is_none() {
                let mut parent = tree.find_parent(id, affinity.as_ref());
                if tree.is_within(parent, id) {
                    parent = tree.root();
                }
                tree.append(parent, id);
            }

            if let Some(comment) = tree.find_comment(id).cloned() {
                tree.node_mut(id).merge_comment(comment, false);
            }
        }

        tree.freeze();
        tree.resolve_bases();

        let stats = tree.stats();
        info!(
            nodes = stats.nodes,
            documented = stats.documented,
            files = stats.files,
            "Built documentation tree"
        );

        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Access, JsonProvider, SourceLocation, TokenKind, TypeInfo, UnitBuilder};
    use crate::core::config::{ProviderConfig, TreeConfig};
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Log output collected by a test subscriber
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn at(line: u32, offset: u32) -> SourceLocation {
        SourceLocation::new("a.h", line, 1, offset)
    }

    fn build(units: Vec<TranslationUnit>) -> Tree {
        let sources = SourceSet::new(units.iter().map(|u| u.path.clone()), &TreeConfig::default());
        let mut builder = TreeBuilder::new(&Config::default(), sources);
        for unit in units {
            builder.add_unit(unit).unwrap();
        }
        builder.finish()
    }

    fn only(tree: &Tree, qid: &str) -> NodeId {
        let ids = tree.lookup_qid(qid);
        assert_eq!(ids.len(), 1, "expected one node for {}", qid);
        ids[0]
    }

    #[test]
    fn test_redeclarations_share_one_node() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.declare(root, CursorKind::StructDecl, "Foo", "c:@S@Foo", at(1, 0));
        b.declare(root, CursorKind::StructDecl, "Foo", "c:@S@Foo", at(2, 12));
        b.declare(root, CursorKind::StructDecl, "Foo", "c:@S@Foo", at(3, 24));
        let tree = build(vec![b.finish()]);

        let foo = only(&tree, "Foo");
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.node(foo).comment_locations().count(), 3);
        assert_eq!(tree.children(tree.root()), &[foo]);
    }

    #[test]
    fn test_nested_qualified_ids() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let ns = b.declare(root, CursorKind::Namespace, "A", "c:@N@A", at(1, 0));
        let class = b.declare(ns, CursorKind::ClassDecl, "B", "c:@N@A@S@B", at(2, 14));
        let public = b.child(class, CursorKind::CxxAccessSpecifier, "");
        b.cursor_mut(public).access = Access::Public;
        b.declare(class, CursorKind::CxxMethod, "C", "c:@N@A@S@B@F@C#", at(3, 30));
        let tree = build(vec![b.finish()]);

        let c = only(&tree, "A::B::C");
        assert_eq!(tree.node(c).kind, NodeKind::Method);
        assert_eq!(tree.node(c).access, Access::Public);
        assert_eq!(tree.refid(c), "A::B#A::B::C");
        assert_eq!(tree.refid(only(&tree, "A")), "A#A");
    }

    #[test]
    fn test_access_and_sorting() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let class = b.declare(root, CursorKind::ClassDecl, "C", "c:@S@C", at(1, 0));
        b.declare(class, CursorKind::FieldDecl, "hidden", "c:@S@C@FI@hidden", at(2, 10));
        let public = b.child(class, CursorKind::CxxAccessSpecifier, "");
        b.cursor_mut(public).access = Access::Public;
        b.declare(class, CursorKind::CxxMethod, "run", "c:@S@C@F@run#", at(4, 40));
        b.declare(class, CursorKind::Constructor, "C", "c:@S@C@F@C#", at(5, 50));
        let tree = build(vec![b.finish()]);

        let class = only(&tree, "C");
        let names: Vec<String> = tree
            .sorted_children(class)
            .into_iter()
            .map(|id| tree.name(id).into_owned())
            .collect();
        assert_eq!(names, vec!["C", "run", "hidden"]);
        assert_eq!(tree.node(only(&tree, "C::hidden")).access, Access::Private);
    }

    #[test]
    fn test_anonymous_struct_typedef() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let record = b.declare(root, CursorKind::StructDecl, "", "c:@SA@point_t", at(1, 8));
        b.declare(record, CursorKind::FieldDecl, "x", "c:@SA@point_t@FI@x", at(1, 17));
        let typedef = b.declare(root, CursorKind::TypedefDecl, "point_t", "c:a.h@T@point_t", at(1, 0));
        b.declare(typedef, CursorKind::StructDecl, "", "c:@SA@point_t", at(1, 8));
        let tree = build(vec![b.finish()]);

        let point = only(&tree, "point_t");
        assert_eq!(tree.node(point).kind, NodeKind::Struct);
        assert_eq!(tree.lookup_usr("c:a.h@T@point_t"), Some(point));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(tree.root()), &[point]);
        assert_eq!(tree.node(point).comment_locations().count(), 2);
        only(&tree, "point_t::x");
    }

    #[test]
    fn test_typedef_record_members_anchored_once() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let record = b.declare(root, CursorKind::StructDecl, "", "c:@SA@point_t", at(1, 8));
        let x = b.declare(record, CursorKind::FieldDecl, "x", "c:@SA@point_t@FI@x", at(1, 17));
        let typedef = b.declare(root, CursorKind::TypedefDecl, "point_t", "c:a.h@T@point_t", at(1, 0));
        let shared = b.declare(typedef, CursorKind::StructDecl, "", "c:@SA@point_t", at(1, 8));
        b.cursor_mut(shared).children.push(x);
        let tree = build(vec![b.finish()]);

        let x = only(&tree, "point_t::x");
        assert_eq!(tree.node(x).comment_locations().count(), 1);
        assert_eq!(tree.children(only(&tree, "point_t")), &[x]);
    }

    #[test]
    fn test_anonymous_members_are_numbered() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let outer = b.declare(root, CursorKind::StructDecl, "Outer", "c:@S@Outer", at(1, 0));
        let u = b.declare(outer, CursorKind::UnionDecl, "", "c:@S@Outer@Ua", at(2, 15));
        b.declare(u, CursorKind::FieldDecl, "a", "c:@S@Outer@Ua@FI@a", at(2, 23));
        let s = b.declare(outer, CursorKind::StructDecl, "", "c:@S@Outer@Sa", at(3, 40));
        b.declare(s, CursorKind::FieldDecl, "b", "c:@S@Outer@Sa@FI@b", at(3, 49));
        let tree = build(vec![b.finish()]);

        let outer = only(&tree, "Outer");
        let names: Vec<String> = tree
            .children(outer)
            .iter()
            .map(|&id| tree.name(id).into_owned())
            .collect();
        assert_eq!(names, vec!["(anonymous::1)", "(anonymous::2)"]);

        only(&tree, "Outer::a");
        only(&tree, "Outer::b");
        let a = only(&tree, "Outer::a");
        assert!(!tree.is_page(tree.parent(a).unwrap()));
        assert_eq!(tree.refid(a), "Outer#Outer::a");
    }

    #[test]
    fn test_comment_attachment() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.comment("/// A point.", at(1, 0));
        b.token(TokenKind::Keyword, "struct", at(2, 13));
        b.declare(root, CursorKind::StructDecl, "P", "c:@S@P", at(2, 13));
        b.token(TokenKind::Keyword, "int", at(3, 30));
        b.declare(root, CursorKind::VarDecl, "bare", "c:@bare", at(3, 30));
        let tree = build(vec![b.finish()]);

        let p = only(&tree, "P");
        assert_eq!(tree.comment(p).unwrap().brief.text, "A point.");
        assert!(tree.comment(only(&tree, "bare")).is_none());
        assert_eq!(tree.stats().documented, 1);
    }

    #[test]
    fn test_free_functions_group_under_struct() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let foo = b.declare(root, CursorKind::StructDecl, "foo", "c:@S@foo", at(1, 0));
        let pointer = TypeInfo {
            spelling: "struct foo *".to_string(),
            typename: "foo".to_string(),
            declaration: Some(foo),
            ..Default::default()
        };

        let ctor = b.declare(root, CursorKind::FunctionDecl, "foo_new", "c:@F@foo_new", at(2, 20));
        b.cursor_mut(ctor).result_type = Some(pointer.clone());

        let free = b.declare(root, CursorKind::FunctionDecl, "foo_free", "c:@F@foo_free", at(3, 50));
        let arg = b.child(free, CursorKind::ParmDecl, "self");
        b.cursor_mut(arg).ty = Some(pointer);

        b.declare(root, CursorKind::FunctionDecl, "helper", "c:@F@helper", at(4, 80));
        let tree = build(vec![b.finish()]);

        let foo = only(&tree, "foo");
        assert_eq!(tree.parent(only(&tree, "foo::foo_new")), Some(foo));
        assert_eq!(tree.parent(only(&tree, "foo::foo_free")), Some(foo));
        assert_eq!(tree.parent(only(&tree, "helper")), Some(tree.root()));
    }

    #[test]
    fn test_class_hierarchy() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let base = b.declare(root, CursorKind::ClassDecl, "Base", "c:@S@Base", at(1, 0));
        let derived = b.declare(root, CursorKind::ClassDecl, "Derived", "c:@S@Derived", at(2, 20));
        let spec = b.child(derived, CursorKind::CxxBaseSpecifier, "class Base");
        b.cursor_mut(spec).access = Access::Public;
        b.cursor_mut(spec).ty = Some(TypeInfo {
            declaration: Some(base),
            ..TypeInfo::named("Base")
        });
        let missing = b.child(derived, CursorKind::CxxBaseSpecifier, "class Missing");
        b.cursor_mut(missing).ty = Some(TypeInfo::named("Missing"));
        let tree = build(vec![b.finish()]);

        let base = only(&tree, "Base");
        let derived = only(&tree, "Derived");
        let info = tree.node(derived).class_info().unwrap();
        assert_eq!(info.bases.len(), 2);
        assert_eq!(info.bases[0].node, Some(base));
        assert_eq!(info.bases[1].node, None);
        assert_eq!(tree.node(base).class_info().unwrap().subclasses, vec![derived]);
        assert_eq!(tree.stats().unresolved_bases, 1);
    }

    #[test]
    fn test_category_parenting() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.comment("// cldoc:begin-category(Util::Math)", at(1, 0));
        b.token(TokenKind::Keyword, "int", at(2, 40));
        b.declare(root, CursorKind::FunctionDecl, "add", "c:@F@add", at(2, 40));
        b.comment("// cldoc:end-category()", at(3, 60));
        b.token(TokenKind::Keyword, "int", at(4, 90));
        b.declare(root, CursorKind::FunctionDecl, "sub", "c:@F@sub", at(4, 90));
        let tree = build(vec![b.finish()]);

        let math = tree.lookup_category("Util::Math").unwrap();
        let util = tree.lookup_category("Util").unwrap();
        assert_eq!(tree.parent(math), Some(util));
        assert_eq!(tree.parent(util), Some(tree.root()));

        let add = only(&tree, "Util::Math::add");
        assert_eq!(tree.parent(add), Some(math));
        assert_eq!(tree.parent(only(&tree, "sub")), Some(tree.root()));
        assert_eq!(tree.stats().categories, 2);
    }

    #[test]
    fn test_class_template_parameters() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let tpl = b.declare(root, CursorKind::ClassTemplate, "Box", "c:@ST>1#T@Box", at(1, 0));
        b.declare(tpl, CursorKind::TemplateTypeParameter, "T", "c:a.h@10", at(1, 10));
        let tree = build(vec![b.finish()]);

        let boxed = only(&tree, "Box");
        let t = only(&tree, "Box::T");
        assert!(tree.node(boxed).is_templated());
        assert_eq!(tree.node(boxed).template.as_ref().unwrap().parameters, vec![t]);
    }

    #[test]
    fn test_function_template_body_is_consumed() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let tpl = b.declare(root, CursorKind::FunctionTemplate, "max", "c:@FT@>1#Tmax#t0.0#S0_#", at(1, 0));
        b.declare(tpl, CursorKind::TemplateTypeParameter, "T", "c:a.h@9", at(1, 9));
        b.child(tpl, CursorKind::ParmDecl, "a");
        b.child(tpl, CursorKind::Statement, "");
        let tree = build(vec![b.finish()]);

        let max = only(&tree, "max");
        assert_eq!(tree.node(max).kind, NodeKind::Function);
        assert_eq!(tree.node(max).template.as_ref().unwrap().parameters.len(), 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_undocumented_files_are_skipped() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.declare(root, CursorKind::FunctionDecl, "mine", "c:@F@mine", at(1, 0));
        b.declare(
            root,
            CursorKind::FunctionDecl,
            "theirs",
            "c:@F@theirs",
            SourceLocation::new("/usr/include/stdio.h", 10, 1, 200),
        );
        b.child(root, CursorKind::UsingDirective, "std");
        let tree = build(vec![b.finish()]);

        assert_eq!(tree.len(), 1);
        only(&tree, "mine");
    }

    #[test]
    fn test_fatal_diagnostics_abort() {
        let mut b = UnitBuilder::new("a.h");
        b.diagnostic(Severity::Warning, "unused variable");
        b.diagnostic(Severity::Error, "unknown type name 'foo'");
        let sources = SourceSet::new(["a.h"], &TreeConfig::default());
        let mut builder = TreeBuilder::new(&Config::default(), sources);

        let err = builder.add_unit(b.finish()).unwrap_err();
        assert!(matches!(err, Error::Diagnostics { count: 1, .. }));

        let mut b = UnitBuilder::new("a.h");
        b.diagnostic(Severity::Warning, "unused variable");
        assert!(builder.add_unit(b.finish()).is_ok());
    }

    #[test]
    fn test_malformed_unit_is_rejected() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.declare(root, CursorKind::StructDecl, "Foo", "c:@S@Foo", at(1, 0));
        let mut unit = b.finish();
        unit.cursors[0].children.push(CursorId(42));

        let sources = SourceSet::new(["a.h"], &TreeConfig::default());
        let mut builder = TreeBuilder::new(&Config::default(), sources);
        let err = builder.add_unit(unit).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_unhandled_cursor_warns_and_continues() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.declare(root, CursorKind::Other, "mystery", "", at(1, 0));
        let class = b.declare(root, CursorKind::ClassDecl, "C", "c:@S@C", at(2, 20));
        b.child(class, CursorKind::Expression, "");
        b.declare(root, CursorKind::FunctionDecl, "after", "c:@F@after", at(3, 40));
        let unit = b.finish();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let tree = tracing::subscriber::with_default(subscriber, || build(vec![unit]));

        only(&tree, "C");
        only(&tree, "after");
        let logs = captured.text();
        assert_eq!(logs.matches("Unhandled cursor").count(), 2);
        assert!(logs.contains("other"));
        assert!(logs.contains("expression"));
    }

    #[test]
    fn test_included_headers_are_processed_once() {
        let mut b = UnitBuilder::new("a.cpp");
        let root = b.root();
        b.include("a.h");
        b.comment("// Shared thing.", at(1, 0));
        b.token(TokenKind::Keyword, "struct", at(2, 17));
        b.declare(root, CursorKind::StructDecl, "Shared", "c:@S@Shared", at(2, 17));
        b.declare(
            root,
            CursorKind::FunctionDecl,
            "local",
            "c:@F@local",
            SourceLocation::new("a.cpp", 3, 1, 40),
        );

        let sources = SourceSet::new(["a.h", "a.cpp"], &TreeConfig::default());
        let mut provider = JsonProvider::from_units([b.finish()], ProviderConfig::default()).unwrap();
        let mut builder = TreeBuilder::new(&Config::default(), sources);
        builder.process(&mut provider).unwrap();
        let tree = builder.finish();

        let shared = only(&tree, "Shared");
        assert_eq!(tree.comment(shared).unwrap().brief.text, "Shared thing.");
        only(&tree, "local");
        assert!(tree.comments_for(Path::new("a.h")).is_some());
        assert_eq!(tree.stats().units, 1);
    }
}
