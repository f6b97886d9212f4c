//! Symbol Tree
//!
//! The finished documentation model: an arena of nodes rooted at a single
//! root node, plus the lookup maps built while visiting translation units.
//! Qualified and reference ids are cached once parenting is complete.
//!
//! @module tree/symbols

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use smallvec::SmallVec;
use tracing::debug;

use super::affinity::StructAffinity;
use super::naming::natural_cmp;
use super::node::{CursorRef, Node, NodeDetails, NodeId, NodeKind};
use crate::ast::{Access, TranslationUnit};
use crate::comments::{Comment, CommentsDatabase};

/// Cursor ancestry deeper than this is treated as malformed
const MAX_ANCESTRY: usize = 256;

// =============================================================================
// TREE
// =============================================================================

/// Documentation tree with its lookup maps
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    /// Registered nodes in creation order (root excluded)
    pub(crate) order: Vec<NodeId>,
    pub(crate) usr_to_node: HashMap<String, NodeId>,
    pub(crate) cursor_to_node: HashMap<CursorRef, NodeId>,
    pub(crate) qid_to_node: HashMap<CompactString, SmallVec<[NodeId; 2]>>,
    pub(crate) category_to_node: HashMap<String, NodeId>,
    pub(crate) comments: HashMap<PathBuf, CommentsDatabase>,
    pub(crate) units: Vec<TranslationUnit>,
}

impl Tree {
    pub(crate) fn new() -> Self {
        let mut root = Node::new(NodeKind::Root, "", NodeDetails::Plain);
        root.process_children = true;

        Self {
            nodes: vec![root],
            root: NodeId(0),
            order: Vec::new(),
            usr_to_node: HashMap::new(),
            cursor_to_node: HashMap::new(),
            qid_to_node: HashMap::new(),
            category_to_node: HashMap::new(),
            comments: HashMap::new(),
            units: Vec::new(),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Registered nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline]
    pub fn name(&self, id: NodeId) -> Cow<'_, str> {
        self.node(id).name()
    }

    /// Make `child` the last child of `parent`
    pub(crate) fn append(&mut self, parent: NodeId, child: NodeId) {
        let sort_index = self.node(parent).children.len();
        let unnamed = self.node(child).name().is_empty();
        let is_param = self.node(child).kind.is_template_parameter();

        let p = self.node_mut(parent);
        p.children.push(child);
        let anonymous_id = if unnamed {
            p.num_anon += 1;
            p.num_anon
        } else {
            0
        };
        if is_param {
            if let Some(template) = p.template.as_mut() {
                template.parameters.push(child);
            }
        }

        let c = self.node_mut(child);
        c.parent = Some(parent);
        c.sort_index = sort_index;
        if anonymous_id > 0 {
            c.anonymous_id = anonymous_id;
        }
    }

    /// Category node for an `Outer::Inner` style name, creating missing levels
    pub(crate) fn add_category(&mut self, name: &str) -> NodeId {
        let mut parent = self.root;
        let mut full = String::new();

        for part in name.split("::") {
            if !full.is_empty() {
                full.push_str("::");
            }
            full.push_str(part);

            parent = match self.lookup_category(&full) {
                Some(existing) => existing,
                None => {
                    let mut node = Node::new(NodeKind::Category, part, NodeDetails::Plain);
                    node.process_children = true;
                    let id = self.push(node);
                    self.order.push(id);
                    self.append(parent, id);
                    self.category_to_node.insert(full.clone(), id);
                    id
                }
            };
        }

        parent
    }

    /// Whether `id` is `ancestor` or lies below it
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // =========================================================================
    // NAMING
    // =========================================================================

    /// Nearest ancestor that is not anonymous
    pub fn semantic_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut parent = self.parent(id);
        while let Some(p) = parent {
            if !self.node(p).is_anonymous() {
                break;
            }
            parent = self.parent(p);
        }
        parent
    }

    /// Fully scoped name (`A::B::C`)
    pub fn qid(&self, id: NodeId) -> Cow<'_, str> {
        match &self.node(id).qid {
            Some(qid) => Cow::Borrowed(qid.as_str()),
            None => Cow::Owned(self.compute_qid(id)),
        }
    }

    fn compute_qid(&self, id: NodeId) -> String {
        let name = self.name(id);

        let Some(parent) = self.semantic_parent(id) else {
            return name.into_owned();
        };

        let q = self.qid(parent);
        if q.is_empty() {
            name.into_owned()
        } else if name.is_empty() {
            q.into_owned()
        } else {
            format!("{}::{}", q, name)
        }
    }

    /// Whether a node gets its own output page
    pub fn is_page(&self, id: NodeId) -> bool {
        let node = self.node(id);
        match node.kind {
            NodeKind::Root | NodeKind::Namespace | NodeKind::Category => true,
            NodeKind::Typedef => !node.children.is_empty(),
            kind if kind.is_class() => !node.is_anonymous(),
            _ => false,
        }
    }

    /// Link target: `<page qid>#<qid>`, or `index#<qid>` for loose top-level symbols
    pub fn refid(&self, id: NodeId) -> Cow<'_, str> {
        if let Some(refid) = &self.node(id).refid {
            return Cow::Borrowed(refid.as_str());
        }
        Cow::Owned(self.compute_refid(id))
    }

    fn compute_refid(&self, id: NodeId) -> String {
        let qid = self.qid(id);

        match self.parent(id) {
            None => return format!("index#{}", qid),
            Some(p) if p == self.root && !self.is_page(id) => return format!("index#{}", qid),
            _ => {}
        }

        let mut page = id;
        while !self.is_page(page) {
            match self.parent(page) {
                Some(p) => page = p,
                None => break,
            }
        }
        format!("{}#{}", self.qid(page), qid)
    }

    /// Cache qualified and reference ids and fill the qualified-id map
    pub(crate) fn freeze(&mut self) {
        let walk = self.walk();

        for &(id, _) in &walk {
            let qid = self.compute_qid(id);
            self.node_mut(id).qid = Some(qid);
        }
        for &(id, _) in &walk {
            let refid = self.compute_refid(id);
            self.node_mut(id).refid = Some(refid);
        }

        self.qid_to_node.clear();
        for id in self.order.clone() {
            let qid = CompactString::from(self.qid(id).as_ref());
            self.qid_to_node.entry(qid).or_default().push(id);
        }
    }

    // =========================================================================
    // LOOKUP
    // =========================================================================

    /// Nodes with a qualified id, in creation order
    pub fn lookup_qid(&self, qid: &str) -> &[NodeId] {
        self.qid_to_node
            .get(qid)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn lookup_usr(&self, usr: &str) -> Option<NodeId> {
        self.usr_to_node.get(usr).copied()
    }

    pub fn lookup_category(&self, name: &str) -> Option<NodeId> {
        self.category_to_node.get(name).copied()
    }

    /// Node for a cursor: by identity, then USR, then through the template
    /// it specializes or a same-named child of its semantic parent
    pub fn lookup_cursor(&self, cursor: CursorRef) -> Option<NodeId> {
        self.lookup_cursor_depth(cursor, 0)
    }

    fn lookup_cursor_depth(&self, cref: CursorRef, depth: usize) -> Option<NodeId> {
        if depth > MAX_ANCESTRY {
            return None;
        }
        if let Some(&id) = self.cursor_to_node.get(&cref) {
            return Some(id);
        }

        let unit = self.units.get(cref.unit as usize)?;
        let cursor = unit.get(cref.cursor)?;
        if let Some(id) = cursor.usr().and_then(|u| self.lookup_usr(u)) {
            return Some(id);
        }

        if let Some(template) = cursor.specialized_template {
            return self.lookup_cursor_depth(
                CursorRef {
                    unit: cref.unit,
                    cursor: template,
                },
                depth + 1,
            );
        }

        let parent = self.lookup_cursor_depth(
            CursorRef {
                unit: cref.unit,
                cursor: cursor.semantic_parent?,
            },
            depth + 1,
        )?;
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.node(child).spelling.as_str() == cursor.spelling.as_str())
    }

    /// Comment database of a documented file
    pub fn comments_for(&self, path: &Path) -> Option<&CommentsDatabase> {
        self.comments.get(path)
    }

    pub fn comment(&self, id: NodeId) -> Option<&Comment> {
        self.node(id).comment.as_ref()
    }

    // =========================================================================
    // TRAVERSAL
    // =========================================================================

    /// Pre-order walk from the root with depths
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut out = Vec::with_capacity(self.order.len() + 1);
        let mut stack = vec![(self.root, 0usize)];

        while let Some((id, depth)) = stack.pop() {
            out.push((id, depth));
            for &child in self.children(id).iter().rev() {
                stack.push((child, depth + 1));
            }
        }

        out
    }

    /// Children in documentation order: access, kind category, then natural name.
    /// Enum values keep declaration order.
    pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.children(id).to_vec();
        if self.node(id).kind == NodeKind::Enum {
            return children;
        }

        children.sort_by(|&a, &b| {
            let (na, nb) = (self.node(a), self.node(b));
            na.access
                .cmp(&nb.access)
                .then_with(|| na.kind.sort_category().cmp(&nb.kind.sort_category()))
                .then_with(|| {
                    let (x, y) = (na.name(), nb.name());
                    if x.is_empty() || y.is_empty() {
                        std::cmp::Ordering::Equal
                    } else {
                        natural_cmp(&x, &y)
                    }
                })
        });
        children
    }

    /// Nodes visible by simple name from inside `id`: children, members of
    /// anonymous children and, for classes, non-private bases and their members
    pub fn resolve_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_resolve_nodes(id, &mut out, &mut seen);
        out
    }

    fn collect_resolve_nodes(&self, id: NodeId, out: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>) {
        if !seen.insert(id) {
            return;
        }

        for &child in self.children(id) {
            out.push(child);
            if self.node(child).is_anonymous() {
                out.extend(self.children(child).iter().copied());
            }
        }

        if let Some(info) = self.node(id).class_info() {
            for base in info.bases.iter().chain(&info.implements) {
                let Some(target) = base.node else { continue };
                if base.access == Access::Private {
                    continue;
                }
                out.push(target);
                self.collect_resolve_nodes(target, out, seen);
            }
        }
    }

    // =========================================================================
    // POST-PASS
    // =========================================================================

    /// Parent for a node that was registered without one
    pub(crate) fn find_parent(&self, id: NodeId, affinity: &dyn StructAffinity) -> NodeId {
        self.find_scope_parent(id)
            .or_else(|| self.find_struct_parent(id, affinity))
            .or_else(|| self.find_category_parent(id))
            .unwrap_or(self.root)
    }

    /// Nearest mapped ancestor in the declaring cursor's ancestry
    fn find_scope_parent(&self, id: NodeId) -> Option<NodeId> {
        let cref = self.node(id).cursor?;
        let unit = self.units.get(cref.unit as usize)?;

        let mut current = unit.get(cref.cursor)?;
        for _ in 0..MAX_ANCESTRY {
            let next = current.semantic_parent.or(current.lexical_parent)?;
            let found = self.lookup_cursor(CursorRef {
                unit: cref.unit,
                cursor: next,
            });
            if let Some(parent) = found.filter(|&p| p != id) {
                return Some(parent);
            }
            current = unit.get(next)?;
        }
        None
    }

    /// Owning struct of a C-style free function
    fn find_struct_parent(&self, id: NodeId, affinity: &dyn StructAffinity) -> Option<NodeId> {
        let node = self.node(id);
        if node.kind != NodeKind::Function {
            return None;
        }
        let info = node.function_info()?;
        let unit = node.cursor?.unit;

        affinity
            .candidates(&node.spelling, info)
            .into_iter()
            .filter_map(|ty| ty.declaration)
            .filter_map(|decl| self.lookup_cursor(CursorRef { unit, cursor: decl }))
            .find(|&owner| {
                let kind = self.node(owner).kind;
                owner != id && (kind.is_record() || kind == NodeKind::Typedef)
            })
    }

    /// Category region enclosing the declaration start
    fn find_category_parent(&self, id: NodeId) -> Option<NodeId> {
        let location = self.node(id).location.as_ref()?;
        let db = self.comments.get(&location.file)?;
        let name = db.lookup_category(location.offset)?;
        self.lookup_category(name)
    }

    /// First comment found at any of the node's anchors
    pub(crate) fn find_comment(&self, id: NodeId) -> Option<&Comment> {
        self.node(id).comment_locations().find_map(|location| {
            self.comments
                .get(&location.file)
                .and_then(|db| db.lookup(location.offset))
        })
    }

    /// Link class bases and protocols to their targets by qualified id
    pub(crate) fn resolve_bases(&mut self) {
        let mut links: Vec<(NodeId, bool, usize, NodeId)> = Vec::new();

        for &id in &self.order {
            let Some(info) = self.node(id).class_info() else {
                continue;
            };

            let relations = info
                .bases
                .iter()
                .map(|b| (false, b))
                .enumerate()
                .chain(info.implements.iter().map(|b| (true, b)).enumerate());

            for (idx, (implements, base)) in relations {
                let target = self
                    .lookup_qid(&base.typename)
                    .iter()
                    .copied()
                    .find(|&t| t != id && self.node(t).kind.is_class());

                match target {
                    Some(target) => links.push((id, implements, idx, target)),
                    None => debug!(
                        class = %self.qid(id),
                        base = %base.typename,
                        "Unresolved base"
                    ),
                }
            }
        }

        for (id, implements, idx, target) in links {
            if let Some(info) = self.node_mut(id).class_info_mut() {
                let list = if implements {
                    &mut info.implements
                } else {
                    &mut info.bases
                };
                list[idx].node = Some(target);
            }
            if let Some(info) = self.node_mut(target).class_info_mut() {
                if implements {
                    info.implemented_by.push(id);
                } else {
                    info.subclasses.push(id);
                }
            }
        }
    }

    /// Summary counts
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            files: self.comments.len(),
            units: self.units.len(),
            nodes: self.order.len(),
            ..Default::default()
        };

        for &id in &self.order {
            let node = self.node(id);
            if node.parent.is_none() {
                continue;
            }
            if node.comment.is_some() {
                stats.documented += 1;
            }
            match node.kind {
                NodeKind::Category => stats.categories += 1,
                kind if kind.is_class() => stats.classes += 1,
                kind if kind.is_function() => stats.functions += 1,
                _ => {}
            }
            if let Some(info) = node.class_info() {
                stats.unresolved_bases += info
                    .bases
                    .iter()
                    .chain(&info.implements)
                    .filter(|b| b.node.is_none())
                    .count();
            }
        }

        stats
    }
}

// =============================================================================
// STATS
// =============================================================================

/// Counts reported after a build
#[derive(Debug, Clone, Default)]
pub struct TreeStats {
    pub units: usize,
    pub files: usize,
    pub nodes: usize,
    pub documented: usize,
    pub categories: usize,
    pub classes: usize,
    pub functions: usize,
    pub unresolved_bases: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Documentation tree:")?;
        writeln!(f, "  Translation units: {}", self.units)?;
        writeln!(f, "  Files:             {}", self.files)?;
        writeln!(f, "  Nodes:             {}", self.nodes)?;
        writeln!(f, "  Documented:        {}", self.documented)?;
        writeln!(f, "  Categories:        {}", self.categories)?;
        writeln!(f, "  Classes:           {}", self.classes)?;
        writeln!(f, "  Functions:         {}", self.functions)?;
        write!(f, "  Unresolved bases:  {}", self.unresolved_bases)
    }
}
