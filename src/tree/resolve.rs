//! Reference Resolver
//!
//! Turns the text of every comment field into components: `[code]`
//! examples, fenced markdown blocks, literal text and `<Name>` references
//! resolved against the finished tree.
//!
//! Reference forms:
//! - `<A::B>` resolves `A` from the commented node outwards, then `B` inside it
//! - `<[label]A::B>` does the same and renders as `label`
//! - `$<pattern>` matches names against a regex anchored at the start
//!
//! @module tree/resolve

use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::node::NodeId;
use super::symbols::Tree;
use crate::comments::{Component, Reference};

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^    \[code\]\n((?:(?:    .*)?\n)*)").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^ *(`{3,}|~{3,})").unwrap());
static REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<isregex>[$]?)<(?:\[(?P<refname>[^\]]*)\])?(?P<ref>operator(?:>>|>|>=)|[^>\n]+)>")
        .unwrap()
});

// =============================================================================
// SPLITTING
// =============================================================================

/// Unresolved piece of a field
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece<'a> {
    Text(&'a str),
    Example(String),
    Markdown(&'a str),
    Ref {
        pattern: bool,
        display: Option<&'a str>,
        name: &'a str,
    },
}

/// Split field text; `text` must end with a newline for trailing examples to match
fn split(text: &str) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in CODE_RE.captures_iter(text) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        split_markdown(&text[last..whole.start()], &mut out);
        out.push(Piece::Example(unindent(code.as_str())));
        last = whole.end();
    }
    split_markdown(&text[last..], &mut out);

    out
}

fn unindent(code: &str) -> String {
    let lines: Vec<&str> = code
        .lines()
        .map(|l| l.strip_prefix("    ").unwrap_or(l))
        .collect();
    lines.join("\n").trim_end_matches('\n').to_string()
}

fn split_markdown<'a>(text: &'a str, out: &mut Vec<Piece<'a>>) {
    let mut last = 0;

    for caps in FENCE_RE.captures_iter(text) {
        let (Some(open), Some(fence)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // Closing fences of a block already taken
        if open.start() < last {
            continue;
        }
        let Some(close) = text[open.end()..].find(fence.as_str()) else {
            continue;
        };

        let end = open.end() + close + fence.as_str().len();
        split_refs(&text[last..open.start()], out);
        out.push(Piece::Markdown(&text[open.start()..end]));
        last = end;
    }
    split_refs(&text[last..], out);
}

fn split_refs<'a>(text: &'a str, out: &mut Vec<Piece<'a>>) {
    let mut last = 0;

    for caps in REF_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("ref")) else {
            continue;
        };
        if whole.start() > last {
            out.push(Piece::Text(&text[last..whole.start()]));
        }
        out.push(Piece::Ref {
            pattern: caps.name("isregex").map_or(false, |m| !m.as_str().is_empty()),
            display: caps
                .name("refname")
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty()),
            name: name.as_str(),
        });
        last = whole.end();
    }

    if last < text.len() {
        out.push(Piece::Text(&text[last..]));
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

enum Matcher<'a> {
    Name(&'a str),
    Pattern(Regex),
}

impl Matcher<'_> {
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Name(n) => *n == name,
            Self::Pattern(re) => re.is_match(name),
        }
    }
}

/// Counts from one resolver pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub comments: usize,
    pub references: usize,
    pub unresolved: usize,
}

/// Resolves inline references of every comment in a tree
pub struct ReferenceResolver<'t> {
    tree: &'t mut Tree,
    stats: ResolveStats,
}

impl<'t> ReferenceResolver<'t> {
    pub fn new(tree: &'t mut Tree) -> Self {
        Self {
            tree,
            stats: ResolveStats::default(),
        }
    }

    /// Resolve every comment reachable from the root; resolved comments are skipped
    pub fn resolve_all(mut self) -> ResolveStats {
        for (id, _) in self.tree.walk() {
            self.resolve_node(id);
        }

        info!(
            comments = self.stats.comments,
            references = self.stats.references,
            unresolved = self.stats.unresolved,
            "Resolved references"
        );
        self.stats
    }

    pub fn resolve_node(&mut self, id: NodeId) {
        let Some(mut comment) = self.tree.node_mut(id).comment.take() else {
            return;
        };

        if !comment.is_resolved() {
            let mut stats = ResolveStats {
                comments: 1,
                ..Default::default()
            };

            for field in comment.fields_mut() {
                field.components = self.components(id, &field.text, &mut stats);
            }
            comment.mark_resolved();

            self.stats.comments += stats.comments;
            self.stats.references += stats.references;
            self.stats.unresolved += stats.unresolved;
        }

        self.tree.node_mut(id).comment = Some(comment);
    }

    fn components(&self, id: NodeId, text: &str, stats: &mut ResolveStats) -> Vec<Component> {
        let padded = !text.ends_with('\n');
        let owned;
        let source = if padded {
            owned = format!("{}\n", text);
            owned.as_str()
        } else {
            text
        };

        let mut pieces = split(source);
        if padded {
            if let Some(Piece::Text(last)) = pieces.last_mut() {
                let tail: &str = *last;
                *last = tail.strip_suffix('\n').unwrap_or(tail);
            }
            if matches!(pieces.last(), Some(Piece::Text(""))) {
                pieces.pop();
            }
        }

        pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Text(t) => Component::Text(t.to_string()),
                Piece::Example(code) => Component::Example(code),
                Piece::Markdown(block) => Component::MarkdownCode(block.to_string()),
                Piece::Ref {
                    pattern,
                    display,
                    name,
                } => {
                    let targets = self.lookup(id, name, pattern);
                    if targets.is_empty() {
                        stats.unresolved += 1;
                        debug!(node = %self.tree.qid(id), reference = name, "Unresolved reference");
                        Component::Unresolved(name.to_string())
                    } else {
                        stats.references += 1;
                        Component::Reference(Reference {
                            targets,
                            display: display.map(str::to_string),
                            original: name.to_string(),
                        })
                    }
                }
            })
            .collect()
    }

    /// Nodes a reference written in `from`'s comment points at
    pub fn lookup(&self, from: NodeId, name: &str, pattern: bool) -> SmallVec<[NodeId; 2]> {
        let matchers: Vec<Matcher<'_>> = if pattern {
            match Regex::new(&format!("^(?:{})", name)) {
                Ok(re) => vec![Matcher::Pattern(re)],
                Err(e) => {
                    warn!(pattern = name, error = %e, "Invalid reference pattern");
                    return SmallVec::new();
                }
            }
        } else {
            name.split("::").map(Matcher::Name).collect()
        };

        let mut current: SmallVec<[NodeId; 2]> = SmallVec::new();
        current.push(from);

        for (i, matcher) in matchers.iter().enumerate() {
            let mut next: SmallVec<[NodeId; 2]> = SmallVec::new();
            for &node in &current {
                for found in self.find(node, matcher, i == 0) {
                    if !next.contains(&found) {
                        next.push(found);
                    }
                }
            }

            if next.is_empty() {
                return next;
            }
            current = next;
        }

        current
    }

    fn find(&self, node: NodeId, matcher: &Matcher<'_>, go_up: bool) -> Vec<NodeId> {
        let mut scope = Some(node);

        while let Some(n) = scope {
            let found: Vec<NodeId> = self
                .tree
                .resolve_nodes(n)
                .into_iter()
                .filter(|&c| matcher.matches(&self.tree.name(c)))
                .collect();

            if !found.is_empty() || !go_up {
                return found;
            }
            scope = self.tree.parent(n);
        }

        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Access, CursorKind, SourceLocation, TokenKind, TypeInfo, UnitBuilder};
    use crate::core::config::{Config, TreeConfig};
    use crate::core::sources::SourceSet;
    use crate::tree::TreeBuilder;

    fn at(line: u32, offset: u32) -> SourceLocation {
        SourceLocation::new("a.h", line, 1, offset)
    }

    fn build(b: UnitBuilder) -> Tree {
        let sources = SourceSet::new(["a.h"], &TreeConfig::default());
        let mut builder = TreeBuilder::new(&Config::default(), sources);
        builder.add_unit(b.finish()).unwrap();
        builder.finish()
    }

    /// Declaration preceded by a line comment
    fn documented(
        b: &mut UnitBuilder,
        parent: crate::ast::CursorId,
        kind: CursorKind,
        name: &str,
        doc: &str,
        line: u32,
    ) -> crate::ast::CursorId {
        let offset = line * 100;
        b.comment(&format!("/// {}", doc), at(line, offset));
        b.token(TokenKind::Identifier, name, at(line + 1, offset + 50));
        b.declare(parent, kind, name, &format!("c:@{}", name), at(line + 1, offset + 50))
    }

    fn brief(tree: &Tree, qid: &str) -> Vec<Component> {
        let id = tree.lookup_qid(qid)[0];
        tree.comment(id).unwrap().brief.components.clone()
    }

    #[test]
    fn test_split_references() {
        let pieces = split("See <Foo::bar> or <[the getter]get>.\n");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("See "),
                Piece::Ref { pattern: false, display: None, name: "Foo::bar" },
                Piece::Text(" or "),
                Piece::Ref { pattern: false, display: Some("the getter"), name: "get" },
                Piece::Text(".\n"),
            ]
        );

        let pieces = split("$<item_.*> and <operator>>\n");
        assert_eq!(pieces[0], Piece::Ref { pattern: true, display: None, name: "item_.*" });
        assert_eq!(pieces[2], Piece::Ref { pattern: false, display: None, name: "operator>" });
    }

    #[test]
    fn test_split_code_example() {
        let pieces = split("Intro\n\n    [code]\n    int x = 1;\n\n    x++;\nAfter <y>\n");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("Intro\n\n"),
                Piece::Example("int x = 1;\n\nx++;".to_string()),
                Piece::Text("After "),
                Piece::Ref { pattern: false, display: None, name: "y" },
                Piece::Text("\n"),
            ]
        );
    }

    #[test]
    fn test_split_markdown_fence() {
        let pieces = split("Use:\n```\nfoo<int>()\n```\ndone\n");
        assert_eq!(
            pieces,
            vec![
                Piece::Text("Use:\n"),
                Piece::Markdown("```\nfoo<int>()\n```"),
                Piece::Text("\ndone\n"),
            ]
        );

        // Unclosed fences stay text
        let pieces = split("~~~\n<x>\n");
        assert_eq!(pieces[0], Piece::Text("~~~\n"));
        assert_eq!(pieces[1], Piece::Ref { pattern: false, display: None, name: "x" });
    }

    #[test]
    fn test_resolves_qualified_and_missing() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        documented(&mut b, root, CursorKind::FunctionDecl, "user", "Calls <Foo::bar> and <NoSuchThing>.", 1);
        let class = b.declare(root, CursorKind::StructDecl, "Foo", "c:@S@Foo", at(5, 500));
        b.declare(class, CursorKind::CxxMethod, "bar", "c:@S@Foo@F@bar#", at(6, 600));
        let mut tree = build(b);

        let stats = ReferenceResolver::new(&mut tree).resolve_all();
        assert_eq!(stats, ResolveStats { comments: 1, references: 1, unresolved: 1 });

        let bar = tree.lookup_qid("Foo::bar")[0];
        assert_eq!(
            brief(&tree, "user"),
            vec![
                Component::Text("Calls ".into()),
                Component::Reference(Reference {
                    targets: SmallVec::from_slice(&[bar]),
                    display: None,
                    original: "Foo::bar".into(),
                }),
                Component::Text(" and ".into()),
                Component::Unresolved("NoSuchThing".into()),
                Component::Text(".".into()),
            ]
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        documented(&mut b, root, CursorKind::FunctionDecl, "a", "Pairs with <b>.", 1);
        documented(&mut b, root, CursorKind::FunctionDecl, "b", "Pairs with <a>.", 3);
        let mut tree = build(b);

        ReferenceResolver::new(&mut tree).resolve_all();
        let first = brief(&tree, "a");

        let stats = ReferenceResolver::new(&mut tree).resolve_all();
        assert_eq!(stats.comments, 0);
        assert_eq!(brief(&tree, "a"), first);
        assert!(matches!(first[1], Component::Reference(_)));
    }

    #[test]
    fn test_members_inherited_from_bases() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        let base = b.declare(root, CursorKind::ClassDecl, "Base", "c:@S@Base", at(1, 10));
        let public = b.child(base, CursorKind::CxxAccessSpecifier, "");
        b.cursor_mut(public).access = Access::Public;
        b.declare(base, CursorKind::CxxMethod, "run", "c:@S@Base@F@run#", at(2, 20));

        let derived = b.declare(root, CursorKind::ClassDecl, "Derived", "c:@S@Derived", at(3, 30));
        let spec = b.child(derived, CursorKind::CxxBaseSpecifier, "class Base");
        b.cursor_mut(spec).access = Access::Public;
        b.cursor_mut(spec).ty = Some(TypeInfo {
            declaration: Some(base),
            ..TypeInfo::named("Base")
        });
        documented(&mut b, derived, CursorKind::CxxMethod, "go", "Uses <run>.", 4);

        let hidden = b.declare(root, CursorKind::ClassDecl, "Hidden", "c:@S@Hidden", at(7, 700));
        let spec = b.child(hidden, CursorKind::CxxBaseSpecifier, "class Base");
        b.cursor_mut(spec).access = Access::Private;
        b.cursor_mut(spec).ty = Some(TypeInfo::named("Base"));
        documented(&mut b, hidden, CursorKind::CxxMethod, "stop", "Not <run>.", 8);
        let mut tree = build(b);

        ReferenceResolver::new(&mut tree).resolve_all();

        let run = tree.lookup_qid("Base::run")[0];
        match &brief(&tree, "Derived::go")[1] {
            Component::Reference(r) => assert_eq!(r.targets.as_slice(), &[run]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(brief(&tree, "Hidden::stop")[1], Component::Unresolved("run".into()));
    }

    #[test]
    fn test_pattern_and_display() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        b.declare(root, CursorKind::FunctionDecl, "item_get", "c:@F@item_get", at(1, 10));
        b.declare(root, CursorKind::FunctionDecl, "item_set", "c:@F@item_set", at(2, 20));
        documented(&mut b, root, CursorKind::FunctionDecl, "other", "See $<item_> and <[the getter]item_get>.", 3);
        let mut tree = build(b);

        ReferenceResolver::new(&mut tree).resolve_all();

        let get = tree.lookup_qid("item_get")[0];
        let set = tree.lookup_qid("item_set")[0];
        let components = brief(&tree, "other");

        match &components[1] {
            Component::Reference(r) => {
                assert_eq!(r.targets.as_slice(), &[get, set]);
                assert_eq!(r.original, "item_");
            }
            other => panic!("unexpected {:?}", other),
        }
        match &components[3] {
            Component::Reference(r) => {
                assert_eq!(r.targets.as_slice(), &[get]);
                assert_eq!(r.display.as_deref(), Some("the getter"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pattern_is_unresolved() {
        let mut b = UnitBuilder::new("a.h");
        let root = b.root();
        documented(&mut b, root, CursorKind::FunctionDecl, "f", "Broken $<(>.", 1);
        let mut tree = build(b);

        ReferenceResolver::new(&mut tree).resolve_all();
        assert_eq!(brief(&tree, "f")[1], Component::Unresolved("(".into()));
    }
}
