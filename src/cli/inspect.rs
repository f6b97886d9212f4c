//! Inspect command implementation

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::ast::{Access, JsonProvider};
use crate::cli::{InspectArgs, OutputFormat};
use crate::comments::{Component, DocString};
use crate::core::config::Config;
use crate::core::sources::SourceSet;
use crate::tree::{self, NodeId, Tree};

/// Run the inspect command
pub fn run(args: InspectArgs, config: &Config) -> Result<()> {
    let mut config = config.clone();
    config.merge.files.extend(args.merge.iter().cloned());
    if args.merge_filter.is_some() {
        config.merge.filter = args.merge_filter.clone();
    }
    let config = &config;

    let mut provider = JsonProvider::open(&args.ast, config.provider.clone())
        .with_context(|| format!("Failed to load AST dump {}", args.ast.display()))?;

    let files: Vec<PathBuf> = if args.files.is_empty() {
        let mut all: Vec<PathBuf> = provider.paths().map(|p| p.to_path_buf()).collect();
        all.sort();
        all
    } else {
        args.files.clone()
    };

    let sources = SourceSet::new(&files, &config.tree);
    info!(files = sources.len(), dump = %args.ast.display(), "Building documentation");

    let tree = tree::build(config, sources, &mut provider).context("Failed to build documentation")?;

    if args.stats {
        match args.format() {
            OutputFormat::Human => println!("{}", tree.stats()),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&StatsView::from(&tree))?),
        }
        return Ok(());
    }

    match args.format() {
        OutputFormat::Human => print!("{}", format_outline(&tree)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outline(&tree, tree.root()))?),
    }

    Ok(())
}

// =============================================================================
// OUTLINE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct OutlineNode {
    pub kind: &'static str,
    pub name: String,
    pub qid: String,
    pub refid: String,
    pub access: Access,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineNode>,
}

/// Nested view of the tree in documentation order
pub fn outline(tree: &Tree, id: NodeId) -> OutlineNode {
    let node = tree.node(id);

    OutlineNode {
        kind: node.kind.as_str(),
        name: tree.name(id).into_owned(),
        qid: tree.qid(id).into_owned(),
        refid: tree.refid(id).into_owned(),
        access: node.access,
        brief: brief(tree, id),
        children: tree
            .sorted_children(id)
            .into_iter()
            .map(|child| outline(tree, child))
            .collect(),
    }
}

/// Indented `kind qid - brief` lines, root excluded
pub fn format_outline(tree: &Tree) -> String {
    let mut out = String::new();
    for child in tree.sorted_children(tree.root()) {
        write_node(tree, child, 0, &mut out);
    }
    out
}

fn write_node(tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
    let node = tree.node(id);
    let _ = write!(out, "{}{} {}", "  ".repeat(depth), node.kind.as_str(), tree.qid(id));
    if node.access != Access::Public && node.access != Access::None {
        let _ = write!(out, " ({})", node.access.as_str());
    }
    if let Some(brief) = brief(tree, id) {
        let _ = write!(out, " - {}", brief);
    }
    out.push('\n');

    for child in tree.sorted_children(id) {
        write_node(tree, child, depth + 1, out);
    }
}

fn brief(tree: &Tree, id: NodeId) -> Option<String> {
    let comment = tree.comment(id)?;
    let field = if comment.brief.is_empty() {
        &comment.doc
    } else {
        &comment.brief
    };
    let text = render(tree, field);
    (!text.is_empty()).then_some(text)
}

/// Markdown rendering of a resolved field
fn render(tree: &Tree, doc: &DocString) -> String {
    let mut out = String::new();

    for component in &doc.components {
        match component {
            Component::Text(text) | Component::Example(text) | Component::MarkdownCode(text) => {
                out.push_str(text)
            }
            Component::Reference(reference) => {
                let label = reference.display.as_deref().unwrap_or(&reference.original);
                match reference.targets.first() {
                    Some(&target) => {
                        let _ = write!(out, "[{}](#{})", label, tree.refid(target));
                    }
                    None => out.push_str(label),
                }
            }
            Component::Unresolved(name) => out.push_str(&Component::escaped_unresolved(name)),
        }
    }

    out
}

#[derive(Serialize)]
struct StatsView {
    units: usize,
    files: usize,
    nodes: usize,
    documented: usize,
    categories: usize,
    classes: usize,
    functions: usize,
    unresolved_bases: usize,
}

impl From<&Tree> for StatsView {
    fn from(tree: &Tree) -> Self {
        let s = tree.stats();
        Self {
            units: s.units,
            files: s.files,
            nodes: s.nodes,
            documented: s.documented,
            categories: s.categories,
            classes: s.classes,
            functions: s.functions,
            unresolved_bases: s.unresolved_bases,
        }
    }
}
