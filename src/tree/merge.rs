//! Description Merging
//!
//! Markdown files that document symbols outside the sources. A line
//! `#<cldoc:qid>` opens a section whose text replaces the comment of the
//! node with that qualified id. `#<cldoc:index>` targets the root, and ids
//! matching no symbol become categories. `#<cldoc:include>(path)` splices
//! in another file, resolved against the including file's directory.
//!
//! Runs after the tree is built and before references are resolved, so
//! merged text takes part in cross-referencing like any source comment.
//!
//! @module tree/merge

use std::path::{Path, PathBuf};
use std::process::Command;

use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::node::NodeId;
use super::symbols::Tree;
use crate::ast::SourceLocation;
use crate::comments::Comment;
use crate::core::error::{Error, Result};

static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#<cldoc:include>\(([^)]*)\)").unwrap());

const SECTION_PREFIX: &str = "#<cldoc:";

/// Section title addressing the root node
const INDEX_ID: &str = "index";

/// Counts reported after merging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub files: usize,
    pub sections: usize,
    /// Categories created for ids matching no symbol
    pub categories: usize,
}

/// One `#<cldoc:...>` section
#[derive(Debug, PartialEq, Eq)]
struct Section {
    title: String,
    /// 1-based line of the header
    line: u32,
    text: String,
}

// =============================================================================
// MERGER
// =============================================================================

/// Merges description files into a built tree
pub struct DocumentMerger<'t> {
    tree: &'t mut Tree,
    /// Program each file is piped through; it receives the path as its argument
    filter: Option<PathBuf>,
    stats: MergeStats,
}

impl<'t> DocumentMerger<'t> {
    pub fn new(tree: &'t mut Tree) -> Self {
        Self {
            tree,
            filter: None,
            stats: MergeStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: Option<PathBuf>) -> Self {
        self.filter = filter;
        self
    }

    /// Merge every `.md` file found in `paths`; directories are searched recursively
    pub fn merge<P: AsRef<Path>>(mut self, paths: &[P]) -> Result<MergeStats> {
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                return Err(Error::Merge {
                    path: path.to_path_buf(),
                    message: "no such file or directory".to_string(),
                });
            }
            for file in collect(path) {
                self.merge_file(&file)?;
            }
        }

        if self.stats.categories > 0 {
            self.tree.freeze();
        }

        info!(
            files = self.stats.files,
            sections = self.stats.sections,
            categories = self.stats.categories,
            "Merged descriptions"
        );
        Ok(self.stats)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let contents = self.read(path, &mut Vec::new())?;
        let sections = split_sections(path, &contents);
        debug!(file = %path.display(), sections = sections.len(), "Merging");

        for section in sections {
            let (id, key) = match section.title.split_once('/') {
                Some((id, key)) => (id, key),
                None => (section.title.as_str(), "doc"),
            };

            if key != "doc" {
                warn!(file = %path.display(), id, key, "Unknown section type");
                continue;
            }

            let node = self.target(id);
            let location = SourceLocation::new(path, section.line, 1, 0);
            self.tree
                .node_mut(node)
                .merge_comment(Comment::new(section.text, location), true);
            self.stats.sections += 1;
        }

        self.stats.files += 1;
        Ok(())
    }

    /// Node a section title addresses, creating a category when nothing matches
    fn target(&mut self, id: &str) -> NodeId {
        let id = id.strip_prefix("::").unwrap_or(id);
        if id == INDEX_ID || id.is_empty() {
            return self.tree.root();
        }

        if let Some(&found) = self.tree.lookup_qid(id).first() {
            return found;
        }
        if let Some(found) = self.tree.lookup_category(id) {
            return found;
        }

        debug!(id, "Creating category for merged section");
        self.stats.categories += 1;
        self.tree.add_category(id)
    }

    /// File contents, passed through the filter, with includes expanded
    fn read(&self, path: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
        if stack.iter().any(|p| p == path) {
            return Err(Error::Merge {
                path: path.to_path_buf(),
                message: "file includes itself".to_string(),
            });
        }

        let contents = match &self.filter {
            Some(filter) => run_filter(filter, path)?,
            None => std::fs::read_to_string(path)?,
        };

        stack.push(path.to_path_buf());
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut out = String::with_capacity(contents.len());
        let mut last = 0;
        for caps in INCLUDE_RE.captures_iter(&contents) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&contents[last..whole.start()]);
            out.push_str(&self.read(&dir.join(caps[1].trim()), stack)?);
            last = whole.end();
        }
        out.push_str(&contents[last..]);

        stack.pop();
        Ok(out)
    }
}

fn run_filter(filter: &Path, path: &Path) -> Result<String> {
    let output = Command::new(filter).arg(path).output()?;
    if !output.status.success() {
        return Err(Error::Merge {
            path: path.to_path_buf(),
            message: format!("filter {} exited with {}", filter.display(), output.status),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Visible `.md` files under `path`, in name order
fn collect(path: &Path) -> Vec<PathBuf> {
    let walker = WalkBuilder::new(path)
        .hidden(true)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    walker
        .flatten()
        .map(|entry| entry.into_path())
        .filter(|p| p.is_file() && !is_hidden(p))
        .filter(|p| p.extension().map(|e| e == "md").unwrap_or(false))
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

// =============================================================================
// SECTIONS
// =============================================================================

/// Split on `#<cldoc:title>` header lines; a blank line right after a header is dropped
fn split_sections(path: &Path, contents: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut untitled = false;
    let mut after_header = false;

    for (n, line) in contents.lines().enumerate() {
        let title = line
            .strip_prefix(SECTION_PREFIX)
            .and_then(|rest| rest.strip_suffix('>'));

        if let Some(title) = title {
            if let Some(mut done) = current.take() {
                done.text = body.join("\n").trim_end().to_string();
                sections.push(done);
            }
            body.clear();
            current = Some(Section {
                title: title.to_string(),
                line: n as u32 + 1,
                text: String::new(),
            });
            after_header = true;
            continue;
        }

        if std::mem::take(&mut after_header) && line.is_empty() {
            continue;
        }
        if current.is_none() {
            untitled |= !line.trim().is_empty();
            continue;
        }
        body.push(line);
    }

    if let Some(mut done) = current {
        done.text = body.join("\n").trim_end().to_string();
        sections.push(done);
    }

    if untitled {
        warn!(file = %path.display(), "Text before the first section header is ignored");
    }
    sections
}
