//! Comment Segmentation
//!
//! Splits cleaned comment text into a brief line, a body and the
//! `@param` / `@return` sections. Lines inside fenced code are never
//! treated as tags.
//!
//! @module comments/parser

use once_cell::sync::Lazy;
use regex::Regex;

static PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[@\\]param(?:\[[a-z,]*\])?\s+(\S+)\s*(.*)$").unwrap());
static RETURN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[@\\]returns?\b\s*(.*)$").unwrap());
static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ *(```|~~~)").unwrap());

/// Fields of a segmented comment
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Segments {
    pub brief: String,
    pub body: String,
    pub params: Vec<(String, String)>,
    pub returns: String,
}

#[derive(Clone, Copy)]
enum Section {
    Body,
    Param(usize),
    Returns,
}

/// Segment comment text
pub fn segment(text: &str) -> Segments {
    let mut segments = Segments::default();
    let mut lines = text.lines().skip_while(|l| l.trim().is_empty());

    let Some(brief) = lines.next() else {
        return segments;
    };
    segments.brief = brief.trim().to_string();

    let mut body: Vec<&str> = Vec::new();
    let mut section = Section::Body;
    let mut in_fence = false;

    for line in lines {
        if FENCE_RE.is_match(line) {
            in_fence = !in_fence;
        }

        if !in_fence {
            if let Some(caps) = PARAM_RE.captures(line) {
                segments
                    .params
                    .push((caps[1].to_string(), caps[2].trim().to_string()));
                section = Section::Param(segments.params.len() - 1);
                continue;
            }
            if let Some(caps) = RETURN_RE.captures(line) {
                segments.returns = caps[1].trim().to_string();
                section = Section::Returns;
                continue;
            }
            if line.trim().is_empty() {
                section = Section::Body;
            }
        }

        match section {
            Section::Body => body.push(line),
            Section::Param(idx) => append_line(&mut segments.params[idx].1, line),
            Section::Returns => append_line(&mut segments.returns, line),
        }
    }

    let start = body.iter().position(|l| !l.trim().is_empty());
    let end = body.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(start), Some(end)) = (start, end) {
        segments.body = body[start..=end].join("\n");
    }

    segments
}

fn append_line(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(line.trim());
}
