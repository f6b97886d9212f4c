//! Naming and Ordering Helpers
//!
//! Qualified-name arithmetic and the natural ("Item2 < Item10") order used
//! when sorting children for output.
//!
//! @module tree/naming

use std::cmp::Ordering;

/// Shortest suffix of `to` that is unambiguous when seen from `from`
pub fn relative_to(from: &str, to: &str) -> String {
    let last = |qid: &str| qid.rsplit("::").next().unwrap_or(qid).to_string();

    if from == to {
        return last(to);
    }

    let from_parts: Vec<&str> = from.split("::").collect();
    let to_parts: Vec<&str> = to.split("::").collect();

    let shared = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    if shared >= to_parts.len() {
        last(to)
    } else {
        to_parts[shared..].join("::")
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if digits {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    })
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Natural order: digit runs numerically, everything else case-insensitively
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);

    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => compare_digits(x, y),
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => compare_text(x, y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }
}
