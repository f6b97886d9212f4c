//! Nested Interval Index
//!
//! Intervals are opened on a stack and only become searchable once they
//! are closed. Lookups return the innermost closed interval containing an
//! offset, which for properly nested regions is the most recently opened
//! one that still covers it.
//!
//! @module comments/range_map

use super::sorted::Sorted;

/// Interval with an attached value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range<T> {
    pub value: T,
    pub start: u32,
    pub end: u32,
}

fn range_start<T>(range: &Range<T>) -> u32 {
    range.start
}

/// Stack-built interval map over byte offsets
#[derive(Debug)]
pub struct RangeMap<T> {
    stack: Vec<Range<T>>,
    ranges: Sorted<Range<T>, u32>,
}

impl<T> Default for RangeMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RangeMap<T> {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            ranges: Sorted::new(range_start::<T>),
        }
    }

    /// Open an interval at `start`
    pub fn push(&mut self, value: T, start: u32) {
        self.stack.push(Range {
            value,
            start,
            end: start,
        });
    }

    /// Close the innermost open interval at `end`; `None` when nothing is open
    pub fn pop(&mut self, end: u32) -> Option<&Range<T>> {
        let mut range = self.stack.pop()?;
        range.end = end;
        let idx = self.ranges.insert_right(range);
        self.ranges.get(idx)
    }

    /// Add an already closed interval
    pub fn insert(&mut self, value: T, start: u32, end: u32) {
        self.ranges.insert_right(Range { value, start, end });
    }

    /// Innermost open interval
    pub fn top(&self) -> Option<&T> {
        self.stack.last().map(|r| &r.value)
    }

    pub fn open_count(&self) -> usize {
        self.stack.len()
    }

    /// Value of the closed interval containing `offset`
    pub fn find(&self, offset: u32) -> Option<&T> {
        let mut idx = self.ranges.bisect_key_right(&offset);

        while idx > 0 {
            idx -= 1;
            let range = self.ranges.get(idx)?;
            if offset <= range.end {
                return Some(&range.value);
            }
        }

        None
    }

    /// Closed intervals ordered by start
    pub fn iter(&self) -> impl Iterator<Item = &Range<T>> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
