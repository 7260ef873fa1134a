//! Edit Buffer: an overlay of insertions and removals on immutable text.
//!
//! Offsets always refer to the original text, so anchors computed once at
//! parse time stay valid no matter how many edits were recorded before.
//!
//! Insertions are attached to a side of an offset:
//!
//! - `Left` text belongs to the character before the offset and is emitted
//!   before any `Right` text at the same offset.
//! - `Right` text belongs to the character after the offset.
//!
//! `append_*` adds after earlier text on the same side, `prepend_*` before it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ir::TextRange;
use crate::source_map::{self, MappedSegment, SourceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Insertion {
    offset: u32,
    side: Side,
    prepend: bool,
    sequence: u64,
    text: String,
}

#[derive(Debug, Clone)]
pub struct EditBuffer<'s> {
    original: &'s str,
    insertions: Vec<Insertion>,
    removed: Vec<TextRange>,
    next_sequence: u64,
}

impl<'s> EditBuffer<'s> {
    pub fn new(original: &'s str) -> Self {
        EditBuffer {
            original,
            insertions: Vec::new(),
            removed: Vec::new(),
            next_sequence: 0,
        }
    }

    pub fn original(&self) -> &'s str {
        self.original
    }

    pub fn has_changed(&self) -> bool {
        !self.insertions.is_empty() || !self.removed.is_empty()
    }

    pub fn append_left(&mut self, offset: u32, text: impl Into<String>) -> &mut Self {
        self.insert(offset, Side::Left, false, text.into())
    }

    pub fn prepend_left(&mut self, offset: u32, text: impl Into<String>) -> &mut Self {
        self.insert(offset, Side::Left, true, text.into())
    }

    pub fn append_right(&mut self, offset: u32, text: impl Into<String>) -> &mut Self {
        self.insert(offset, Side::Right, false, text.into())
    }

    pub fn prepend_right(&mut self, offset: u32, text: impl Into<String>) -> &mut Self {
        self.insert(offset, Side::Right, true, text.into())
    }

    fn insert(&mut self, offset: u32, side: Side, prepend: bool, text: String) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        let offset = self.clamp(offset);
        self.insertions.push(Insertion {
            offset,
            side,
            prepend,
            sequence: self.next_sequence,
            text,
        });
        self.next_sequence += 1;
        self
    }

    /// Marks `range` of the original text as removed.
    ///
    /// Text inserted strictly inside the range before this call goes with it.
    /// Inserts on either edge stay, whatever their side. Removing text that
    /// is already gone is a no-op.
    pub fn remove(&mut self, range: TextRange) -> &mut Self {
        let range = TextRange::new(self.clamp(range.start), self.clamp(range.end));
        if range.is_empty() {
            return self;
        }
        self.insertions.retain(|ins| !swallows(range, ins));
        if !self.is_removed(range) {
            self.removed.push(range);
        }
        self
    }

    /// True when every character of `range` has been removed.
    pub fn is_removed(&self, range: TextRange) -> bool {
        if range.is_empty() {
            return false;
        }
        let merged = merge_ranges(&self.removed);
        merged.iter().any(|r| r.contains(range))
    }

    pub fn slice(&self, range: TextRange) -> &'s str {
        range.slice(self.original)
    }

    fn clamp(&self, offset: u32) -> u32 {
        offset.min(self.original.len() as u32)
    }

    /// Resolves the overlay and records which output spans came from the
    /// original text.
    pub(crate) fn render(&self) -> (String, Vec<MappedSegment>) {
        let len = self.original.len() as u32;
        let removed = merge_ranges(&self.removed);

        let mut at_offset: BTreeMap<u32, Vec<&Insertion>> = BTreeMap::new();
        for ins in &self.insertions {
            at_offset.entry(ins.offset).or_default().push(ins);
        }

        let mut points: BTreeSet<u32> = BTreeSet::new();
        points.insert(0);
        points.insert(len);
        points.extend(at_offset.keys().copied());
        for r in &removed {
            points.insert(r.start);
            points.insert(r.end);
        }

        let mut output = String::with_capacity(self.original.len());
        let mut segments = Vec::new();
        let points: Vec<u32> = points.into_iter().collect();

        for (i, &point) in points.iter().enumerate() {
            if let Some(insertions) = at_offset.get(&point) {
                for ins in ordered(insertions) {
                    output.push_str(&ins.text);
                }
            }
            let Some(&next) = points.get(i + 1) else {
                continue;
            };
            let chunk = TextRange::new(point, next);
            if removed.iter().any(|r| r.contains(chunk)) {
                continue;
            }
            segments.push(MappedSegment {
                generated: output.len() as u32,
                original: chunk.start,
                len: chunk.len(),
            });
            output.push_str(chunk.slice(self.original));
        }

        (output, segments)
    }

    pub fn generate_map(&self, source_name: &str, file_name: &str) -> SourceMap {
        let (output, segments) = self.render();
        source_map::build(self.original, &output, &segments, source_name, file_name)
    }
}

impl fmt::Display for EditBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render().0)
    }
}

fn swallows(range: TextRange, ins: &Insertion) -> bool {
    ins.offset > range.start && ins.offset < range.end
}

/// Left prepends (newest first), left appends, right prepends (newest
/// first), right appends.
fn ordered<'i>(insertions: &[&'i Insertion]) -> Vec<&'i Insertion> {
    let mut sorted: Vec<&Insertion> = insertions.to_vec();
    sorted.sort_by_key(|ins| {
        let side = match ins.side {
            Side::Left => 0u8,
            Side::Right => 1,
        };
        let group = if ins.prepend { 0u8 } else { 1 };
        let order = if ins.prepend {
            u64::MAX - ins.sequence
        } else {
            ins.sequence
        };
        (side, group, order)
    });
    sorted
}

fn merge_ranges(ranges: &[TextRange]) -> Vec<TextRange> {
    let mut sorted: Vec<TextRange> = ranges.iter().copied().filter(|r| !r.is_empty()).collect();
    sorted.sort();
    let mut merged: Vec<TextRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn untouched_buffer_renders_the_original() {
        let buffer = EditBuffer::new("var a = 1;");
        assert_eq!(buffer.to_string(), "var a = 1;");
        assert!(!buffer.has_changed());
    }

    #[test]
    fn left_inserts_precede_right_inserts_at_one_offset() {
        let mut buffer = EditBuffer::new("ab");
        buffer.append_right(1, "R1");
        buffer.append_left(1, "L1");
        buffer.append_right(1, "R2");
        buffer.append_left(1, "L2");
        buffer.prepend_left(1, "PL");
        buffer.prepend_right(1, "PR");
        assert_eq!(buffer.to_string(), "aPLL1L2PRR1R2b");
    }

    #[test]
    fn prepends_stack_newest_first() {
        let mut buffer = EditBuffer::new("x");
        buffer.prepend_right(0, "1");
        buffer.prepend_right(0, "2");
        assert_eq!(buffer.to_string(), "21x");
    }

    #[test]
    fn remove_drops_inner_inserts_made_earlier() {
        let mut buffer = EditBuffer::new("0123456789");
        buffer.append_left(5, "inner");
        buffer.append_right(4, "inner-right");
        buffer.append_left(3, "start-left");
        buffer.append_right(7, "end-right");
        buffer.remove(TextRange::new(3, 7));
        assert_eq!(buffer.to_string(), "012start-leftend-right789");
    }

    #[test]
    fn inserts_on_the_edges_of_a_removal_survive() {
        let mut buffer = EditBuffer::new("0123456789");
        buffer.append_right(3, "start-right");
        buffer.append_left(7, "end-left");
        buffer.append_right(7, "end-right");
        buffer.remove(TextRange::new(3, 7));
        assert_eq!(buffer.to_string(), "012start-rightend-leftend-right789");
    }

    #[test]
    fn inserts_after_a_removal_survive() {
        let mut buffer = EditBuffer::new("0123456789");
        buffer.remove(TextRange::new(3, 7));
        buffer.append_left(7, "after");
        assert_eq!(buffer.to_string(), "012after789");
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let mut once = EditBuffer::new("0123456789");
        once.remove(TextRange::new(2, 6));
        let mut twice = EditBuffer::new("0123456789");
        twice.remove(TextRange::new(2, 6));
        twice.remove(TextRange::new(2, 6));
        twice.remove(TextRange::new(3, 5));
        assert_eq!(once.to_string(), twice.to_string());
        assert_eq!(twice.to_string(), "016789");
    }

    #[test]
    fn overlapping_removals_merge() {
        let mut buffer = EditBuffer::new("0123456789");
        buffer.remove(TextRange::new(2, 5));
        buffer.remove(TextRange::new(4, 8));
        assert!(buffer.is_removed(TextRange::new(2, 8)));
        assert!(!buffer.is_removed(TextRange::new(1, 3)));
        assert_eq!(buffer.to_string(), "0189");
    }

    #[test]
    fn offsets_past_the_end_are_clamped() {
        let mut buffer = EditBuffer::new("ab");
        buffer.append_left(10, "!");
        assert_eq!(buffer.to_string(), "ab!");
    }
}
