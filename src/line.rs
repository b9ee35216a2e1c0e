//! Line locator - structural line boundaries over a rope
//!
//! Everything here works on true line starts: the offset right after the
//! previous line break, regardless of prompts or other display offsets.

use ropey::Rope;
use std::ops::{Range, RangeInclusive};

/// Start offset of the line containing `position`.
///
/// Positions past the end are clamped to the end of the buffer.
pub fn true_line_start(rope: &Rope, position: usize) -> usize {
    let pos = position.min(rope.len_chars());
    rope.line_to_char(rope.char_to_line(pos))
}

/// Index of the line containing `position` (clamped)
pub fn line_of(rope: &Rope, position: usize) -> usize {
    rope.char_to_line(position.min(rope.len_chars()))
}

/// Offsets belonging to a line: its start through its line break, or
/// through the end of the buffer for the last line.
pub fn line_span(rope: &Rope, line_idx: usize) -> RangeInclusive<usize> {
    let start = rope.line_to_char(line_idx);
    let end = if line_idx + 1 < rope.len_lines() {
        rope.line_to_char(line_idx + 1) - 1
    } else {
        rope.len_chars()
    };
    start..=end
}

/// Span of the line containing `position`
pub fn line_span_at(rope: &Rope, position: usize) -> RangeInclusive<usize> {
    line_span(rope, line_of(rope, position))
}

/// Indices of every line touched by `[begin, end]`.
///
/// Always contains at least the line holding `begin`; a line starting
/// exactly at `end` is included.
pub fn lines_touched(rope: &Rope, begin: usize, end: usize) -> Range<usize> {
    let first = line_of(rope, begin);
    let last = line_of(rope, end.max(begin));
    first..last + 1
}
