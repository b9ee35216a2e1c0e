//! Reconciler and gap filler
//!
//! These are the only operations that mutate an [`AnnotationStore`]. Both
//! walk whole lines of the full buffer; narrowing never limits them, since
//! an edit can leave lines outside the accessible region unannotated.
//!
//! Both are idempotent: running them again over the same range with no
//! edits in between leaves the same set of annotated lines.

use crate::annotation::{self, AnnotationKind, AnnotationStore};
use crate::buffer::{Buffer, EditEvent};
use crate::error::RenderError;
use crate::line;
use crate::render::Renderer;
use std::ops::RangeInclusive;

/// Counts reported by a reconcile or gap-fill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Lines visited
    pub lines: usize,
    /// Annotations created
    pub added: usize,
    /// Annotations removed
    pub removed: usize,
}

impl std::ops::AddAssign for UpdateStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.added += other.added;
        self.removed += other.removed;
    }
}

/// Replace the annotation on every line touched by `[begin, end]` with a
/// fresh Real one.
///
/// Each line's text is rendered before its old annotation is removed, so a
/// renderer failure leaves that line as it was.
pub fn reconcile(
    store: &mut AnnotationStore,
    buffer: &mut Buffer,
    begin: usize,
    end: usize,
    renderer: &dyn Renderer,
) -> Result<UpdateStats, RenderError> {
    let lines = line::lines_touched(buffer.rope(), begin, end);
    tracing::trace!(
        buffer = buffer.id().0,
        begin,
        end,
        first_line = lines.start,
        last_line = lines.end - 1,
        "reconcile"
    );

    let mut stats = UpdateStats::default();
    for line_idx in lines {
        let span = line::line_span(buffer.rope(), line_idx);
        let start = *span.start();

        let text = annotation::render(renderer, buffer, AnnotationKind::Real)?;
        stats.removed += store.remove_overlapping(buffer, span);
        store.insert(buffer, start, AnnotationKind::Real, text);

        stats.lines += 1;
        stats.added += 1;
    }
    Ok(stats)
}

/// Line breaks as ropey counts them
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// Range to reconcile for an edit event, in current buffer coordinates.
///
/// A pure insertion that starts with a line break and ends at a line end
/// did not change the line it was inserted into, so that line is left out.
/// The exception is a `\n` landing right after a `\r`: the two join into one
/// break, which swallows the empty line that followed the `\r`.
pub fn edit_range(buffer: &Buffer, event: &EditEvent) -> (usize, usize) {
    let rope = buffer.rope();
    let len = rope.len_chars();
    let (begin, end) = (event.begin.min(len), event.end.min(len));

    let pure_insert = event.pre_edit_len == 0 && end > begin;
    let joins_cr =
        pure_insert && begin > 0 && rope.char(begin - 1) == '\r' && rope.char(begin) == '\n';
    if pure_insert
        && !joins_cr
        && is_line_break(rope.char(begin))
        && (end == len || is_line_break(rope.char(end)))
    {
        // Step over a "\r\n" pair as one break
        let skip = if rope.char(begin) == '\r' && begin + 1 < end && rope.char(begin + 1) == '\n' {
            2
        } else {
            1
        };
        return (begin + skip, end);
    }
    (begin, end)
}

fn gap_kind(use_placeholder: bool) -> AnnotationKind {
    if use_placeholder {
        AnnotationKind::Placeholder
    } else {
        AnnotationKind::Real
    }
}

/// Annotate every line in `[begin, end]` that has no annotation yet
pub fn fill_gaps(
    store: &mut AnnotationStore,
    buffer: &mut Buffer,
    begin: usize,
    end: usize,
    use_placeholder: bool,
    renderer: &dyn Renderer,
) -> Result<UpdateStats, RenderError> {
    let kind = gap_kind(use_placeholder);
    let lines = line::lines_touched(buffer.rope(), begin, end);

    let mut stats = UpdateStats::default();
    for line_idx in lines {
        let span = line::line_span(buffer.rope(), line_idx);
        stats.lines += 1;
        if store.any_in(buffer, span.clone()) {
            continue;
        }
        store.add(buffer, *span.start(), kind, renderer)?;
        stats.added += 1;
    }

    if stats.added > 0 {
        tracing::trace!(buffer = buffer.id().0, begin, end, added = stats.added, "filled gaps");
    }
    Ok(stats)
}

/// Annotate unannotated lines at the end of the buffer, walking backward
/// and stopping at the first line that already has an annotation.
///
/// Only sufficient for append-only buffers, where the unannotated region is
/// always a suffix. The annotated line the walk stops at is collapsed back to
/// a single annotation at its start, since an appended `\n` can join a
/// trailing `\r` and pull the next line's anchor into it.
pub fn fill_tail_gaps(
    store: &mut AnnotationStore,
    buffer: &mut Buffer,
    use_placeholder: bool,
    renderer: &dyn Renderer,
) -> Result<UpdateStats, RenderError> {
    let kind = gap_kind(use_placeholder);

    let mut stats = UpdateStats::default();
    for line_idx in (0..buffer.line_count()).rev() {
        let span = line::line_span(buffer.rope(), line_idx);
        stats.lines += 1;
        if store.any_in(buffer, span.clone()) {
            stats += settle_line(store, buffer, span, kind, renderer)?;
            break;
        }
        store.add(buffer, *span.start(), kind, renderer)?;
        stats.added += 1;
    }

    if stats.added > 0 {
        tracing::trace!(buffer = buffer.id().0, added = stats.added, "filled tail gaps");
    }
    Ok(stats)
}

/// Leave exactly one annotation on the line, anchored at its start.
///
/// An annotation already at the start is kept as it is; otherwise a fresh
/// one of `kind` is rendered.
fn settle_line(
    store: &mut AnnotationStore,
    buffer: &mut Buffer,
    span: RangeInclusive<usize>,
    kind: AnnotationKind,
    renderer: &dyn Renderer,
) -> Result<UpdateStats, RenderError> {
    let start = *span.start();
    let placed = store.overlapping(buffer, span.clone());
    if placed.len() == 1 && placed[0].anchor == start {
        return Ok(UpdateStats::default());
    }

    let (kind, text) = match placed.into_iter().find(|a| a.anchor == start) {
        Some(kept) => (kept.kind, kept.text),
        None => (kind, annotation::render(renderer, buffer, kind)?),
    };
    let removed = store.remove_overlapping(buffer, span);
    store.insert(buffer, start, kind, text);
    tracing::debug!(buffer = buffer.id().0, start, removed, "collapsed stray anchors");
    Ok(UpdateStats {
        lines: 0,
        added: 1,
        removed,
    })
}
