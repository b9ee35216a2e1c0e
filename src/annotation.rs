//! Annotation store - at most one annotation per line
//!
//! Annotations are anchored by buffer markers, so the buffer keeps their
//! positions current across edits. The store only remembers which markers
//! are its own and what was rendered for them.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::buffer::Buffer;
use crate::error::RenderError;
use crate::line;
use crate::marker::MarkerId;
use crate::render::Renderer;

/// Whether an annotation carries an observed timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    /// Rendered when the line was seen to change
    Real,
    /// Stand-in for lines whose change time was never observed
    Placeholder,
}

/// A per-line marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub marker: MarkerId,
    pub kind: AnnotationKind,
    pub text: String,
}

/// An annotation together with its current anchor offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedAnnotation {
    pub anchor: usize,
    pub kind: AnnotationKind,
    pub text: String,
}

/// Render the text for an annotation of `kind`
pub fn render(
    renderer: &dyn Renderer,
    buffer: &Buffer,
    kind: AnnotationKind,
) -> Result<String, RenderError> {
    match kind {
        AnnotationKind::Real => renderer.render_real(buffer),
        AnnotationKind::Placeholder => renderer.render_placeholder(buffer),
    }
}

/// Annotations owned by one buffer
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: HashMap<MarkerId, Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Annotations anchored within `range`, in anchor order
    pub fn overlapping(
        &self,
        buffer: &Buffer,
        range: RangeInclusive<usize>,
    ) -> Vec<PlacedAnnotation> {
        buffer
            .markers_in(range)
            .filter_map(|(offset, id)| {
                self.annotations.get(&id).map(|a| PlacedAnnotation {
                    anchor: offset,
                    kind: a.kind,
                    text: a.text.clone(),
                })
            })
            .collect()
    }

    /// Annotations on the line containing `position`
    pub fn on_line(&self, buffer: &Buffer, position: usize) -> Vec<PlacedAnnotation> {
        self.overlapping(buffer, line::line_span_at(buffer.rope(), position))
    }

    /// Whether any annotation is anchored within `range`.
    ///
    /// Same as `!overlapping(..).is_empty()` without cloning text.
    pub fn any_in(&self, buffer: &Buffer, range: RangeInclusive<usize>) -> bool {
        buffer
            .markers_in(range)
            .any(|(_, id)| self.annotations.contains_key(&id))
    }

    /// Remove every annotation anchored within `range`. Returns the count.
    pub fn remove_overlapping(
        &mut self,
        buffer: &mut Buffer,
        range: RangeInclusive<usize>,
    ) -> usize {
        let doomed: Vec<(usize, MarkerId)> = buffer
            .markers_in(range)
            .filter(|(_, id)| self.annotations.contains_key(id))
            .collect();

        for (offset, id) in &doomed {
            self.annotations.remove(id);
            buffer.delete_marker(*offset, *id);
        }
        doomed.len()
    }

    /// Add an annotation at the true start of the line holding `position`.
    ///
    /// The caller must have cleared the line first; this does not check.
    pub fn add(
        &mut self,
        buffer: &mut Buffer,
        position: usize,
        kind: AnnotationKind,
        renderer: &dyn Renderer,
    ) -> Result<MarkerId, RenderError> {
        let text = render(renderer, buffer, kind)?;
        Ok(self.insert(buffer, position, kind, text))
    }

    /// Add an annotation whose text was already rendered
    pub fn insert(
        &mut self,
        buffer: &mut Buffer,
        position: usize,
        kind: AnnotationKind,
        text: String,
    ) -> MarkerId {
        let anchor = line::true_line_start(buffer.rope(), position);
        let marker = buffer.create_marker(anchor);
        self.annotations
            .insert(marker, Annotation { marker, kind, text });
        marker
    }

    /// Remove every annotation and release its marker
    pub fn remove_all(&mut self, buffer: &mut Buffer) {
        for id in self.annotations.keys() {
            if let Some(offset) = buffer.marker_offset(*id) {
                buffer.delete_marker(offset, *id);
            }
        }
        self.annotations.clear();
    }

    /// All annotations in anchor order
    pub fn iter_placed(&self, buffer: &Buffer) -> Vec<PlacedAnnotation> {
        self.overlapping(buffer, 0..=buffer.len_chars())
    }
}
