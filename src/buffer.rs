//! Host text buffer
//!
//! A rope-backed buffer playing the part of the host editor: it applies
//! edits, keeps markers rebased, tracks narrowing and a display prompt, and
//! broadcasts an [`EditEvent`] to every subscriber after each edit.

use ropey::Rope;
use std::ops::{Range, RangeInclusive};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use crate::line;
use crate::marker::{MarkerId, MarkerSet};

/// Unique identifier for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Identifies a party subscribed to a buffer's edit notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a process-unique subscriber id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An edit notification, in post-edit char coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditEvent {
    /// Start of the changed region
    pub begin: usize,
    /// End of the changed region (exclusive)
    pub end: usize,
    /// Length of the replaced text before the edit
    pub pre_edit_len: usize,
}

/// Text buffer with markers and edit notifications
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    text: Rope,
    markers: MarkerSet,
    /// Accessible region when narrowed
    narrowing: Option<Range<usize>>,
    /// Marker at the end of the display prompt, if any
    prompt_end: Option<MarkerId>,
    /// Incremented on each edit
    revision: u64,
    /// When false, edits are applied silently (no notifications are sent)
    notifications: bool,
    subscribers: Vec<(SubscriberId, Sender<EditEvent>)>,
}

impl Buffer {
    /// Create an empty buffer
    pub fn new(id: BufferId) -> Self {
        Self::with_text(id, "")
    }

    /// Create a buffer with initial text
    pub fn with_text(id: BufferId, text: &str) -> Self {
        Self {
            id,
            text: Rope::from_str(text),
            markers: MarkerSet::new(),
            narrowing: None,
            prompt_end: None,
            revision: 0,
            notifications: true,
            subscribers: Vec::new(),
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn rope(&self) -> &Rope {
        &self.text
    }

    /// Full content as a String (allocates)
    pub fn content(&self) -> String {
        self.text.to_string()
    }

    /// Total length in chars, ignoring narrowing
    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Number of lines (always >= 1)
    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    /// Line content without its trailing line break
    pub fn line_text(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.text.len_lines() {
            return None;
        }
        let line = self.text.line(line_idx);
        let s = line.to_string();
        Some(s.trim_end_matches(&['\n', '\r'][..]).to_string())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Edits ===

    /// Insert text at a char offset (clamped to the accessible region)
    pub fn insert(&mut self, offset: usize, text: &str) {
        let at = self.clamp_to_accessible(offset);
        let len = text.chars().count();
        if len == 0 {
            return;
        }

        self.text.insert(at, text);
        self.markers.apply_insert(at, len);
        if let Some(narrowing) = &mut self.narrowing {
            narrowing.end += len;
        }

        self.finish_edit(EditEvent {
            begin: at,
            end: at + len,
            pre_edit_len: 0,
        });
    }

    /// Append text at the end of the accessible region
    pub fn append(&mut self, text: &str) {
        let end = self.accessible_range().end;
        self.insert(end, text);
    }

    /// Remove the chars in `range` (clamped to the accessible region)
    pub fn remove(&mut self, range: Range<usize>) {
        let start = self.clamp_to_accessible(range.start);
        let end = self.clamp_to_accessible(range.end).max(start);
        if start == end {
            return;
        }

        self.text.remove(start..end);
        self.markers.apply_remove(start..end);
        if let Some(narrowing) = &mut self.narrowing {
            narrowing.end -= end - start;
        }

        self.finish_edit(EditEvent {
            begin: start,
            end: start,
            pre_edit_len: end - start,
        });
    }

    /// Replace the chars in `range` with `text` as a single edit
    pub fn replace(&mut self, range: Range<usize>, text: &str) {
        let start = self.clamp_to_accessible(range.start);
        let end = self.clamp_to_accessible(range.end).max(start);
        let len = text.chars().count();
        if start == end && len == 0 {
            return;
        }

        self.text.remove(start..end);
        self.markers.apply_remove(start..end);
        self.text.insert(start, text);
        self.markers.apply_insert(start, len);
        if let Some(narrowing) = &mut self.narrowing {
            narrowing.end = narrowing.end - (end - start) + len;
        }

        self.finish_edit(EditEvent {
            begin: start,
            end: start + len,
            pre_edit_len: end - start,
        });
    }

    fn finish_edit(&mut self, event: EditEvent) {
        self.revision = self.revision.wrapping_add(1);
        if !self.notifications {
            tracing::trace!(buffer = self.id.0, ?event, "edit applied silently");
            return;
        }
        // Drop subscribers whose receiving side is gone
        self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
    }

    // === Notifications ===

    /// Enable or suppress edit notifications for this buffer
    pub fn set_notifications(&mut self, enabled: bool) {
        self.notifications = enabled;
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    /// Subscribe to edit notifications.
    ///
    /// Returns `None` if `subscriber` is already subscribed, so subscribing
    /// twice never duplicates deliveries.
    pub fn subscribe(&mut self, subscriber: SubscriberId) -> Option<Receiver<EditEvent>> {
        if self.is_subscribed(subscriber) {
            return None;
        }
        let (tx, rx) = mpsc::channel();
        self.subscribers.push((subscriber, tx));
        Some(rx)
    }

    /// Remove a subscription. Returns true if one existed.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != subscriber);
        self.subscribers.len() != before
    }

    pub fn is_subscribed(&self, subscriber: SubscriberId) -> bool {
        self.subscribers.iter().any(|(id, _)| *id == subscriber)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // === Narrowing ===

    /// Restrict edits and the visible region to `range`
    pub fn narrow(&mut self, range: Range<usize>) {
        let len = self.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.narrowing = Some(start..end);
    }

    /// Remove any narrowing
    pub fn widen(&mut self) {
        self.narrowing = None;
    }

    pub fn is_narrowed(&self) -> bool {
        self.narrowing.is_some()
    }

    /// The accessible region (whole buffer unless narrowed)
    pub fn accessible_range(&self) -> Range<usize> {
        self.narrowing.clone().unwrap_or(0..self.len_chars())
    }

    fn clamp_to_accessible(&self, offset: usize) -> usize {
        let range = self.accessible_range();
        offset.clamp(range.start, range.end)
    }

    // === Prompt ===

    /// Mark `offset` as the end of a display prompt on its line
    pub fn set_prompt_end(&mut self, offset: usize) {
        if let Some(old) = self.prompt_end.take() {
            self.markers.remove(old);
        }
        let offset = offset.min(self.len_chars());
        self.prompt_end = Some(self.markers.create(offset));
    }

    pub fn clear_prompt(&mut self) {
        if let Some(old) = self.prompt_end.take() {
            self.markers.remove(old);
        }
    }

    pub fn prompt_end(&self) -> Option<usize> {
        self.prompt_end.and_then(|id| self.markers.offset(id))
    }

    /// Line start as a display would show it: after the prompt when the
    /// prompt sits on the same line before `position`
    pub fn visual_line_start(&self, position: usize) -> usize {
        let start = line::true_line_start(&self.text, position);
        match self.prompt_end() {
            Some(prompt) if prompt > start && prompt <= position.min(self.len_chars()) => prompt,
            _ => start,
        }
    }

    // === Markers ===

    pub fn create_marker(&mut self, offset: usize) -> MarkerId {
        self.markers.create(offset.min(self.len_chars()))
    }

    pub fn marker_offset(&self, id: MarkerId) -> Option<usize> {
        self.markers.offset(id)
    }

    /// Delete a marker, using `offset_hint` to find it quickly
    pub fn delete_marker(&mut self, offset_hint: usize, id: MarkerId) -> bool {
        self.markers.remove_at(offset_hint, id)
    }

    /// Markers within `range`, in offset order
    pub fn markers_in(
        &self,
        range: RangeInclusive<usize>,
    ) -> impl Iterator<Item = (usize, MarkerId)> + '_ {
        self.markers.in_range(range)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(text: &str) -> Buffer {
        Buffer::with_text(BufferId(1), text)
    }

    #[test]
    fn test_insert_emits_event() {
        let mut b = buf("abc");
        let rx = b.subscribe(SubscriberId::next()).unwrap();
        b.insert(1, "XY");

        assert_eq!(b.content(), "aXYbc");
        assert_eq!(
            rx.try_recv().unwrap(),
            EditEvent {
                begin: 1,
                end: 3,
                pre_edit_len: 0
            }
        );
    }

    #[test]
    fn test_remove_emits_collapsed_event() {
        let mut b = buf("hello\nworld");
        let rx = b.subscribe(SubscriberId::next()).unwrap();
        b.remove(2..7);

        assert_eq!(b.content(), "heorld");
        assert_eq!(
            rx.try_recv().unwrap(),
            EditEvent {
                begin: 2,
                end: 2,
                pre_edit_len: 5
            }
        );
    }

    #[test]
    fn test_replace_is_one_event() {
        let mut b = buf("a\nb\nc");
        let rx = b.subscribe(SubscriberId::next()).unwrap();
        b.replace(2..3, "xyz");

        assert_eq!(b.content(), "a\nxyz\nc");
        assert_eq!(
            rx.try_recv().unwrap(),
            EditEvent {
                begin: 2,
                end: 5,
                pre_edit_len: 1
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_subscribe_twice_is_noop() {
        let mut b = buf("");
        let id = SubscriberId::next();
        assert!(b.subscribe(id).is_some());
        assert!(b.subscribe(id).is_none());
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut b = buf("");
        let id = SubscriberId::next();
        let _rx = b.subscribe(id);
        assert!(b.unsubscribe(id));
        assert!(!b.unsubscribe(id));
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let mut b = buf("");
        let rx = b.subscribe(SubscriberId::next());
        drop(rx);
        b.insert(0, "x");
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn test_silent_edits_bump_revision_only() {
        let mut b = buf("abc");
        let rx = b.subscribe(SubscriberId::next()).unwrap();
        b.set_notifications(false);
        b.append("d");

        assert_eq!(b.content(), "abcd");
        assert_eq!(b.revision(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_narrowing_clamps_edits() {
        let mut b = buf("one\ntwo\nthree");
        b.narrow(4..7);
        assert!(b.is_narrowed());
        b.insert(0, "X");
        assert_eq!(b.content(), "one\nXtwo\nthree");
        assert_eq!(b.accessible_range(), 4..8);

        b.widen();
        assert!(!b.is_narrowed());
        assert_eq!(b.accessible_range(), 0..b.len_chars());
    }

    #[test]
    fn test_markers_follow_edits() {
        let mut b = buf("a\nb");
        let m = b.create_marker(2);
        b.insert(0, "xx");
        assert_eq!(b.marker_offset(m), Some(4));
        b.remove(0..4);
        assert_eq!(b.marker_offset(m), Some(0));
    }

    #[test]
    fn test_visual_line_start_respects_prompt() {
        let mut b = buf("log\n> cmd");
        b.set_prompt_end(6);
        assert_eq!(b.visual_line_start(8), 6);
        assert_eq!(b.visual_line_start(5), 4);
        assert_eq!(b.visual_line_start(2), 0);
    }

    #[test]
    fn test_line_text_strips_break() {
        let b = buf("a\r\nb\n");
        assert_eq!(b.line_text(0).as_deref(), Some("a"));
        assert_eq!(b.line_text(1).as_deref(), Some("b"));
        assert_eq!(b.line_text(2).as_deref(), Some(""));
        assert_eq!(b.line_text(3), None);
    }
}
