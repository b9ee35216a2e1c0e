//! Change observer - edit notifications for one buffer
//!
//! Wraps the receiving side of a buffer subscription. Events are queued by
//! the buffer as edits happen and drained by the engine on its own
//! execution context. Because several edits may land before the engine
//! runs, each event is rebased through every later edit before it is
//! handed out, so its range is in the buffer's current coordinates.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};

use crate::buffer::{Buffer, BufferId, EditEvent, SubscriberId};

/// Subscription to one buffer's edit notifications
#[derive(Debug)]
pub struct ChangeObserver {
    buffer: BufferId,
    subscriber: SubscriberId,
    rx: Receiver<EditEvent>,
    /// Received but not yet handed out, oldest first
    pending: VecDeque<EditEvent>,
}

/// Map `position` through a later edit.
///
/// Positions at or before the edit stay put. Positions inside the replaced
/// text go to its start when `right_bias` is false and to the end of the
/// inserted text when it is true.
pub fn map_position(position: usize, later: &EditEvent, right_bias: bool) -> usize {
    let inserted = later.end - later.begin;
    let replaced_end = later.begin + later.pre_edit_len;
    if position <= later.begin {
        position
    } else if position >= replaced_end {
        position - later.pre_edit_len + inserted
    } else if right_bias {
        later.end
    } else {
        later.begin
    }
}

/// Rebase an event's range through a later edit
pub fn rebase(event: EditEvent, later: &EditEvent) -> EditEvent {
    let begin = map_position(event.begin, later, false);
    let end = map_position(event.end, later, true).max(begin);
    EditEvent {
        begin,
        end,
        pre_edit_len: event.pre_edit_len,
    }
}

impl ChangeObserver {
    /// Subscribe `subscriber` to `buffer`.
    ///
    /// Returns `None` if that subscriber is already attached.
    pub fn subscribe(buffer: &mut Buffer, subscriber: SubscriberId) -> Option<Self> {
        let rx = buffer.subscribe(subscriber)?;
        tracing::debug!(buffer = buffer.id().0, "change observer subscribed");
        Some(Self {
            buffer: buffer.id(),
            subscriber,
            rx,
            pending: VecDeque::new(),
        })
    }

    /// Detach from the buffer, discarding undelivered events
    pub fn unsubscribe(self, buffer: &mut Buffer) {
        if buffer.unsubscribe(self.subscriber) {
            tracing::debug!(buffer = buffer.id().0, "change observer unsubscribed");
        }
    }

    /// Move everything waiting in the channel into the pending queue
    fn receive(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.pending.push_back(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!(buffer = self.buffer.0, "edit notification channel closed");
                    break;
                }
            }
        }
    }

    /// Number of events waiting to be handed out
    pub fn pending(&mut self) -> usize {
        self.receive();
        self.pending.len()
    }

    /// Next event (non-blocking), rebased to current buffer coordinates
    pub fn next_event(&mut self) -> Option<EditEvent> {
        self.receive();
        let event = self.pending.pop_front()?;
        Some(
            self.pending
                .iter()
                .fold(event, |event, later| rebase(event, later)),
        )
    }

    /// Rebase `event` through events received after the first `skip`
    /// pending ones.
    ///
    /// Used when more edits landed while `event` was being handled.
    pub fn rebase_onto_pending(&mut self, event: EditEvent, skip: usize) -> EditEvent {
        self.receive();
        self.pending
            .iter()
            .skip(skip)
            .fold(event, |event, later| rebase(event, later))
    }

    /// Drain all pending events
    pub fn poll_events(&mut self) -> Vec<EditEvent> {
        std::iter::from_fn(|| self.next_event()).collect()
    }
}
