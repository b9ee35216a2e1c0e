//! Before/after update hooks
//!
//! Hooks are owned by an engine instance and run around every update,
//! whichever path triggered it. They receive the buffer mutably; edits made
//! from a hook are delivered as ordinary notifications and processed after
//! the current update finishes.

use crate::buffer::{Buffer, BufferId, EditEvent};

/// What caused an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// An edit notification from the buffer
    Notification(EditEvent),
    /// An idle poll tick found the buffer dirty
    Poll,
}

/// Passed to every hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateInfo {
    pub buffer: BufferId,
    pub trigger: Trigger,
}

/// Handle returned when registering a hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Which list a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

pub type HookFn = Box<dyn FnMut(&mut Buffer, &UpdateInfo)>;

/// Ordered before/after callback lists
#[derive(Default)]
pub struct UpdateHooks {
    before: Vec<(HookId, HookFn)>,
    after: Vec<(HookId, HookFn)>,
    next_id: u64,
}

impl UpdateHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook; hooks in a phase run in registration order
    pub fn add(
        &mut self,
        phase: HookPhase,
        hook: impl FnMut(&mut Buffer, &UpdateInfo) + 'static,
    ) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        let list = match phase {
            HookPhase::Before => &mut self.before,
            HookPhase::After => &mut self.after,
        };
        list.push((id, Box::new(hook)));
        id
    }

    /// Deregister a hook. Returns true if it was registered.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.before.len() + self.after.len();
        self.before.retain(|(hook_id, _)| *hook_id != id);
        self.after.retain(|(hook_id, _)| *hook_id != id);
        self.before.len() + self.after.len() != before
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn run(&mut self, phase: HookPhase, buffer: &mut Buffer, info: &UpdateInfo) {
        let list = match phase {
            HookPhase::Before => &mut self.before,
            HookPhase::After => &mut self.after,
        };
        for (_, hook) in list.iter_mut() {
            hook(buffer, info);
        }
    }
}
