//! Annotation engine - per-buffer sessions and the public operations
//!
//! The engine owns one session for every enabled buffer. A session holds
//! that buffer's annotation store, its change observer and, in poll mode,
//! its tail poller. Buffers are passed in by the host on every call; the
//! engine never keeps a reference to them.
//!
//! Updates happen on two paths which look the same to hooks:
//! - [`Engine::process_notifications`] reconciles every queued edit event
//! - [`Engine::tick`] fills gaps at the buffer tail when the poller finds
//!   the buffer dirty

use std::collections::HashMap;
use std::ops::{Bound, RangeBounds};
use std::time::{Duration, Instant};

use crate::annotation::{AnnotationStore, PlacedAnnotation};
use crate::buffer::{Buffer, BufferId, SubscriberId};
use crate::config::{DetectionMode, LinestampConfig};
use crate::error::Result;
use crate::hooks::{HookId, HookPhase, Trigger, UpdateHooks, UpdateInfo};
use crate::observer::ChangeObserver;
use crate::poll::TailPoller;
use crate::reconcile::{self, UpdateStats};
use crate::render::Renderer;

/// Upper bound on events handled by one `process_notifications` call.
///
/// Hooks that edit on every update would otherwise never let the queue
/// drain. Whatever is left stays queued for the next call.
pub const MAX_EVENTS_PER_PASS: usize = 1024;

/// Lifecycle of one buffer's annotation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disabled,
    /// Initial placeholder fill in progress
    Enabling,
    Enabled,
    /// Unsubscribing and removing annotations
    Disabling,
}

/// Engine-wide detection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub detection_mode: DetectionMode,
    pub poll_period: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            detection_mode: DetectionMode::Notification,
            poll_period: Duration::from_secs(1),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &LinestampConfig) -> Self {
        Self {
            detection_mode: config.detection_mode,
            poll_period: config.poll_period(),
        }
    }
}

/// Result of a poll tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Buffer is not enabled
    Disabled,
    /// Buffer is enabled without a poller
    NotPolling,
    /// Timer not due yet
    Idle,
    /// Timer fired, nothing changed since the last sync
    Clean,
    /// Tail gaps were filled
    Filled(UpdateStats),
}

struct Session {
    state: SessionState,
    store: AnnotationStore,
    observer: Option<ChangeObserver>,
    poller: Option<TailPoller>,
}

/// Keeps one annotation on every line of each enabled buffer
pub struct Engine {
    subscriber: SubscriberId,
    options: EngineOptions,
    renderer: Box<dyn Renderer>,
    hooks: UpdateHooks,
    sessions: HashMap<BufferId, Session>,
}

impl Engine {
    pub fn new(renderer: impl Renderer + 'static, options: EngineOptions) -> Self {
        Self {
            subscriber: SubscriberId::next(),
            options,
            renderer: Box::new(renderer),
            hooks: UpdateHooks::new(),
            sessions: HashMap::new(),
        }
    }

    /// Build an engine with the renderer and detection mode from `config`
    pub fn from_config(config: &LinestampConfig) -> Result<Self> {
        let renderer = config.build_renderer()?;
        Ok(Self::new(renderer, EngineOptions::from_config(config)))
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    // === Hooks ===

    /// Register a hook run around every update, on either detection path
    pub fn add_hook(
        &mut self,
        phase: HookPhase,
        hook: impl FnMut(&mut Buffer, &UpdateInfo) + 'static,
    ) -> HookId {
        self.hooks.add(phase, hook)
    }

    pub fn remove_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }

    // === Queries ===

    pub fn state(&self, buffer: BufferId) -> SessionState {
        self.sessions
            .get(&buffer)
            .map_or(SessionState::Disabled, |session| session.state)
    }

    pub fn is_enabled(&self, buffer: BufferId) -> bool {
        self.state(buffer) == SessionState::Enabled
    }

    pub fn enabled_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn store(&self, buffer: BufferId) -> Option<&AnnotationStore> {
        self.sessions.get(&buffer).map(|session| &session.store)
    }

    pub fn poller(&self, buffer: BufferId) -> Option<&TailPoller> {
        self.sessions
            .get(&buffer)
            .and_then(|session| session.poller.as_ref())
    }

    /// When the poll timer for `buffer` fires next
    pub fn next_poll_due(&self, buffer: BufferId) -> Option<Instant> {
        self.poller(buffer).and_then(|poller| poller.timer().next_due())
    }

    /// All annotations on `buffer`, in anchor order
    pub fn annotations(&self, buffer: &Buffer) -> Vec<PlacedAnnotation> {
        self.store(buffer.id())
            .map(|store| store.iter_placed(buffer))
            .unwrap_or_default()
    }

    /// Annotations anchored within `range`
    pub fn annotations_overlapping(
        &self,
        buffer: &Buffer,
        range: impl RangeBounds<usize>,
    ) -> Vec<PlacedAnnotation> {
        let Some((begin, end)) = resolve_range(buffer, range) else {
            return Vec::new();
        };
        self.store(buffer.id())
            .map(|store| store.overlapping(buffer, begin..=end))
            .unwrap_or_default()
    }

    /// Annotations on the line containing `position`
    pub fn annotations_on_line(&self, buffer: &Buffer, position: usize) -> Vec<PlacedAnnotation> {
        self.store(buffer.id())
            .map(|store| store.on_line(buffer, position))
            .unwrap_or_default()
    }

    // === Lifecycle ===

    /// Enable annotation for `buffer`. See [`Engine::enable_at`].
    pub fn enable(&mut self, buffer: &mut Buffer) -> Result<bool> {
        self.enable_at(buffer, Instant::now())
    }

    /// Enable annotation for `buffer`, starting the poll timer at `now`.
    ///
    /// Every existing line gets a placeholder. Returns false if the buffer
    /// was already enabled. If the initial fill fails nothing is left
    /// behind and the buffer stays disabled.
    pub fn enable_at(&mut self, buffer: &mut Buffer, now: Instant) -> Result<bool> {
        let id = buffer.id();
        if self.sessions.contains_key(&id) {
            tracing::debug!(buffer = id.0, "already enabled");
            return Ok(false);
        }
        tracing::debug!(buffer = id.0, state = ?SessionState::Enabling, "session state");

        let mut store = AnnotationStore::new();
        let len = buffer.len_chars();
        let filled = reconcile::fill_gaps(&mut store, buffer, 0, len, true, self.renderer.as_ref());
        if let Err(e) = filled {
            store.remove_all(buffer);
            tracing::warn!(buffer = id.0, "enable failed: {}", e);
            return Err(e.into());
        }

        // Drop a subscription left over from a session torn down elsewhere
        buffer.unsubscribe(self.subscriber);
        let observer = ChangeObserver::subscribe(buffer, self.subscriber);

        let poller = match self.options.detection_mode {
            DetectionMode::Notification => None,
            DetectionMode::Poll => {
                let mut poller = TailPoller::new(self.options.poll_period, buffer);
                poller.timer_mut().start(now);
                Some(poller)
            }
        };

        tracing::debug!(
            buffer = id.0,
            state = ?SessionState::Enabled,
            annotations = store.len(),
            mode = ?self.options.detection_mode,
            "session state"
        );
        self.sessions.insert(
            id,
            Session {
                state: SessionState::Enabled,
                store,
                observer,
                poller,
            },
        );
        Ok(true)
    }

    /// Disable annotation for `buffer`: unsubscribe, stop the timer and
    /// remove every annotation. Returns false if it was not enabled.
    pub fn disable(&mut self, buffer: &mut Buffer) -> bool {
        let id = buffer.id();
        let Some(mut session) = self.sessions.remove(&id) else {
            return false;
        };
        session.state = SessionState::Disabling;
        tracing::debug!(buffer = id.0, state = ?session.state, "session state");

        if let Some(observer) = session.observer.take() {
            observer.unsubscribe(buffer);
        }
        if let Some(poller) = session.poller.as_mut() {
            poller.timer_mut().cancel();
        }
        session.store.remove_all(buffer);

        tracing::debug!(buffer = id.0, state = ?SessionState::Disabled, "session state");
        true
    }

    // === Explicit updates ===

    /// Annotate every line in `range` that has none.
    ///
    /// Every line holding an offset of `range` is visited. Unbounded ends
    /// mean the buffer start and end; an empty range does nothing.
    pub fn fill_gaps(
        &mut self,
        buffer: &mut Buffer,
        range: impl RangeBounds<usize>,
        use_placeholder: bool,
    ) -> Result<UpdateStats> {
        let Some((begin, end)) = resolve_range(buffer, range) else {
            return Ok(UpdateStats::default());
        };
        let Some(session) = self.sessions.get_mut(&buffer.id()) else {
            return Ok(UpdateStats::default());
        };
        let stats = reconcile::fill_gaps(
            &mut session.store,
            buffer,
            begin,
            end,
            use_placeholder,
            self.renderer.as_ref(),
        )?;
        Ok(stats)
    }

    /// Annotate the unannotated suffix of `buffer`
    pub fn fill_tail_gaps(
        &mut self,
        buffer: &mut Buffer,
        use_placeholder: bool,
    ) -> Result<UpdateStats> {
        let Some(session) = self.sessions.get_mut(&buffer.id()) else {
            return Ok(UpdateStats::default());
        };
        let stats = reconcile::fill_tail_gaps(
            &mut session.store,
            buffer,
            use_placeholder,
            self.renderer.as_ref(),
        )?;
        Ok(stats)
    }

    /// Re-stamp every line touched by `[begin, end]` with a Real annotation
    pub fn reconcile(
        &mut self,
        buffer: &mut Buffer,
        begin: usize,
        end: usize,
    ) -> Result<UpdateStats> {
        let Some(session) = self.sessions.get_mut(&buffer.id()) else {
            return Ok(UpdateStats::default());
        };
        let stats =
            reconcile::reconcile(&mut session.store, buffer, begin, end, self.renderer.as_ref())?;
        Ok(stats)
    }

    // === Notification path ===

    /// Reconcile every queued edit notification for `buffer`.
    ///
    /// Each event runs between the before and after hooks. Edits made by a
    /// hook are queued like any other and handled later in the same call.
    /// A renderer failure stops the pass and is returned; events after the
    /// failing one stay queued.
    pub fn process_notifications(&mut self, buffer: &mut Buffer) -> Result<UpdateStats> {
        let id = buffer.id();
        let Self {
            sessions,
            hooks,
            renderer,
            ..
        } = self;

        let mut total = UpdateStats::default();
        for _ in 0..MAX_EVENTS_PER_PASS {
            let Some(Session {
                store,
                observer: Some(observer),
                ..
            }) = sessions.get_mut(&id)
            else {
                return Ok(total);
            };
            let Some(event) = observer.next_event() else {
                return Ok(total);
            };

            let known = observer.pending();
            let info = UpdateInfo {
                buffer: id,
                trigger: Trigger::Notification(event),
            };
            hooks.run(HookPhase::Before, buffer, &info);
            let event = observer.rebase_onto_pending(event, known);

            let (begin, end) = reconcile::edit_range(buffer, &event);
            match reconcile::reconcile(store, buffer, begin, end, &**renderer) {
                Ok(stats) => total += stats,
                Err(e) => {
                    tracing::warn!(buffer = id.0, ?event, "reconcile failed: {}", e);
                    return Err(e.into());
                }
            }

            hooks.run(HookPhase::After, buffer, &info);
        }

        tracing::warn!(
            buffer = id.0,
            limit = MAX_EVENTS_PER_PASS,
            "edit notifications still pending, deferring the rest"
        );
        Ok(total)
    }

    // === Poll path ===

    /// Drive the poll timer. Call from the host's idle loop.
    pub fn tick(&mut self, buffer: &mut Buffer, now: Instant) -> Result<TickOutcome> {
        let Some(session) = self.sessions.get_mut(&buffer.id()) else {
            return Ok(TickOutcome::Disabled);
        };
        let Some(poller) = session.poller.as_mut() else {
            return Ok(TickOutcome::NotPolling);
        };
        if !poller.timer().is_due(now) {
            return Ok(TickOutcome::Idle);
        }
        poller.timer_mut().rearm(now);
        self.poll_update(buffer)
    }

    /// Run the poll check immediately, regardless of the timer
    pub fn poll_now(&mut self, buffer: &mut Buffer) -> Result<TickOutcome> {
        self.poll_update(buffer)
    }

    fn poll_update(&mut self, buffer: &mut Buffer) -> Result<TickOutcome> {
        let id = buffer.id();
        let Self {
            sessions,
            hooks,
            renderer,
            ..
        } = self;

        let Some(session) = sessions.get_mut(&id) else {
            return Ok(TickOutcome::Disabled);
        };
        let Session { store, poller, .. } = session;
        let Some(poller) = poller.as_mut() else {
            return Ok(TickOutcome::NotPolling);
        };
        if !poller.observe(buffer) {
            tracing::trace!(buffer = id.0, "poll: clean");
            return Ok(TickOutcome::Clean);
        }

        let info = UpdateInfo {
            buffer: id,
            trigger: Trigger::Poll,
        };
        hooks.run(HookPhase::Before, buffer, &info);

        match reconcile::fill_tail_gaps(store, buffer, false, &**renderer) {
            Ok(stats) => {
                poller.mark_synced(buffer);
                tracing::debug!(buffer = id.0, added = stats.added, "poll: tail filled");
                hooks.run(HookPhase::After, buffer, &info);
                Ok(TickOutcome::Filled(stats))
            }
            Err(e) => {
                // Still dirty, so the next tick retries
                tracing::warn!(buffer = id.0, "poll fill failed, will retry: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Clamp a range of offsets to the whole buffer, as an inclusive pair.
///
/// Offsets run through `len_chars()` so the anchor of an empty last line
/// is reachable. Returns `None` for an empty range.
fn resolve_range(buffer: &Buffer, range: impl RangeBounds<usize>) -> Option<(usize, usize)> {
    let len = buffer.len_chars();
    let begin = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.checked_add(1)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.checked_sub(1)?,
        Bound::Unbounded => len,
    };
    let begin = begin.min(len);
    if end < begin {
        return None;
    }
    Some((begin, end.min(len)))
}
