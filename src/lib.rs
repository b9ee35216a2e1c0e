//! Linestamp - per-line annotations that stay in sync with an edited buffer
//!
//! This crate keeps exactly one annotation (a timestamp, or a placeholder
//! when the change time was never observed) on every line of a text buffer
//! as lines are inserted, deleted, split and merged. Changes are picked up
//! from edit notifications or, for hosts that never send them, from an
//! idle poll over the buffer tail.

pub mod annotation;
pub mod buffer;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod line;
pub mod marker;
pub mod observer;
pub mod poll;
pub mod reconcile;
pub mod render;
pub mod tracing;

// Re-export commonly used types
pub use annotation::{AnnotationKind, AnnotationStore, PlacedAnnotation};
pub use buffer::{Buffer, BufferId, EditEvent};
pub use config::{DetectionMode, LinestampConfig, RendererStrategy};
pub use engine::{Engine, EngineOptions, SessionState, TickOutcome};
pub use error::{Error, RenderError, Result};
pub use hooks::{HookPhase, Trigger, UpdateInfo};
pub use reconcile::UpdateStats;
pub use render::{ElapsedRenderer, FnRenderer, Placeholder, Renderer, TimestampRenderer};
