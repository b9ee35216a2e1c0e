//! Annotation renderers
//!
//! A renderer turns "this line changed now" into display text. Real
//! annotations carry a timestamp; placeholders stand in for lines whose
//! change time was never observed.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use std::fmt::Write;

use crate::buffer::Buffer;
use crate::error::RenderError;

/// Default `strftime` format for timestamps
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

/// Produces display text for annotations.
///
/// The buffer being annotated is passed as context.
pub trait Renderer {
    fn render_real(&self, buffer: &Buffer) -> Result<String, RenderError>;
    fn render_placeholder(&self, buffer: &Buffer) -> Result<String, RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render_real(&self, buffer: &Buffer) -> Result<String, RenderError> {
        (**self).render_real(buffer)
    }

    fn render_placeholder(&self, buffer: &Buffer) -> Result<String, RenderError> {
        (**self).render_placeholder(buffer)
    }
}

/// Source of the current time
pub type Clock = Box<dyn Fn() -> DateTime<Local>>;

fn system_clock() -> Clock {
    Box::new(Local::now)
}

/// How placeholder text is produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// Blank text as wide as a real annotation, so columns line up
    MatchWidth,
    /// Fixed text
    Fixed(String),
}

impl Placeholder {
    fn render(
        &self,
        real: impl FnOnce() -> Result<String, RenderError>,
    ) -> Result<String, RenderError> {
        match self {
            Placeholder::MatchWidth => Ok(" ".repeat(real()?.chars().count())),
            Placeholder::Fixed(text) => Ok(text.clone()),
        }
    }
}

/// Check a `strftime` format string for unknown specifiers
pub fn validate_time_format(format: &str) -> Result<(), RenderError> {
    if StrftimeItems::new(format).any(|item| item == Item::Error) {
        return Err(RenderError::InvalidFormat(format.to_string()));
    }
    Ok(())
}

/// Renders wall-clock timestamps with a `strftime` format
pub struct TimestampRenderer {
    format: String,
    clock: Clock,
    placeholder: Placeholder,
}

impl TimestampRenderer {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            clock: system_clock(),
            placeholder: Placeholder::MatchWidth,
        }
    }

    /// Replace the clock (tests use a fixed one)
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Format a given instant
    pub fn format_time(&self, at: DateTime<Local>) -> Result<String, RenderError> {
        let mut out = String::new();
        write!(out, "{}", at.format(&self.format))
            .map_err(|_| RenderError::InvalidFormat(self.format.clone()))?;
        Ok(out)
    }
}

impl Default for TimestampRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_FORMAT)
    }
}

impl Renderer for TimestampRenderer {
    fn render_real(&self, _buffer: &Buffer) -> Result<String, RenderError> {
        self.format_time((self.clock)())
    }

    fn render_placeholder(&self, buffer: &Buffer) -> Result<String, RenderError> {
        self.placeholder.render(|| self.render_real(buffer))
    }
}

/// Renders time elapsed since a fixed start, as `+HH:MM:SS`
pub struct ElapsedRenderer {
    since: DateTime<Local>,
    clock: Clock,
    placeholder: Placeholder,
}

impl ElapsedRenderer {
    /// Start counting from now
    pub fn new() -> Self {
        Self {
            since: Local::now(),
            clock: system_clock(),
            placeholder: Placeholder::MatchWidth,
        }
    }

    pub fn since(mut self, since: DateTime<Local>) -> Self {
        self.since = since;
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = placeholder;
        self
    }
}

impl Default for ElapsedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for ElapsedRenderer {
    fn render_real(&self, _buffer: &Buffer) -> Result<String, RenderError> {
        let secs = (self.clock)()
            .signed_duration_since(self.since)
            .num_seconds()
            .max(0);
        Ok(format!(
            "+{:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        ))
    }

    fn render_placeholder(&self, buffer: &Buffer) -> Result<String, RenderError> {
        self.placeholder.render(|| self.render_real(buffer))
    }
}

/// Renderer built from two closures
pub struct FnRenderer<F, G> {
    real: F,
    placeholder: G,
}

impl<F, G> FnRenderer<F, G> {
    pub fn new(real: F, placeholder: G) -> Self
    where
        F: Fn(&Buffer) -> Result<String, RenderError>,
        G: Fn(&Buffer) -> Result<String, RenderError>,
    {
        Self { real, placeholder }
    }
}

impl<F, G> Renderer for FnRenderer<F, G>
where
    F: Fn(&Buffer) -> Result<String, RenderError>,
    G: Fn(&Buffer) -> Result<String, RenderError>,
{
    fn render_real(&self, buffer: &Buffer) -> Result<String, RenderError> {
        (self.real)(buffer)
    }

    fn render_placeholder(&self, buffer: &Buffer) -> Result<String, RenderError> {
        (self.placeholder)(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferId;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_timestamp_uses_format() {
        let buffer = Buffer::new(BufferId(1));
        let renderer = TimestampRenderer::new("%H:%M").with_clock(|| at(9, 5, 0));
        assert_eq!(renderer.render_real(&buffer).unwrap(), "09:05");
    }

    #[test]
    fn test_placeholder_matches_width() {
        let buffer = Buffer::new(BufferId(1));
        let renderer = TimestampRenderer::default().with_clock(|| at(12, 0, 0));
        assert_eq!(renderer.render_placeholder(&buffer).unwrap(), "        ");
    }

    #[test]
    fn test_fixed_placeholder() {
        let buffer = Buffer::new(BufferId(1));
        let renderer =
            TimestampRenderer::default().with_placeholder(Placeholder::Fixed("--".into()));
        assert_eq!(renderer.render_placeholder(&buffer).unwrap(), "--");
    }

    #[test]
    fn test_invalid_format_is_render_error() {
        let buffer = Buffer::new(BufferId(1));
        let renderer = TimestampRenderer::new("%Q oops");
        assert_eq!(
            renderer.render_real(&buffer),
            Err(RenderError::InvalidFormat("%Q oops".into()))
        );
    }

    #[test]
    fn test_validate_time_format() {
        assert!(validate_time_format("%Y-%m-%d %H:%M").is_ok());
        assert!(validate_time_format("%Q").is_err());
    }

    #[test]
    fn test_elapsed_renderer() {
        let buffer = Buffer::new(BufferId(1));
        let renderer = ElapsedRenderer::new()
            .since(at(10, 0, 0))
            .with_clock(|| at(11, 2, 3));
        assert_eq!(renderer.render_real(&buffer).unwrap(), "+01:02:03");
        assert_eq!(renderer.render_placeholder(&buffer).unwrap().len(), 9);
    }

    #[test]
    fn test_elapsed_before_start_is_zero() {
        let buffer = Buffer::new(BufferId(1));
        let renderer = ElapsedRenderer::new()
            .since(at(10, 0, 0))
            .with_clock(|| at(9, 0, 0));
        assert_eq!(renderer.render_real(&buffer).unwrap(), "+00:00:00");
    }
}
