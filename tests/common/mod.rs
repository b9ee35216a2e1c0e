//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use linestamp::line;
use linestamp::{
    AnnotationKind, Buffer, BufferId, DetectionMode, Engine, EngineOptions, Renderer,
    TimestampRenderer,
};
use std::time::Duration;

/// Text every real annotation renders to
pub const STAMP: &str = "12:34:56";

/// Text every placeholder renders to (blank, as wide as `STAMP`)
pub const BLANK: &str = "        ";

pub fn fixed_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 14, 12, 34, 56).unwrap()
}

/// Timestamp renderer with a frozen clock
pub fn fixed_renderer() -> TimestampRenderer {
    TimestampRenderer::default().with_clock(fixed_time)
}

pub fn notification_engine() -> Engine {
    Engine::new(fixed_renderer(), EngineOptions::default())
}

pub fn poll_engine() -> Engine {
    Engine::new(
        fixed_renderer(),
        EngineOptions {
            detection_mode: DetectionMode::Poll,
            poll_period: Duration::from_secs(1),
        },
    )
}

pub fn engine_with(renderer: impl Renderer + 'static) -> Engine {
    Engine::new(renderer, EngineOptions::default())
}

/// Buffer with `text`, enabled on `engine`
pub fn enabled_buffer(engine: &mut Engine, text: &str) -> Buffer {
    let mut buffer = Buffer::with_text(BufferId(1), text);
    engine.enable(&mut buffer).unwrap();
    buffer
}

/// Annotation kinds in anchor order
pub fn kinds(engine: &Engine, buffer: &Buffer) -> Vec<AnnotationKind> {
    engine.annotations(buffer).iter().map(|a| a.kind).collect()
}

/// Anchor offsets in order
pub fn anchors(engine: &Engine, buffer: &Buffer) -> Vec<usize> {
    engine.annotations(buffer).iter().map(|a| a.anchor).collect()
}

/// Start offset of every line in the buffer
pub fn line_starts(buffer: &Buffer) -> Vec<usize> {
    (0..buffer.line_count())
        .map(|idx| *line::line_span(buffer.rope(), idx).start())
        .collect()
}

/// Every line carries exactly one annotation, anchored at its true start
pub fn assert_one_per_line(engine: &Engine, buffer: &Buffer) {
    let starts = line_starts(buffer);
    for (idx, start) in starts.iter().enumerate() {
        let on_line = engine.annotations_on_line(buffer, *start);
        assert_eq!(
            on_line.len(),
            1,
            "line {} ({:?}) has {} annotations in {:?}",
            idx,
            buffer.line_text(idx),
            on_line.len(),
            buffer.content()
        );
        assert_eq!(on_line[0].anchor, *start, "line {} anchor is mid-line", idx);
    }
    assert_eq!(anchors(engine, buffer), starts);
}

/// Small deterministic generator for edit sequences
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform-ish value in `0..=max`
    pub fn upto(&mut self, max: usize) -> usize {
        (self.next_u64() % (max as u64 + 1)) as usize
    }

    pub fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.upto(items.len() - 1)]
    }
}

/// Apply one random insert, remove or replace
pub fn random_edit(rng: &mut XorShift, buffer: &mut Buffer) {
    const PIECES: &[&str] = &[
        "x", "\n", "ab\ncd", "\n\n", "héllo", "\nz", "q\n", "", "\r", "\r\n", "k\r", "\nw\r",
    ];
    let len = buffer.len_chars();
    match rng.upto(2) {
        0 => {
            let at = rng.upto(len);
            buffer.insert(at, rng.pick(PIECES));
        }
        1 => {
            let start = rng.upto(len);
            let end = start + rng.upto(len - start);
            buffer.remove(start..end);
        }
        _ => {
            let start = rng.upto(len);
            let end = start + rng.upto((len - start).min(4));
            buffer.replace(start..end, rng.pick(PIECES));
        }
    }
}
