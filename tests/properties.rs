//! Invariants that must hold after arbitrary edit sequences
//!
//! Edit sequences come from a seeded generator so failures reproduce.

mod common;

use common::*;
use linestamp::{AnnotationKind, Buffer, BufferId};

const SEEDS: [u64; 8] = [1, 7, 42, 1234, 9001, 31337, 0xdead_beef, 0x5eed];

fn seeded_buffer(engine: &mut linestamp::Engine, rng: &mut XorShift) -> Buffer {
    let lines: Vec<String> = (0..rng.upto(6)).map(|i| format!("line {i}")).collect();
    let mut buffer = Buffer::with_text(BufferId(1), &lines.join("\n"));
    engine.enable(&mut buffer).unwrap();
    buffer
}

// ========================================================================
// Coverage and anchoring
// ========================================================================

#[test]
fn test_every_line_has_one_annotation_after_each_edit() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        for _ in 0..200 {
            random_edit(&mut rng, &mut buffer);
            engine.process_notifications(&mut buffer).unwrap();
            assert_one_per_line(&engine, &buffer);
        }
    }
}

#[test]
fn test_anchors_are_true_line_starts() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        for _ in 0..50 {
            random_edit(&mut rng, &mut buffer);
            engine.process_notifications(&mut buffer).unwrap();
        }
        for annotation in engine.annotations(&buffer) {
            assert_eq!(
                linestamp::line::true_line_start(buffer.rope(), annotation.anchor),
                annotation.anchor
            );
        }
    }
}

#[test]
fn test_appends_in_batches_keep_coverage() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        for _ in 0..20 {
            for _ in 0..rng.upto(5) {
                let text = rng.pick(&["\nnext", "more", "\n", "\na\nb"]);
                buffer.append(text);
            }
            engine.process_notifications(&mut buffer).unwrap();
            assert_one_per_line(&engine, &buffer);
        }
    }
}

// ========================================================================
// Idempotence and freshness
// ========================================================================

#[test]
fn test_fill_gaps_twice_equals_once() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        buffer.set_notifications(false);
        for _ in 0..10 {
            random_edit(&mut rng, &mut buffer);
        }

        engine.fill_gaps(&mut buffer, .., true).unwrap();
        let once = engine.annotations(&buffer);
        let stats = engine.fill_gaps(&mut buffer, .., true).unwrap();

        assert_eq!(stats.added, 0);
        assert_eq!(engine.annotations(&buffer), once);
    }
}

#[test]
fn test_reconcile_twice_keeps_one_per_line() {
    let mut engine = notification_engine();
    let mut buffer = enabled_buffer(&mut engine, "a\nb\nc\nd");

    engine.reconcile(&mut buffer, 1, 5).unwrap();
    let first = anchors(&engine, &buffer);
    engine.reconcile(&mut buffer, 1, 5).unwrap();

    assert_eq!(anchors(&engine, &buffer), first);
    assert_one_per_line(&engine, &buffer);
}

#[test]
fn test_reconciled_lines_are_always_real() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        let len = buffer.len_chars();
        let begin = rng.upto(len);
        let end = begin + rng.upto(len - begin);
        engine.reconcile(&mut buffer, begin, end).unwrap();

        let first = buffer.rope().char_to_line(begin);
        let last = buffer.rope().char_to_line(end);
        for idx in first..=last {
            let start = buffer.rope().line_to_char(idx);
            let on_line = engine.annotations_on_line(&buffer, start);
            assert_eq!(on_line.len(), 1);
            assert_eq!(on_line[0].kind, AnnotationKind::Real);
        }
    }
}

// ========================================================================
// Teardown
// ========================================================================

#[test]
fn test_disable_always_empties() {
    for seed in SEEDS {
        let mut rng = XorShift::new(seed);
        let mut engine = notification_engine();
        let mut buffer = seeded_buffer(&mut engine, &mut rng);

        for _ in 0..30 {
            random_edit(&mut rng, &mut buffer);
            if rng.upto(1) == 0 {
                engine.process_notifications(&mut buffer).unwrap();
            }
        }
        engine.disable(&mut buffer);

        assert!(engine.annotations_overlapping(&buffer, ..).is_empty());
        assert_eq!(buffer.marker_count(), 0);
        assert_eq!(buffer.subscriber_count(), 0);
    }
}
