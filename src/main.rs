use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::time::Instant;

use linestamp::cli::CliArgs;
use linestamp::{line, Buffer, BufferId, DetectionMode, Engine, LinestampConfig};

fn main() -> Result<()> {
    linestamp::tracing::init();

    let args = CliArgs::parse();
    let mut config = LinestampConfig::load();
    args.apply(&mut config);

    let mut engine = Engine::from_config(&config).context("invalid renderer configuration")?;
    let mut buffer = Buffer::new(BufferId(1));
    // Poll mode stands in for a host that never reports edits
    buffer.set_notifications(config.detection_mode == DetectionMode::Notification);
    engine.enable(&mut buffer)?;

    let reader: Box<dyn BufRead> = match &args.path {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let mut out = io::stdout().lock();
    let mut read = 0;
    let mut printed = 0;
    for input in reader.lines() {
        let input = input.context("reading input")?;
        // Line 0 stays empty so every input line arrives as an append
        buffer.append(&format!("\n{input}"));
        read += 1;

        engine.process_notifications(&mut buffer)?;
        engine.tick(&mut buffer, Instant::now())?;
        print_annotated(&engine, &buffer, read, &mut printed, &mut out)?;
    }

    engine.poll_now(&mut buffer)?;
    print_annotated(&engine, &buffer, read, &mut printed, &mut out)?;

    tracing::debug!(lines = read, "input finished");
    engine.disable(&mut buffer);
    Ok(())
}

/// Print input lines `printed..read` that already carry an annotation,
/// stopping at the first one that does not
fn print_annotated(
    engine: &Engine,
    buffer: &Buffer,
    read: usize,
    printed: &mut usize,
    out: &mut impl Write,
) -> Result<()> {
    while *printed < read {
        let line_idx = *printed + 1;
        let start = *line::line_span(buffer.rope(), line_idx).start();
        let Some(annotation) = engine.annotations_on_line(buffer, start).into_iter().next() else {
            break;
        };
        let text = buffer.line_text(line_idx).unwrap_or_default();
        writeln!(out, "{} {}", annotation.text, text)?;
        *printed += 1;
    }
    out.flush()?;
    Ok(())
}
