//! Progress bar for URL sweeps, shared with the tracing writer so log lines
//! print above the bar instead of tearing it.

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

/// Global holder for the active bulk progress bar.
/// When set, tracing output will be routed through the progress bar's println method.
static BULK_PROGRESS_BAR: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<ProgressBar>> {
    // A panic while holding the lock leaves a plain Option behind, still usable.
    BULK_PROGRESS_BAR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Create a bar for a URL sweep and register it for tracing output.
/// The length is set by the caller once the number of distinct URLs is known.
pub fn new_bulk_progress_bar() -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA {eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░");

    let bar = ProgressBar::new(0);
    bar.set_style(style);
    set_bulk_progress_bar(bar.clone());
    bar
}

/// Set the active bulk progress bar for tracing integration.
pub fn set_bulk_progress_bar(pb: ProgressBar) {
    *slot() = Some(pb);
}

/// Finish and clear the active bulk progress bar, if any.
pub fn clear_bulk_progress_bar() {
    if let Some(pb) = slot().take() {
        pb.finish_and_clear();
    }
}

/// Get a clone of the current bulk progress bar if one is set.
pub fn get_bulk_progress_bar() -> Option<ProgressBar> {
    slot().clone()
}

fn emit_line(line: &str) -> std::io::Result<()> {
    match get_bulk_progress_bar() {
        Some(pb) => pb.println(line),
        None => {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(line.as_bytes())?;
            stderr.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Line-buffered writer emitting through the active bar, or stderr without one.
#[derive(Default)]
pub struct ProgressWriter {
    buffer: Vec<u8>,
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            emit_line(String::from_utf8_lossy(&line).trim_end_matches('\n'))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&pending);
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            return Ok(());
        }
        emit_line(trimmed)
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// `MakeWriter` for tracing-subscriber producing [`ProgressWriter`]s.
#[derive(Default)]
pub struct ProgressWriterFactory;

impl ProgressWriterFactory {
    pub fn new() -> Self {
        Self
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for ProgressWriterFactory {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_registration_round_trip() {
        let bar = new_bulk_progress_bar();
        bar.set_length(3);
        assert_eq!(get_bulk_progress_bar().and_then(|pb| pb.length()), Some(3));

        clear_bulk_progress_bar();
        assert!(get_bulk_progress_bar().is_none());
    }

    #[test]
    fn test_writer_buffers_partial_lines() {
        let mut writer = ProgressWriter::default();
        writer.write_all(b"partial").unwrap();
        assert_eq!(writer.buffer, b"partial");

        writer.write_all(b" line\nnext").unwrap();
        assert_eq!(writer.buffer, b"next");

        writer.flush().unwrap();
        assert!(writer.buffer.is_empty());
    }
}
