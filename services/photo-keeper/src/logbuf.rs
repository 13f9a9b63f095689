//! Ring buffer of recent log lines, served by the status endpoint at `/log`.
//!
//! Installed as a second tracing writer next to stdout. The fmt layer asks
//! for a fresh writer per event and writes the formatted line into it; the
//! line is committed to the ring when that writer is dropped.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Lines retained by the default buffer.
pub const LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&self, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn render_text(&self) -> String {
        let mut text = self.lines().join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

/// Per-event writer handed out to the fmt layer.
pub struct LogLineWriter {
    buffer: LogBuffer,
    pending: Vec<u8>,
}

impl io::Write for LogLineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogLineWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.pending);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            self.buffer.push(line.trim_end().to_string());
        }
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogLineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogLineWriter {
            buffer: self.clone(),
            pending: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_keeps_most_recent_lines() {
        let buffer = LogBuffer::new(3);
        for i in 0..5 {
            buffer.push(format!("line {}", i));
        }
        assert_eq!(buffer.lines(), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_default_capacity() {
        let buffer = LogBuffer::default();
        for i in 0..250 {
            buffer.push(i.to_string());
        }
        let lines = buffer.lines();
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert_eq!(lines[0], "150");
    }

    #[test]
    fn test_writer_commits_on_drop() {
        let buffer = LogBuffer::new(10);
        {
            let mut writer = buffer.make_writer();
            write!(writer, "2026-01-01 INFO ").unwrap();
            writeln!(writer, "Queued request").unwrap();
            assert!(buffer.lines().is_empty());
        }
        assert_eq!(buffer.lines(), vec!["2026-01-01 INFO Queued request"]);
    }

    #[test]
    fn test_render_text() {
        let buffer = LogBuffer::new(10);
        assert_eq!(buffer.render_text(), "");
        buffer.push("a".to_string());
        buffer.push("b".to_string());
        assert_eq!(buffer.render_text(), "a\nb\n");
    }

    #[test]
    fn test_captures_tracing_events() {
        let buffer = LogBuffer::new(10);
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(buffer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(image_id = 42, "Served request");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Served request"));
        assert!(lines[0].contains("image_id=42"));
    }
}
