//! Output sinks for the structured logger.
//!
//! A sink receives one fully serialized record at a time and must write it
//! as a single line. Writes are best effort: a sink never reports failure
//! back to the code that logged.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Destination for serialized log records.
pub trait Sink: Send + Sync + 'static {
    /// Writes `line` (without its trailing newline) as one line.
    fn write_line(&self, line: &str);
}

/// Process standard output.
///
/// Each record is written with a single `write_all` while holding the
/// stdout lock, so concurrent callers never interleave partial lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write_line(&self, line: &str) {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(&buf).and_then(|()| out.flush()) {
            tracing::warn!("log sink write failed: {e}");
        }
    }
}

/// In-memory sink; keeps every line it receives.
///
/// Clones share the same buffer, so hand one clone to a
/// [`Logger`](crate::Logger) and read records back through another.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Lines parsed back into JSON values. Lines that are not valid JSON are
    /// skipped.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl Sink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_lines() {
        let sink = MemorySink::new();
        let writer = sink.clone();
        writer.write_line(r#"{"a":1}"#);
        writer.write_line("not json");

        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.records(), vec![serde_json::json!({"a": 1})]);
    }
}
