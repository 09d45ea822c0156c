// Diagnostic sink implementations
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

use waitfor_core::port::DiagnosticSink;

/// Forwards diagnostic lines to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "waitfor::check", "{}", line);
    }
}

/// Writes each diagnostic line, newline-terminated, to a writer
///
/// # Example
/// ```ignore
/// let sink = Arc::new(WriterSink::new(std::io::stdout()));
/// check.with_sink(sink);
/// ```
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> DiagnosticSink for WriterSink<W> {
    fn emit(&self, line: &str) {
        let mut writer = match self.writer.lock() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        };
        // best effort: a broken diagnostic stream must not fail the check
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }
}
