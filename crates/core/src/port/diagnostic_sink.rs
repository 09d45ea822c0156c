// Diagnostic Sink Port
// Best-effort, human-readable trace of what a condition source attempted.

/// Receiver of diagnostic lines emitted by condition sources
///
/// One call per line (no trailing newline). Sinks must not fail the caller:
/// write errors are swallowed by the implementation.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, line: &str);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that keeps every emitted line in memory
    #[derive(Clone, Default)]
    pub struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        /// True if any emitted line contains `needle`
        pub fn contains(&self, needle: &str) -> bool {
            self.lines.lock().unwrap().iter().any(|l| l.contains(needle))
        }
    }

    impl DiagnosticSink for MemorySink {
        fn emit(&self, line: &str) {
            self.lines.lock().unwrap().push(line.to_string());
        }
    }
}
