//! Error Reporting
//!
//! Fire-and-forget sink for failures that have no synchronous caller to
//! return to: undecodable frames, subscriber panics, re-broadcast write
//! failures. Reporters must never block and never fail.

use anyhow::Error;
use log::error;
use parking_lot::Mutex;

pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: Error);
}

/// Production reporter: forwards everything to the log at error level.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, error: Error) {
        error!("{error:#}");
    }
}

/// Test reporter that records rendered errors for later assertions.
#[derive(Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, error: Error) {
        self.entries.lock().push(format!("{error:#}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn collecting_reporter_records_context_chain() {
        let reporter = CollectingReporter::new();
        reporter.report(anyhow!("bad frame").context("dropping frame"));

        let entries = reporter.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].contains("dropping frame"));
        assert!(entries[0].contains("bad frame"));
    }
}
