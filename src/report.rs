//! Step outcome reporting.

use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Receives one message per step outcome.
pub trait Reporter {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
    fn warning(&self, message: &str);
}

/// Logs outcomes through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn failure(&self, message: &str) {
        error!("{}", message);
    }

    fn warning(&self, message: &str) {
        warn!("{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Warning,
}

/// A recorded outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    pub message: String,
}

/// Keeps every outcome in memory, for tests and run summaries.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    entries: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Report> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<Report> {
        self.entries()
            .into_iter()
            .filter(|r| r.outcome == Outcome::Failure)
            .collect()
    }

    fn record(&self, outcome: Outcome, message: &str) {
        debug!("{:?}: {}", outcome, message);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(Report {
                outcome,
                message: message.to_string(),
            });
        }
    }
}

impl Reporter for RecordingReporter {
    fn success(&self, message: &str) {
        self.record(Outcome::Success, message);
    }

    fn failure(&self, message: &str) {
        self.record(Outcome::Failure, message);
    }

    fn warning(&self, message: &str) {
        self.record(Outcome::Warning, message);
    }
}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn failure(&self, message: &str) {
        (**self).failure(message);
    }

    fn warning(&self, message: &str) {
        (**self).warning(message);
    }
}
