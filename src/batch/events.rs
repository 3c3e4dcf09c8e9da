use crate::relay::ConflictHints;
use super::report::BatchReport;
use super::request::ExtractionRequest;

/// Receives everything the engine reports to the outside.
///
/// Calls arrive on the worker thread running the batch. Implementations that
/// answer decisions do so through [`crate::relay::DecisionRelay`], either
/// from inside the callback or later from another thread.
pub trait EventSink: Send + Sync {
    fn started(&self, _index: usize, _request: &ExtractionRequest) {}

    fn progress(&self, index: usize, percent: u8);

    fn status(&self, index: usize, outcome: &str);

    fn password_needed(&self, index: usize, prompt: &str);

    fn conflict_needed(&self, index: usize, prompt: &str, hints: &ConflictHints);

    fn batch_complete(&self, _report: &BatchReport) {}
}

/// Sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn progress(&self, _index: usize, _percent: u8) {}

    fn status(&self, _index: usize, _outcome: &str) {}

    fn password_needed(&self, _index: usize, _prompt: &str) {}

    fn conflict_needed(&self, _index: usize, _prompt: &str, _hints: &ConflictHints) {}
}
