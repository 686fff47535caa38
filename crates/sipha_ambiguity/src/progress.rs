//! Progress reporting.
//!
//! The engine calls the sink synchronously from the thread running the
//! analysis. Moving updates onto a UI thread is the caller's business.

/// Receiver of `(message, step, total)` progress updates
pub trait ProgressSink {
    fn report(&mut self, message: &str, step: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str, usize, usize),
{
    fn report(&mut self, message: &str, step: usize, total: usize) {
        self(message, step, total);
    }
}

/// Sink that drops every update
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _message: &str, _step: usize, _total: usize) {}
}
