//! Progress reporting for long-running geometry work.
//!
//! Coverage aggregation is quadratic in areas x vegetation features and
//! can take a while on a full city. [`ProgressCallback`] lets callers
//! plug in a progress bar without this crate knowing how it is drawn.

/// Receives progress updates from a long-running computation.
pub trait ProgressCallback: Send + Sync {
    /// Total units of work, once known.
    fn set_total(&self, total: u64);

    /// Advance by `delta` units.
    fn inc(&self, delta: u64);

    /// Replace the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the work as complete.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
