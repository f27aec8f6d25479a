//! Export progress reporting

use tracing::info;

/// Receives progress from an export, on the exporting task
pub trait ExportObserver: Send {
    /// Overall progress, 0-100, never decreasing
    fn on_progress(&mut self, _percent: f64) {}

    /// A part finished encoding; `index` is 1-based
    ///
    /// `part` is the encoded part itself, so it can be delivered before the
    /// whole export finishes.
    fn on_slice_complete(&mut self, _index: usize, _total: usize, _part: &[u8]) {}
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExportObserver for NoopObserver {}

/// Logs parts as they complete and progress in 10% steps
#[derive(Debug, Default, Clone)]
pub struct LoggingObserver {
    last_logged: f64,
}

impl ExportObserver for LoggingObserver {
    fn on_progress(&mut self, percent: f64) {
        if percent >= self.last_logged + 10.0 || percent >= 100.0 {
            info!(percent = format!("{:.0}", percent), "Export progress");
            self.last_logged = percent;
        }
    }

    fn on_slice_complete(&mut self, index: usize, total: usize, part: &[u8]) {
        info!(index, total, bytes = part.len(), "Part encoded");
    }
}

/// Keeps reported progress monotone, holding at 99 until packaging is done
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last: f64,
}

/// Ceiling before the artifact is assembled
const PRE_PACKAGING_CEILING: f64 = 99.0;

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> f64 {
        self.last
    }

    /// Forward `percent` if it moves progress forward
    pub fn update(&mut self, observer: &mut dyn ExportObserver, percent: f64) {
        let clamped = percent.clamp(0.0, PRE_PACKAGING_CEILING);
        if clamped > self.last {
            self.last = clamped;
            observer.on_progress(clamped);
        }
    }

    /// Report completion
    pub fn finish(&mut self, observer: &mut dyn ExportObserver) {
        if self.last < 100.0 {
            self.last = 100.0;
            observer.on_progress(100.0);
        }
    }
}
