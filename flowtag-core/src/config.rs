use std::num::NonZeroUsize;
use std::thread;
use std::time::Duration;

/// How long a run may take before outstanding work is abandoned.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the parallel dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of worker threads classifying lines.
    pub workers: NonZeroUsize,

    /// Upper bound on a whole run, measured from the start of dispatch.
    pub timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One worker per logical CPU, or a single worker if that can't be queried.
pub fn default_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
