//! Parallel flow log dispatcher.
//!
//! The calling thread reads the log one line at a time and pushes every line
//! onto an unbounded queue. A fixed pool of worker threads pulls lines off
//! the queue, classifies them and hands the result to a shared
//! [`ClassificationSink`], normally the [`FlowAggregator`].
//!
//! ```text
//! file
//!   -> reader (calling thread)
//!   -> line queue
//!   -> workers: classify_line -> ClassificationSink
//!   -> join barrier (bounded by PipelineConfig::timeout)
//! ```
//!
//! Lines are split on `\n` (a trailing `\r` is dropped) and decoded
//! lossily: bytes that aren't valid UTF-8 become U+FFFD and the line is still
//! classified. Only real I/O failures end the run.
//!
//! The join barrier is a zero-capacity channel nobody ever sends on. Each
//! worker owns a sender and drops it when it exits (normally or by
//! unwinding), so the receiver disconnects exactly when the last worker is
//! gone. Waiting on it with a deadline gives a bounded join.
//!
//! On timeout the run is abandoned: a cancellation flag stops workers from
//! taking more lines, and whatever was already recorded stays recorded.

use crate::aggregate::FlowAggregator;
use crate::classify::{Classification, classify_line};
use crate::config::PipelineConfig;
use crate::error::FlowTagError;
use crate::fields::{decode_lossy, raw_lines};
use crate::lookup::LookupTable;
use crate::protocol::ProtocolMap;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::convert::Infallible;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Lines handed to the worker pool.
    pub lines_read: u64,
    pub workers: usize,
    pub elapsed: Duration,
}

/// Receives every classification produced by the worker pool.
///
/// Called concurrently from all workers.
pub trait ClassificationSink: Send + Sync + 'static {
    fn accept(&self, classification: &Classification);
}

impl ClassificationSink for FlowAggregator {
    fn accept(&self, classification: &Classification) {
        self.apply(classification);
    }
}

pub struct Dispatcher<S = FlowAggregator> {
    lookup: Arc<LookupTable>,
    protocols: Arc<ProtocolMap>,
    sink: Arc<S>,
    config: PipelineConfig,
}

impl<S: ClassificationSink> Dispatcher<S> {
    pub fn new(
        lookup: Arc<LookupTable>,
        protocols: Arc<ProtocolMap>,
        sink: Arc<S>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            lookup,
            protocols,
            sink,
            config,
        }
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    /// Classify every line of the flow log at `path`.
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<DispatchSummary, FlowTagError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| FlowTagError::read_file(path, e))?;

        tracing::info!(path = %path.display(), "processing flow log");

        self.run(raw_lines(BufReader::new(file)))
            .map_err(|e| e.with_path(path))
    }

    /// Classify every line read from `reader`.
    pub fn run_reader<R: BufRead>(&self, reader: R) -> Result<DispatchSummary, FlowTagError> {
        self.run(raw_lines(reader))
            .map_err(RunError::into_stream_error)
    }

    fn run<I>(&self, lines: I) -> Result<DispatchSummary, RunError>
    where
        I: Iterator<Item = io::Result<Vec<u8>>>,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let workers = self.config.workers.get();

        tracing::debug!(
            workers,
            timeout_secs = self.config.timeout.as_secs_f64(),
            "starting worker pool"
        );

        let (line_tx, line_rx) = crossbeam_channel::unbounded::<String>();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<Infallible>(0);
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let worker = Worker {
                lines: line_rx.clone(),
                lookup: self.lookup.clone(),
                protocols: self.protocols.clone(),
                sink: self.sink.clone(),
                cancelled: cancelled.clone(),
                _done: done_tx.clone(),
            };

            let handle = thread::Builder::new()
                .name(format!("flowtag-worker-{id}"))
                .spawn(move || worker.run())
                .map_err(|source| {
                    cancelled.store(true, Ordering::Release);
                    RunError::Fatal(FlowTagError::SpawnWorker { source })
                })?;
            handles.push(handle);
        }
        drop(line_rx);
        drop(done_tx);

        let cancel = |err: RunError| {
            cancelled.store(true, Ordering::Release);
            err
        };

        let mut lines_read = 0u64;
        for line in lines {
            let line = line.map_err(|e| cancel(RunError::Read(e)))?;

            if Instant::now() >= deadline {
                tracing::warn!(lines_read, "flow log timeout reached while reading");
                return Err(cancel(self.timeout()));
            }

            // Every worker is gone, which only happens if they all panicked.
            if line_tx.send(decode_lossy(line)).is_err() {
                break;
            }
            lines_read += 1;
        }
        drop(line_tx);

        match done_rx.recv_deadline(deadline) {
            Ok(never) => match never {},
            Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    lines_read,
                    pending = handles.iter().filter(|h| !h.is_finished()).count(),
                    "flow log timeout reached waiting for workers"
                );
                return Err(cancel(self.timeout()));
            }
        }

        join_all(handles)?;

        let summary = DispatchSummary {
            lines_read,
            workers,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            lines_read,
            workers,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "flow log processed"
        );

        Ok(summary)
    }

    fn timeout(&self) -> RunError {
        RunError::Fatal(FlowTagError::Timeout {
            timeout: self.config.timeout,
        })
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) -> Result<(), RunError> {
    let mut panicked = false;
    for handle in handles {
        panicked |= handle.join().is_err();
    }

    if panicked {
        tracing::error!("flow log worker panicked");
        return Err(RunError::Fatal(FlowTagError::WorkerPanicked));
    }
    Ok(())
}

struct Worker<S> {
    lines: Receiver<String>,
    lookup: Arc<LookupTable>,
    protocols: Arc<ProtocolMap>,
    sink: Arc<S>,
    cancelled: Arc<AtomicBool>,

    // Dropped when the worker exits; see the module docs.
    _done: Sender<Infallible>,
}

impl<S: ClassificationSink> Worker<S> {
    fn run(self) {
        while !self.cancelled.load(Ordering::Acquire) {
            let Ok(line) = self.lines.recv() else {
                break;
            };

            let classification = classify_line(&line, &self.lookup, &self.protocols);
            self.sink.accept(&classification);
        }
    }
}

// Read errors don't know which file they came from until they reach the
// public entry points.
enum RunError {
    Read(io::Error),
    Fatal(FlowTagError),
}

impl RunError {
    fn with_path(self, path: &Path) -> FlowTagError {
        match self {
            Self::Read(e) => FlowTagError::read_file(path, e),
            Self::Fatal(e) => e,
        }
    }

    fn into_stream_error(self) -> FlowTagError {
        match self {
            Self::Read(source) => FlowTagError::ReadStream { source },
            Self::Fatal(e) => e,
        }
    }
}
