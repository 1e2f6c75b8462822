use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowTagError {
    // IO
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read flow log stream: {source}")]
    ReadStream {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Worker pool
    #[error("failed to spawn flow log worker: {source}")]
    SpawnWorker {
        #[source]
        source: std::io::Error,
    },

    #[error("flow log worker panicked")]
    WorkerPanicked,

    #[error("flow log processing did not finish within {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },
}

impl FlowTagError {
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }
}
