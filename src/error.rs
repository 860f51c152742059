use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("worker pool initialization failed: {0}")]
    Initialization(String),

    #[error("task {index} timed out after {timeout:?}")]
    Timeout { index: usize, timeout: Duration },

    #[error("task {index} failed: {message}")]
    Workload { index: usize, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Error::Initialization(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn workload<S: Into<String>>(index: usize, msg: S) -> Self {
        Error::Workload {
            index,
            message: msg.into(),
        }
    }

    /// Attach a task index to an error raised by a workload.
    ///
    /// Errors that already carry an index are passed through unchanged.
    pub fn at_task(self, index: usize) -> Self {
        match self {
            Error::Workload { .. } | Error::Timeout { .. } => self,
            other => Error::workload(index, other.to_string()),
        }
    }

    /// Index of the task this error belongs to, if any.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            Error::Workload { index, .. } | Error::Timeout { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
