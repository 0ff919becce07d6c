use std::io;

use thiserror::Error;

/// Fatal, startup-time errors. Any of these stops the run before a single
/// request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown workflow `{name}` (known workflows: {known})")]
    UnknownWorkflow { name: String, known: String },

    #[error("empty workflow name in task list `{tasks}`")]
    EmptyTaskName { tasks: String },

    #[error("cannot open log file {path}: {source}")]
    LogSink {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot install log subscriber: {0}")]
    Subscriber(String),

    #[error("cannot build HTTP client: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A response did not have the shape a workflow step expected.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("missing key `{segment}` while reading `{path}`")]
    Missing { path: String, segment: String },

    #[error("expected {expected} at `{path}`, found {found}")]
    Mismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("response body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Network or HTTP-level failure of a single request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(error.to_string())
        }
    }
}

/// Everything that can cut one workflow iteration short. None of these are
/// fatal to the simulated user.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("no {0} to choose from")]
    EmptyChoice(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WorkflowError {
    pub fn reason(&self) -> AbortReason {
        match self {
            WorkflowError::Navigation(_) => AbortReason::Navigation,
            WorkflowError::EmptyChoice(_) => AbortReason::EmptyChoice,
            WorkflowError::Transport(_) => AbortReason::Transport,
        }
    }
}

/// Coarse classification of an aborted iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Navigation,
    EmptyChoice,
    Transport,
}

/// Failure to append a line to the log sink.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("log sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("log sink lock poisoned")]
    Poisoned,
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("no simulated user or governor is listening for the start signal")]
    Start,
}
