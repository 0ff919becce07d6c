//! Per-request outcome classification.
//!
//! Every HTTP call made by a workflow produces one [`RequestOutcome`], which is
//! classified by error and latency and written to the shared [`LogSink`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{config::LogLevel, logging::LogSink};

pub const RECORDER_TARGET: &str = "dspace_load::recorder";

/// Latency above which a request is reported as a long request.
pub const LONG_REQUEST_MS: u64 = 20_000;
/// Latency above which a request is reported as taking at least a second.
pub const SLOW_REQUEST_MS: u64 = 1_000;

/// Telemetry for one completed HTTP call, successful or not.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub request_type: &'static str,
    pub name: String,
    pub elapsed_ms: u64,
    pub bytes: usize,
    pub error: Option<String>,
    pub start_time: DateTime<Utc>,
    pub url: String,
}

/// First matching rule wins: errors, then long requests, then slow ones.
pub fn classify(outcome: &RequestOutcome) -> (LogLevel, String) {
    let RequestOutcome {
        request_type,
        name,
        elapsed_ms,
        error,
        start_time,
        url,
        ..
    } = outcome;

    if let Some(error) = error {
        (
            LogLevel::Error,
            format!("FAILURE: {request_type} {name} {elapsed_ms} {error} at {start_time} for {url}"),
        )
    } else if *elapsed_ms > LONG_REQUEST_MS {
        (
            LogLevel::Warning,
            format!("Long Request: {name} took {elapsed_ms} for {url} at {start_time}"),
        )
    } else if *elapsed_ms > SLOW_REQUEST_MS {
        (
            LogLevel::Warning,
            format!("At least a second: {name} took {elapsed_ms} for {url} at {start_time}"),
        )
    } else {
        (
            LogLevel::Info,
            format!("Request: {request_type} {name} {elapsed_ms} for {url}."),
        )
    }
}

/// Shared, process-wide hook invoked after every request.
pub struct OutcomeRecorder {
    sink: Arc<LogSink>,
}

impl OutcomeRecorder {
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self { sink }
    }

    /// Never fails: a sink error is reported on stderr and the load test carries on.
    pub fn record(&self, outcome: &RequestOutcome) {
        let (level, message) = classify(outcome);
        if let Err(e) = self.sink.append(RECORDER_TARGET, level, &message) {
            eprintln!("Logging error: {e} for {}", outcome.url);
        }
    }
}
