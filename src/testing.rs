//! Test doubles shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde_json::Value;

use crate::{
    config::LogLevel,
    error::TransportError,
    logging::{LogSink, SharedBuffer},
    recorder::OutcomeRecorder,
    transport::{RawResponse, Session, Transport},
};

/// Serves fixed bodies per URL and remembers every URL requested.
/// Unknown URLs answer 404.
#[derive(Clone, Default)]
pub(crate) struct CannedTransport {
    routes: Arc<HashMap<String, Vec<u8>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl CannedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_json(self, url: &str, body: Value) -> Self {
        self.with_body(url, body.to_string().as_bytes())
    }

    pub(crate) fn with_body(self, url: &str, body: &[u8]) -> Self {
        let mut routes = (*self.routes).clone();
        routes.insert(url.to_string(), body.to_vec());
        Self {
            routes: Arc::new(routes),
            calls: self.calls,
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for CannedTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());
        Ok(match self.routes.get(url) {
            Some(body) => RawResponse {
                status: 200,
                body: body.clone(),
            },
            None => RawResponse {
                status: 404,
                body: Vec::new(),
            },
        })
    }
}

/// A session whose recorder writes into an in-memory buffer at DEBUG level.
pub(crate) fn recording_session(
    transport: CannedTransport,
    base_url: &str,
) -> (Session<CannedTransport>, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let sink = Arc::new(LogSink::new(buffer.clone(), LogLevel::Debug));
    let recorder = Arc::new(OutcomeRecorder::new(sink));
    (Session::new(transport, recorder, base_url), buffer)
}
