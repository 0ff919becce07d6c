use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use serde_json::Value;
use tokio::time::Instant;

use crate::{
    error::{ConfigError, NavigationError, TransportError, WorkflowError},
    recorder::{OutcomeRecorder, RequestOutcome},
};

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP capability workflows need: a plain GET.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dspace-load/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }
}

/// Everything one workflow iteration needs to talk to the repository.
///
/// Each request goes through [`Session::get`], which times it and hands a
/// [`RequestOutcome`] to the shared recorder before returning.
pub struct Session<T> {
    transport: T,
    recorder: Arc<OutcomeRecorder>,
    base_url: String,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, recorder: Arc<OutcomeRecorder>, base_url: &str) -> Self {
        Self {
            transport,
            recorder,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for a path on the repository host.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `url`, record the outcome under `name`, and return the body.
    /// Non-2xx responses are failures.
    pub async fn get(&self, url: &str, name: &str) -> Result<Vec<u8>, TransportError> {
        let start_time = Utc::now();
        let started = Instant::now();
        let (bytes, result) = settle(self.transport.get(url).await);
        let error = result.as_ref().err().map(ToString::to_string);
        self.recorder.record(&RequestOutcome {
            request_type: "GET",
            name: name.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
            bytes,
            error,
            start_time,
            url: url.to_string(),
        });
        result
    }

    /// Like [`Session::get`], with the body parsed as JSON.
    pub async fn get_json(&self, url: &str, name: &str) -> Result<Value, WorkflowError> {
        let body = self.get(url, name).await?;
        serde_json::from_slice(&body)
            .map_err(NavigationError::from)
            .map_err(WorkflowError::from)
    }
}

/// Body length received and the request's verdict. Non-2xx responses are
/// failures but still count the bytes they carried.
fn settle(response: Result<RawResponse, TransportError>) -> (usize, Result<Vec<u8>, TransportError>) {
    match response {
        Ok(response) => {
            let bytes = response.body.len();
            if response.is_success() {
                (bytes, Ok(response.body))
            } else {
                (
                    bytes,
                    Err(TransportError::Status {
                        status: response.status,
                    }),
                )
            }
        }
        Err(e) => (0, Err(e)),
    }
}
