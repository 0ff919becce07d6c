//! dspace-load: simulated user traffic against a DSpace repository REST API.
//!
//! Each simulated user repeatedly runs one of a small set of multi-step
//! workflows. A workflow fetches a listing, reads the next target out of the
//! response body (page totals, embedded collections, hypermedia links), picks
//! one of the candidates at random, and fetches that, until it reaches a leaf
//! such as a collection page or a bitstream download.
//!
//! # Architecture
//!
//! - [`navigator`]: typed accessors over the untyped JSON responses.
//! - [`Workflow`]: the workflow library, plus the [`workflow::Runner`] that
//!   picks and runs one iteration for a user.
//! - [`selector`]: turns the configured task list into the active workflows,
//!   failing fast on unknown names.
//! - [`OutcomeRecorder`]: called after every request, classifies it by error
//!   and latency and appends a line to the shared [`LogSink`].
//! - [`Executor`]: the engine. [`RateExecutor`] runs many users concurrently
//!   under a stage-driven token bucket and merges their [`Tally`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::{path::Path, sync::Arc, time::Duration};
//!
//! use dspace_load::{
//!     Executor, LogSink, OutcomeRecorder, RateExecutor, Scenario, Stage,
//!     config::LogLevel, selector, transport::{ReqwestTransport, Session},
//!     workflow::Runner,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sink = Arc::new(LogSink::open(Path::new("load.log"), LogLevel::Info)?);
//!     let recorder = Arc::new(OutcomeRecorder::new(sink));
//!     let transport = ReqwestTransport::new(Duration::from_secs(30))?;
//!     let session = Session::new(transport, recorder, "https://demo.dspace.org");
//!     let runner = Runner::new(session, selector::resolve("lookup_authors")?);
//!
//!     let tally = RateExecutor::builder()
//!         .stages(vec![
//!             Stage::new(Duration::from_secs(10), 5.0),
//!             Stage::new(Duration::from_secs(60), 5.0),
//!         ])
//!         .users(8)
//!         .build()
//!         .exec(
//!             &Scenario::builder()
//!                 .name("authors")
//!                 .action(move || {
//!                     let runner = runner.clone();
//!                     async move { runner.run_once().await }
//!                 })
//!                 .build(),
//!         )
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&tally)?);
//!     Ok(())
//! }
//! ```

/// Command line and environment configuration
pub mod config;
/// Error taxonomy
pub mod error;
/// Engines that run simulated users
pub mod executor;
/// Log sink and `tracing` integration
pub mod logging;
/// JSON response navigation
pub mod navigator;
/// Per-request outcome classification
pub mod recorder;
/// Named unit of work handed to an executor
pub mod scenario;
/// Workflow selection from the task list
pub mod selector;
/// Mergeable run summary
pub mod tally;
/// HTTP transport and timed sessions
pub mod transport;
/// The workflow library
pub mod workflow;

#[cfg(test)]
mod testing;

pub use executor::{Executor, RateExecutor, Stage};
pub use logging::LogSink;
pub use recorder::{OutcomeRecorder, RequestOutcome};
pub use scenario::Scenario;
pub use tally::Tally;
pub use workflow::Workflow;
