//! Executor: the engine that runs simulated users.
//!
//! An executor takes a [`Scenario`] and calls its action repeatedly from many
//! concurrent user tasks until the run is over, folding every [`Iteration`]
//! into a [`Tally`].
//!
//! The built-in [`RateExecutor`] paces iterations with a token-bucket governor
//! driven by a list of [`Stage`]s, each ramping linearly from the previous
//! rate to its own target.
pub mod rate;
pub use rate::{RateExecutor, Stage};

use std::future::Future;

use crate::{scenario::Scenario, tally::Tally, workflow::Iteration};

pub trait Executor<F, Fut>
where
    Self: Send + Sync + Sized,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Iteration> + Send + 'static,
{
    type Error;

    /// Run the scenario to completion and return the merged tally.
    fn exec(&self, scenario: &Scenario<F, Fut>) -> impl Future<Output = Result<Tally, Self::Error>> + Send;
}
