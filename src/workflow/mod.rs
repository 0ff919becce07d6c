//! The workflow library: named, multi-step simulated-user behaviours.
//!
//! Each workflow is a chain of dependent requests in which the next URL is
//! read out of the previous response. Branch points draw uniformly from an
//! injected random source so tests can pin the sequence.

mod authors;
mod bitstreams;
mod collections;

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use tokio::time::Instant;

use crate::{
    error::{AbortReason, ConfigError, WorkflowError},
    selector::ActiveWorkflows,
    transport::{Session, Transport},
};

pub use authors::AUTHOR_PAGE_LIMIT;
pub use collections::draw_page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Workflow {
    /// `get_collections`: random collection listing page, then each collection's page.
    CollectionBrowse,
    /// `lookup_authors`: random author facet entry, then every item in their search results.
    AuthorLookup,
    /// `download_bitstreams`: author search, random item, bundle and bitstream, then download.
    BitstreamDownload,
}

impl Workflow {
    pub const ALL: [Workflow; 3] = [
        Workflow::CollectionBrowse,
        Workflow::AuthorLookup,
        Workflow::BitstreamDownload,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Workflow::CollectionBrowse => "get_collections",
            Workflow::AuthorLookup => "lookup_authors",
            Workflow::BitstreamDownload => "download_bitstreams",
        }
    }

    /// Run one iteration against `session`.
    pub async fn run<T, R>(self, session: &Session<T>, rng: &mut R) -> Result<(), WorkflowError>
    where
        T: Transport,
        R: Rng + Send,
    {
        match self {
            Workflow::CollectionBrowse => collections::browse(session, rng).await,
            Workflow::AuthorLookup => authors::lookup(session, rng).await,
            Workflow::BitstreamDownload => bitstreams::download(session, rng).await,
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Workflow {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Workflow::ALL
            .into_iter()
            .find(|w| w.name() == name)
            .ok_or_else(|| ConfigError::UnknownWorkflow {
                name: name.to_string(),
                known: Workflow::ALL.map(|w| w.name()).join(", "),
            })
    }
}

/// Uniform pick from `items`; an empty pool aborts the iteration.
pub(crate) fn choose<'a, T, R>(rng: &mut R, items: &'a [T], what: &'static str) -> Result<&'a T, WorkflowError>
where
    R: Rng + ?Sized,
{
    items.choose(rng).ok_or(WorkflowError::EmptyChoice(what))
}

/// Result of one workflow invocation by a simulated user.
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub workflow: Workflow,
    pub elapsed: Duration,
    pub aborted: Option<AbortReason>,
}

/// Picks and runs workflows on behalf of the simulated users.
pub struct Runner<T> {
    session: Session<T>,
    active: ActiveWorkflows,
}

impl<T: Transport> Runner<T> {
    pub fn new(session: Session<T>, active: ActiveWorkflows) -> Arc<Self> {
        Arc::new(Self { session, active })
    }

    pub async fn run_once(&self) -> Iteration {
        let mut rng = StdRng::from_entropy();
        self.run_once_with(&mut rng).await
    }

    /// One iteration of a uniformly chosen active workflow. Failures end the
    /// iteration, never the user.
    pub async fn run_once_with<R: Rng + Send>(&self, rng: &mut R) -> Iteration {
        let workflow = self.active.choose(rng);
        let started = Instant::now();
        let result = workflow.run(&self.session, rng).await;
        let elapsed = started.elapsed();

        let aborted = match result {
            Ok(()) => None,
            Err(e) => {
                match &e {
                    // Already recorded as a FAILURE line by the session.
                    WorkflowError::Transport(_) => {
                        tracing::debug!(workflow = workflow.name(), "iteration aborted: {e}")
                    }
                    _ => tracing::warn!(workflow = workflow.name(), "iteration aborted: {e}"),
                }
                Some(e.reason())
            }
        };

        Iteration {
            workflow,
            elapsed,
            aborted,
        }
    }
}
