use std::{future::Future, marker::PhantomData};

use typed_builder::TypedBuilder;

use crate::workflow::Iteration;

/// Named unit of work handed to an [`crate::Executor`].
///
/// `action` runs one workflow iteration for one simulated user. It is cloned
/// into every user task, so capture shared state behind an `Arc` rather than
/// building clients inside it.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<F, Fut>
where
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Iteration> + Send + 'static,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    #[builder(default, setter(skip))]
    output: PhantomData<fn() -> Fut>,
}
