use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{error::AbortReason, workflow::Iteration};

/// Mergeable run summary.
///
/// Every user task keeps its own tally and the executor merges them once the
/// run is over, so `merge` must not depend on order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub iterations: u64,
    pub completed: u64,
    pub aborted: u64,
    pub elapsed_ms: u64,
    pub workflows: BTreeMap<String, WorkflowTally>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTally {
    pub completed: u64,
    pub navigation_aborts: u64,
    pub empty_choice_aborts: u64,
    pub transport_aborts: u64,
    pub elapsed_ms: u64,
}

impl WorkflowTally {
    fn merge(&mut self, other: &WorkflowTally) {
        self.completed += other.completed;
        self.navigation_aborts += other.navigation_aborts;
        self.empty_choice_aborts += other.empty_choice_aborts;
        self.transport_aborts += other.transport_aborts;
        self.elapsed_ms += other.elapsed_ms;
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume(&mut self, iteration: &Iteration) {
        let elapsed_ms = iteration.elapsed.as_millis() as u64;
        let entry = self
            .workflows
            .entry(iteration.workflow.name().to_string())
            .or_default();

        self.iterations += 1;
        self.elapsed_ms += elapsed_ms;
        entry.elapsed_ms += elapsed_ms;
        match iteration.aborted {
            None => {
                self.completed += 1;
                entry.completed += 1;
            }
            Some(reason) => {
                self.aborted += 1;
                match reason {
                    AbortReason::Navigation => entry.navigation_aborts += 1,
                    AbortReason::EmptyChoice => entry.empty_choice_aborts += 1,
                    AbortReason::Transport => entry.transport_aborts += 1,
                }
            }
        }
    }

    pub fn merge(&mut self, other: Tally) {
        self.iterations += other.iterations;
        self.completed += other.completed;
        self.aborted += other.aborted;
        self.elapsed_ms += other.elapsed_ms;
        for (name, tally) in other.workflows {
            self.workflows.entry(name).or_default().merge(&tally);
        }
    }
}
