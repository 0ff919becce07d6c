//! Resolves the configured task list into the workflows the users will run.

use rand::Rng;

use crate::{config::DEFAULT_TASKS, error::ConfigError, workflow::Workflow};

/// Non-empty, ordered list of workflows chosen at startup.
///
/// Duplicates are kept: listing a workflow twice doubles its share of iterations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWorkflows {
    first: Workflow,
    rest: Vec<Workflow>,
}

impl ActiveWorkflows {
    pub fn iter(&self) -> impl Iterator<Item = Workflow> + '_ {
        std::iter::once(self.first).chain(self.rest.iter().copied())
    }

    fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Uniform pick of the workflow for the next iteration.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Workflow {
        match rng.gen_range(0..self.len()).checked_sub(1) {
            None => self.first,
            Some(i) => self.rest[i],
        }
    }
}

/// Parse a comma-separated task list. A blank list selects the default
/// workflow; any unknown or empty name fails the whole list.
pub fn resolve(tasks: &str) -> Result<ActiveWorkflows, ConfigError> {
    let tasks = tasks.trim();
    let tasks = if tasks.is_empty() { DEFAULT_TASKS } else { tasks };
    let empty_name = || ConfigError::EmptyTaskName {
        tasks: tasks.to_string(),
    };

    let workflows = tasks
        .split(',')
        .map(str::trim)
        .map(|name| {
            if name.is_empty() {
                Err(empty_name())
            } else {
                name.parse::<Workflow>()
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (first, rest) = workflows.split_first().ok_or_else(empty_name)?;
    Ok(ActiveWorkflows {
        first: *first,
        rest: rest.to_vec(),
    })
}
