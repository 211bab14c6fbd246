//! Execution context of a single sequential crew run.
//!
//! A [`CrewRun`] walks the crew's tasks in order and keeps the per-task
//! outputs only for as long as the run lasts. State moves
//! `Pending -> Running(i) -> Running(i + 1) | Failed(i) | Completed`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::crew::Crew;
use crate::crews::crew_output::CrewOutput;
use crate::task::TaskSpec;
use crate::tasks::task_output::TaskOutput;
use crate::utilities::errors::{ConfigError, CrewError, ErrorKind, KickoffError};

/// Separator between earlier task outputs folded into a task's context.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running { task_index: usize },
    Completed,
    Failed { task_index: usize, kind: ErrorKind },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Pending => write!(f, "pending"),
            RunState::Running { task_index } => write!(f, "running(task {})", task_index),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed { task_index, kind } => {
                write!(f, "failed(task {}, {})", task_index, kind)
            }
        }
    }
}

/// One execution of a crew.
pub struct CrewRun<'c> {
    crew: &'c Crew,
    id: Uuid,
    state: RunState,
    outputs: Vec<TaskOutput>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl<'c> CrewRun<'c> {
    pub fn new(crew: &'c Crew) -> Self {
        Self {
            crew,
            id: Uuid::new_v4(),
            state: RunState::Pending,
            outputs: Vec::new(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Outputs of the tasks that have completed so far.
    pub fn outputs(&self) -> &[TaskOutput] {
        &self.outputs
    }

    /// Wall-clock duration in seconds, once the run has finished.
    pub fn execution_duration(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    /// Execute every task in order and return the final task's output.
    ///
    /// Inputs are interpolated into every task before the first model call,
    /// so a missing input fails the run without invoking any agent. The
    /// first failure halts the run: later tasks never start and the outputs
    /// gathered so far are dropped. Executing a run that already finished
    /// starts over under a new id.
    pub fn execute(&mut self, inputs: &HashMap<String, String>) -> Result<CrewOutput, KickoffError> {
        if self.state != RunState::Pending {
            self.id = Uuid::new_v4();
            self.outputs.clear();
        }
        self.started_at = Some(Utc::now());
        self.finished_at = None;

        let crew = self.crew;
        if crew.verbose {
            log::info!(
                "Crew '{}' run {} starting {} task(s) ({} process)",
                crew.name,
                self.id,
                crew.tasks.len(),
                crew.process
            );
        }

        let mut prepared = Vec::with_capacity(crew.tasks.len());
        for (index, task) in crew.tasks.iter().enumerate() {
            match task.interpolated(inputs) {
                Ok(task) => prepared.push(task),
                Err(error) => return Err(self.fail(index, task, error.into())),
            }
        }

        for (index, task) in prepared.iter().enumerate() {
            self.state = RunState::Running { task_index: index };
            if let Err(error) = self.execute_task(index, task) {
                return Err(self.fail(index, task, error));
            }
        }

        self.finished_at = Some(Utc::now());
        match CrewOutput::from_tasks(self.id, std::mem::take(&mut self.outputs)) {
            Some(output) => {
                self.state = RunState::Completed;
                self.outputs = output.tasks_output.clone();
                if crew.verbose {
                    log::info!(
                        "Crew '{}' run {} completed in {:.3}s",
                        crew.name,
                        self.id,
                        self.execution_duration().unwrap_or_default()
                    );
                }
                Ok(output)
            }
            // A crew always has at least one task, so this is unreachable for
            // crews built through `Crew::new`.
            None => {
                let error = CrewError::Config(ConfigError::NoTasks);
                self.state = RunState::Failed {
                    task_index: 0,
                    kind: error.kind(),
                };
                Err(KickoffError::new(0, String::new(), error))
            }
        }
    }

    fn execute_task(&mut self, index: usize, task: &TaskSpec) -> Result<(), CrewError> {
        let crew = self.crew;
        if let Some(ref flag) = crew.cancellation {
            if flag.load(Ordering::SeqCst) {
                return Err(CrewError::Cancelled);
            }
        }

        let context = self.context_for(task);
        if crew.verbose {
            log::info!("Task {} '{}' started by agent '{}'", index, task.name, task.agent.name);
        }
        log::debug!("Task '{}' prompt:\n{}", task.name, task.prompt());

        let raw = task.agent.execute_task(&task.prompt(), context.as_deref())?;

        let structured = match task.output_schema {
            Some(ref schema) => Some(crew.converter.coerce(&raw, schema)?),
            None => None,
        };

        let output = TaskOutput::new(&task.name, &task.agent.name, &task.description, raw, structured);
        if let Some(ref callback) = crew.task_callback {
            callback(&output);
        }
        if crew.verbose {
            log::info!("Task {} '{}' completed", index, task.name);
        }
        self.outputs.push(output);
        Ok(())
    }

    /// Context for a task: the outputs it names, or every earlier output.
    fn context_for(&self, task: &TaskSpec) -> Option<String> {
        let raws: Vec<&str> = match task.context {
            Some(ref names) => names
                .iter()
                .filter_map(|name| self.outputs.iter().find(|o| &o.task_name == name))
                .map(|o| o.raw.as_str())
                .collect(),
            None => self.outputs.iter().map(|o| o.raw.as_str()).collect(),
        };
        if raws.is_empty() {
            None
        } else {
            Some(raws.join(CONTEXT_SEPARATOR))
        }
    }

    fn fail(&mut self, index: usize, task: &TaskSpec, error: CrewError) -> KickoffError {
        self.state = RunState::Failed {
            task_index: index,
            kind: error.kind(),
        };
        self.finished_at = Some(Utc::now());
        self.outputs.clear();
        log::error!(
            "Crew '{}' run {} failed at task {} '{}': {}",
            self.crew.name,
            self.id,
            index,
            task.name,
            error
        );
        KickoffError::new(index, &task.name, error)
    }
}

impl fmt::Debug for CrewRun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrewRun")
            .field("id", &self.id)
            .field("crew", &self.crew.name)
            .field("state", &self.state)
            .field("completed_tasks", &self.outputs.len())
            .finish()
    }
}
