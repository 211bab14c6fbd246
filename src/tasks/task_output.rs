//! Result of a single task execution.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw answer of a task plus its coerced structured value, if the task
/// declares an output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Name of the task.
    pub task_name: String,
    /// Name of the agent that executed the task.
    pub agent: String,
    /// Description of the task after input interpolation.
    pub description: String,
    /// Summary of the task (first ten words of the description).
    pub summary: String,
    /// Raw model output.
    pub raw: String,
    /// Output coerced into the task's schema.
    pub structured: Option<serde_json::Value>,
}

impl TaskOutput {
    pub fn new(
        task_name: impl Into<String>,
        agent: impl Into<String>,
        description: impl Into<String>,
        raw: impl Into<String>,
        structured: Option<serde_json::Value>,
    ) -> Self {
        let description = description.into();
        Self {
            task_name: task_name.into(),
            agent: agent.into(),
            summary: generate_summary(&description),
            description,
            raw: raw.into(),
            structured,
        }
    }
}

fn generate_summary(description: &str) -> String {
    let excerpt = description
        .split_whitespace()
        .take(10)
        .collect::<Vec<&str>>()
        .join(" ");
    format!("{}...", excerpt)
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.structured {
            Some(ref value) => write!(f, "{}", value),
            None => write!(f, "{}", self.raw),
        }
    }
}
