//! Task definitions.
//!
//! A [`TaskSpec`] is a named unit of work bound to exactly one agent. Prose
//! instructions come from configuration; the output schema comes from the
//! Rust record type the caller asks for.

use std::collections::HashMap;
use std::sync::Arc;

use crate::agent::AgentSpec;
use crate::utilities::config::ConfigTable;
use crate::utilities::errors::{ConfigError, CrewError};
use crate::utilities::schema::{OutputSchema, StructuredOutput};
use crate::utilities::string_utils::interpolate_only;

/// A unit of work bound to one agent.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    /// Unique key of the task within a crew.
    pub name: String,
    /// What the agent should do. May contain `{input}` placeholders.
    pub description: String,
    /// Definition of the expected outcome.
    pub expected_output: String,
    /// Agent responsible for execution.
    pub agent: Arc<AgentSpec>,
    /// Names of earlier tasks whose outputs are given as context. When
    /// `None`, every earlier task's output is used.
    pub context: Option<Vec<String>>,
    /// Schema the answer is coerced into; `None` keeps the raw text.
    pub output_schema: Option<OutputSchema>,
}

impl TaskSpec {
    /// Create a raw-text task from explicit fields.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Arc<AgentSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            context: None,
            output_schema: None,
        }
    }

    /// Build the task stored under `name` in a task configuration table.
    ///
    /// `description`, `expected_output` and `agent` are required; `context`
    /// is an optional list of task names. The `agent` name must be one of
    /// `agents`, otherwise the result is [`CrewError::UnresolvedAgent`].
    pub fn from_config(
        config: &ConfigTable,
        name: &str,
        agents: &[Arc<AgentSpec>],
    ) -> Result<Self, CrewError> {
        let entry = config.entry(name)?;
        let description = entry.require_str("description")?;
        let expected_output = entry.require_str("expected_output")?;
        let agent_name = entry.require_str("agent")?;
        let context = entry.optional_str_list("context")?;

        let agent = agents
            .iter()
            .find(|a| a.name == agent_name.trim())
            .cloned()
            .ok_or_else(|| CrewError::UnresolvedAgent {
                task: name.to_string(),
                agent: agent_name.trim().to_string(),
            })?;

        log::debug!("Loaded task '{}' bound to agent '{}'", name, agent.name);
        Ok(Self {
            name: name.to_string(),
            description,
            expected_output,
            agent,
            context,
            output_schema: None,
        })
    }

    /// Like [`TaskSpec::from_config`], with the output schema of `T`.
    pub fn structured<T: StructuredOutput>(
        config: &ConfigTable,
        name: &str,
        agents: &[Arc<AgentSpec>],
    ) -> Result<Self, CrewError> {
        Ok(Self::from_config(config, name, agents)?.with_output_schema(T::schema()))
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_context<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context = Some(tasks.into_iter().map(Into::into).collect());
        self
    }

    /// A copy with kickoff inputs interpolated into the task and its agent.
    pub fn interpolated(&self, inputs: &HashMap<String, String>) -> Result<Self, ConfigError> {
        if inputs.is_empty() {
            return Ok(self.clone());
        }
        Ok(Self {
            description: interpolate_only(&self.description, inputs, &self.name)?,
            expected_output: interpolate_only(&self.expected_output, inputs, &self.name)?,
            agent: Arc::new(self.agent.interpolated(inputs)?),
            ..self.clone()
        })
    }

    /// The task prompt: description, expected output and, for structured
    /// tasks, the schema the answer has to follow.
    pub fn prompt(&self) -> String {
        let mut slices = vec![
            format!("Current Task: {}", self.description),
            format!(
                "This is the expected criteria for your final answer: {}\n\
                 you MUST return the actual complete content as the final answer, not a summary.",
                self.expected_output
            ),
        ];
        if let Some(ref schema) = self.output_schema {
            slices.push(schema.prompt_instruction());
        }
        slices.join("\n\n")
    }
}
