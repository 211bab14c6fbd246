//! Agent definitions.
//!
//! An [`AgentSpec`] is a named role description plus the model capability
//! that answers on its behalf. It holds no mutable state, so one spec can be
//! shared by every task bound to it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::llms::base_llm::BaseLLM;
use crate::utilities::config::ConfigTable;
use crate::utilities::errors::{ConfigError, InvocationError};
use crate::utilities::string_utils::interpolate_only;

/// A named role bound to a model-invocation capability.
#[derive(Clone)]
pub struct AgentSpec {
    /// Unique key of the agent within a crew.
    pub name: String,
    /// Role of the agent.
    pub role: String,
    /// Objective of the agent.
    pub goal: String,
    /// Backstory of the agent.
    pub backstory: String,
    /// Log task start and final answers at info level.
    pub verbose: bool,
    llm: Arc<dyn BaseLLM>,
}

impl fmt::Debug for AgentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpec")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("verbose", &self.verbose)
            .field("llm", &self.llm.model())
            .finish_non_exhaustive()
    }
}

impl AgentSpec {
    /// Create an agent from explicit fields.
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Arc<dyn BaseLLM>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            verbose: false,
            llm,
        }
    }

    /// Build the agent stored under `name` in an agent configuration table.
    ///
    /// `role`, `goal` and `backstory` are required; `verbose` is optional
    /// and defaults to false.
    pub fn from_config(
        config: &ConfigTable,
        name: &str,
        llm: Arc<dyn BaseLLM>,
    ) -> Result<Self, ConfigError> {
        let entry = config.entry(name)?;
        let agent = Self {
            name: name.to_string(),
            role: entry.require_str("role")?,
            goal: entry.require_str("goal")?,
            backstory: entry.require_str("backstory")?,
            verbose: entry.optional_bool("verbose")?.unwrap_or(false),
            llm,
        };
        log::debug!("Loaded agent '{}' (role: {})", agent.name, agent.role);
        Ok(agent)
    }

    /// Override verbosity.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn llm(&self) -> &Arc<dyn BaseLLM> {
        &self.llm
    }

    /// A copy of this agent with kickoff inputs interpolated into its text.
    pub fn interpolated(&self, inputs: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            role: interpolate_only(&self.role, inputs, &self.name)?,
            goal: interpolate_only(&self.goal, inputs, &self.name)?,
            backstory: interpolate_only(&self.backstory, inputs, &self.name)?,
            ..self.clone()
        })
    }

    /// Role preamble placed before every task prompt.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }

    /// Run one task prompt through the agent's model.
    pub fn execute_task(&self, task_prompt: &str, context: Option<&str>) -> Result<String, InvocationError> {
        let instructions = format!("{}\n\n{}", self.system_prompt(), task_prompt);
        if self.verbose {
            log::info!("Agent '{}' ({}) started task", self.name, self.role);
        }
        log::debug!(
            "Agent '{}' calling {} model '{}'",
            self.name,
            self.llm.provider(),
            self.llm.model()
        );

        let answer = self.llm.call(&instructions, context)?;

        if self.verbose {
            log::info!("Agent '{}' final answer:\n{}", self.name, answer);
        }
        Ok(answer)
    }
}
