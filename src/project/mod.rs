//! Builder that binds agent and task configuration tables to a crew.
//!
//! Project crews declare which agents and tasks they use by name; the
//! prose comes from the tables, the output schema from the Rust type.
//!
//! ```ignore
//! let crew = CrewBase::from_yaml(AGENTS, TASKS)?
//!     .agent("hr_evaluation_agent", llm, true)?
//!     .structured_task::<CandidateScore>("evaluate_candidate")?
//!     .crew()?;
//! ```

use std::path::Path;
use std::sync::Arc;

use crate::agent::AgentSpec;
use crate::crew::Crew;
use crate::llms::base_llm::BaseLLM;
use crate::task::TaskSpec;
use crate::utilities::config::{ConfigTable, TableKind};
use crate::utilities::errors::{ConfigError, CrewError};
use crate::utilities::schema::StructuredOutput;

/// Collects agents and tasks from configuration in declaration order.
#[derive(Debug, Clone)]
pub struct CrewBase {
    agents_config: ConfigTable,
    tasks_config: ConfigTable,
    agents: Vec<Arc<AgentSpec>>,
    tasks: Vec<TaskSpec>,
    verbose: bool,
}

impl CrewBase {
    pub fn new(agents_config: ConfigTable, tasks_config: ConfigTable) -> Self {
        Self {
            agents_config,
            tasks_config,
            agents: Vec::new(),
            tasks: Vec::new(),
            verbose: false,
        }
    }

    /// Parse both tables from YAML text.
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(
            ConfigTable::from_yaml_str(TableKind::Agents, agents_yaml)?,
            ConfigTable::from_yaml_str(TableKind::Tasks, tasks_yaml)?,
        ))
    }

    /// Read both tables from YAML files.
    pub fn from_paths(agents_path: impl AsRef<Path>, tasks_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(
            ConfigTable::from_path(TableKind::Agents, agents_path)?,
            ConfigTable::from_path(TableKind::Tasks, tasks_path)?,
        ))
    }

    /// Add the agent configured under `name`, answering through `llm`.
    pub fn agent(mut self, name: &str, llm: Arc<dyn BaseLLM>, verbose: bool) -> Result<Self, ConfigError> {
        let agent = AgentSpec::from_config(&self.agents_config, name, llm)?.verbose(verbose);
        self.agents.push(Arc::new(agent));
        Ok(self)
    }

    /// Add the raw-text task configured under `name`. Its agent must
    /// already have been added.
    pub fn task(mut self, name: &str) -> Result<Self, CrewError> {
        let task = TaskSpec::from_config(&self.tasks_config, name, &self.agents)?;
        self.tasks.push(task);
        Ok(self)
    }

    /// Add the task configured under `name` with the output schema of `T`.
    pub fn structured_task<T: StructuredOutput>(mut self, name: &str) -> Result<Self, CrewError> {
        let task = TaskSpec::structured::<T>(&self.tasks_config, name, &self.agents)?;
        self.tasks.push(task);
        Ok(self)
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the sequential crew.
    pub fn crew(self) -> Result<Crew, CrewError> {
        Ok(Crew::new(self.agents, self.tasks)?.verbose(self.verbose))
    }
}
