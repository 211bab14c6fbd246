//! Lead score crew: one HR evaluation agent scoring one candidate.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crew::Crew;
use crate::llms::base_llm::BaseLLM;
use crate::project::CrewBase;
use crate::types::CandidateScore;
use crate::utilities::config::{ConfigTable, TableKind};
use crate::utilities::errors::{ConfigError, CrewError, KickoffError};

/// Agent configuration shipped with the crate.
pub const AGENTS_YAML: &str = include_str!("../../config/lead_score_crew/agents.yaml");
/// Task configuration shipped with the crate.
pub const TASKS_YAML: &str = include_str!("../../config/lead_score_crew/tasks.yaml");

pub const HR_EVALUATION_AGENT: &str = "hr_evaluation_agent";
pub const EVALUATE_CANDIDATE_TASK: &str = "evaluate_candidate";

/// A candidate lead to be scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub bio: String,
}

/// Binds the lead score agent and task configuration to a crew.
#[derive(Debug, Clone)]
pub struct LeadScoreCrew {
    agents_config: ConfigTable,
    tasks_config: ConfigTable,
}

impl LeadScoreCrew {
    /// Use the configuration embedded in the crate.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            agents_config: ConfigTable::from_yaml_str(TableKind::Agents, AGENTS_YAML)?,
            tasks_config: ConfigTable::from_yaml_str(TableKind::Tasks, TASKS_YAML)?,
        })
    }

    /// Load the configuration from files instead.
    pub fn from_paths(agents_path: impl AsRef<Path>, tasks_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self {
            agents_config: ConfigTable::from_path(TableKind::Agents, agents_path)?,
            tasks_config: ConfigTable::from_path(TableKind::Tasks, tasks_path)?,
        })
    }

    /// Creates the lead score crew, with the HR agent answering through `llm`.
    pub fn crew(&self, llm: Arc<dyn BaseLLM>) -> Result<Crew, CrewError> {
        CrewBase::new(self.agents_config.clone(), self.tasks_config.clone())
            .agent(HR_EVALUATION_AGENT, llm, true)?
            .structured_task::<CandidateScore>(EVALUATE_CANDIDATE_TASK)?
            .verbose(true)
            .crew()
            .map(|crew| crew.with_name("lead_score_crew"))
    }

    /// Kickoff inputs for one candidate.
    pub fn inputs(
        candidate: &Candidate,
        job_description: &str,
        additional_instructions: &str,
    ) -> HashMap<String, String> {
        HashMap::from([
            ("candidate_id".to_string(), candidate.id.clone()),
            ("name".to_string(), candidate.name.clone()),
            ("bio".to_string(), candidate.bio.clone()),
            ("job_description".to_string(), job_description.to_string()),
            ("additional_instructions".to_string(), additional_instructions.to_string()),
        ])
    }

    /// Score one candidate with a crew built by [`LeadScoreCrew::crew`].
    pub fn score(
        crew: &Crew,
        candidate: &Candidate,
        job_description: &str,
        additional_instructions: &str,
    ) -> Result<CandidateScore, KickoffError> {
        crew.run(&Self::inputs(candidate, job_description, additional_instructions))
    }
}
