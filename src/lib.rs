//! # lead-score
//!
//! A sequential agent crew that scores job-candidate leads.
//!
//! An [`AgentSpec`] (role, goal, backstory and a model capability) and a
//! [`TaskSpec`] (instructions plus a typed output schema) are built from
//! read-only configuration tables and composed into a [`Crew`]. Running the
//! crew invokes each task's agent in order, coerces the model answer into
//! the declared record and returns the final task's result.
//!
//! ```ignore
//! use std::sync::Arc;
//! use lead_score::{Candidate, LeadScoreCrew, OpenAICompletion};
//!
//! let llm = Arc::new(OpenAICompletion::new("gpt-4o-mini", None, None).with_json_mode(true));
//! let crew = LeadScoreCrew::new()?.crew(llm)?;
//! let candidate = Candidate { id: "1".into(), name: "Ada".into(), bio: "...".into() };
//! let score = LeadScoreCrew::score(&crew, &candidate, "Rust engineer", "")?;
//! ```

pub mod agent;
pub mod crew;
pub mod crews;
pub mod llms;
pub mod process;
pub mod project;
pub mod task;
pub mod tasks;
pub mod types;
pub mod utilities;

pub use agent::AgentSpec;
pub use crew::Crew;
pub use crews::{Candidate, CrewOutput, CrewRun, LeadScoreCrew, RunState};
pub use llms::{BaseLLM, OpenAICompletion};
pub use process::Process;
pub use project::CrewBase;
pub use task::TaskSpec;
pub use tasks::TaskOutput;
pub use types::CandidateScore;
pub use utilities::config::{ConfigTable, TableKind};
pub use utilities::converter::{Converter, ConverterError, JsonConverter};
pub use utilities::errors::{ConfigError, CrewError, ErrorKind, InvocationError, KickoffError};
pub use utilities::schema::{FieldKind, OutputSchema, StructuredOutput};
