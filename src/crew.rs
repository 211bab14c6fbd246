//! Crew: an ordered set of tasks run by their agents under a process policy.
//!
//! Construction validates the wiring (agents resolve, names are unique,
//! context only looks backwards) so that a run can only fail on inputs,
//! model calls or output coercion.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use uuid::Uuid;

use crate::agent::AgentSpec;
use crate::crews::crew_output::CrewOutput;
use crate::crews::crew_run::CrewRun;
use crate::process::Process;
use crate::task::TaskSpec;
use crate::tasks::task_output::TaskOutput;
use crate::utilities::converter::{Converter, JsonConverter};
use crate::utilities::errors::{ConfigError, CrewError, KickoffError};
use crate::utilities::schema::StructuredOutput;

/// Callback invoked after each task completes.
pub type TaskCallback = Arc<dyn Fn(&TaskOutput) + Send + Sync>;

/// A group of agents and the tasks they perform, in order.
#[derive(Clone)]
pub struct Crew {
    /// Unique identifier for the crew instance.
    pub id: Uuid,
    /// Name used in logs.
    pub name: String,
    /// Indicates the verbosity level for logging during execution.
    pub verbose: bool,
    pub(crate) process: Process,
    pub(crate) agents: Vec<Arc<AgentSpec>>,
    pub(crate) tasks: Vec<TaskSpec>,
    pub(crate) converter: Arc<dyn Converter>,
    pub(crate) task_callback: Option<TaskCallback>,
    pub(crate) cancellation: Option<Arc<AtomicBool>>,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("process", &self.process)
            .field("agents", &self.agents)
            .field("tasks", &self.tasks)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl Crew {
    /// Create a sequential crew.
    ///
    /// Fails when there are no tasks, when agent or task names repeat, when
    /// a task's agent is not one of `agents`, or when a task takes context
    /// from a task that does not run before it.
    pub fn new(agents: Vec<Arc<AgentSpec>>, tasks: Vec<TaskSpec>) -> Result<Self, CrewError> {
        if tasks.is_empty() {
            return Err(ConfigError::NoTasks.into());
        }

        let mut agent_names = HashSet::new();
        for agent in &agents {
            if !agent_names.insert(agent.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "agent",
                    name: agent.name.clone(),
                }
                .into());
            }
        }

        let mut earlier: HashSet<&str> = HashSet::new();
        for task in &tasks {
            if !agents.iter().any(|a| Arc::ptr_eq(a, &task.agent)) {
                return Err(CrewError::UnresolvedAgent {
                    task: task.name.clone(),
                    agent: task.agent.name.clone(),
                });
            }
            if let Some(ref context) = task.context {
                if let Some(reference) = context.iter().find(|r| !earlier.contains(r.as_str())) {
                    return Err(ConfigError::InvalidContext {
                        task: task.name.clone(),
                        reference: reference.clone(),
                    }
                    .into());
                }
            }
            if !earlier.insert(task.name.as_str()) {
                return Err(ConfigError::Duplicate {
                    kind: "task",
                    name: task.name.clone(),
                }
                .into());
            }
        }

        log::debug!(
            "Built crew with {} agent(s) and {} task(s): {}",
            agents.len(),
            tasks.len(),
            tasks.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(" -> ")
        );

        Ok(Self {
            id: Uuid::new_v4(),
            name: "crew".to_string(),
            verbose: false,
            process: Process::Sequential,
            agents,
            tasks,
            converter: Arc::new(JsonConverter),
            task_callback: None,
            cancellation: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Replace the output coercion capability (defaults to [`JsonConverter`]).
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    /// Call `callback` with each task output as soon as the task completes.
    pub fn with_task_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TaskOutput) + Send + Sync + 'static,
    {
        self.task_callback = Some(Arc::new(callback));
        self
    }

    /// Check `flag` before each task; once set, the run stops with
    /// [`CrewError::Cancelled`]. A model call already in flight finishes.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn process(&self) -> Process {
        self.process
    }

    pub fn agents(&self) -> &[Arc<AgentSpec>] {
        &self.agents
    }

    /// Tasks in execution order.
    pub fn tasks(&self) -> &[TaskSpec] {
        &self.tasks
    }

    /// Execute the crew's tasks and return the final output.
    ///
    /// Blocks until every task has finished or the first one fails.
    pub fn kickoff(&self, inputs: &HashMap<String, String>) -> Result<CrewOutput, KickoffError> {
        CrewRun::new(self).execute(inputs)
    }

    /// Execute the crew and convert the final task's result into `T`.
    pub fn run<T: StructuredOutput>(&self, inputs: &HashMap<String, String>) -> Result<T, KickoffError> {
        let output = self.kickoff(inputs)?;
        output.into_typed::<T>().map_err(|e| {
            let index = self.tasks.len() - 1;
            KickoffError::new(index, &self.tasks[index].name, CrewError::OutputSchema(e))
        })
    }

    /// Run [`Crew::kickoff`] on the blocking thread pool.
    pub async fn kickoff_async(&self, inputs: HashMap<String, String>) -> Result<CrewOutput, KickoffError> {
        let crew = self.clone();
        match tokio::task::spawn_blocking(move || crew.kickoff(&inputs)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(KickoffError::new(0, &self.tasks[0].name, CrewError::Cancelled)),
        }
    }
}

impl fmt::Display for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Crew(id={}, process={}, number_of_agents={}, number_of_tasks={})",
            self.id,
            self.process,
            self.agents.len(),
            self.tasks.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    use crate::llms::testing::{Reply, ScriptedLLM};
    use crate::types::CandidateScore;
    use crate::utilities::config::{ConfigTable, TableKind};
    use crate::utilities::errors::ErrorKind;

    const AGENTS: &str = r#"
hr_evaluation_agent:
  role: Senior HR Evaluation Expert
  goal: Score candidates against job descriptions
  backstory: You have evaluated thousands of candidates.
"#;

    const TASKS: &str = r#"
evaluate_candidate:
  description: Evaluate candidate {candidate_id} ({name}).
  expected_output: A score from 1 to 100 and a reason.
  agent: hr_evaluation_agent
summarize:
  description: Summarize the evaluation.
  expected_output: One paragraph.
  agent: hr_evaluation_agent
  context: [evaluate_candidate]
lost:
  description: Nobody can run this.
  expected_output: Nothing.
  agent: missing_agent
"#;

    const GOOD: &str = r#"{"id": "c-42", "score": 87, "reason": "Strong Rust background"}"#;

    fn inputs() -> HashMap<String, String> {
        HashMap::from([
            ("candidate_id".to_string(), "c-42".to_string()),
            ("name".to_string(), "Ada".to_string()),
        ])
    }

    fn agent(llm: Arc<ScriptedLLM>) -> Arc<AgentSpec> {
        let table = ConfigTable::from_yaml_str(TableKind::Agents, AGENTS).unwrap();
        Arc::new(AgentSpec::from_config(&table, "hr_evaluation_agent", llm).unwrap())
    }

    fn tasks() -> ConfigTable {
        ConfigTable::from_yaml_str(TableKind::Tasks, TASKS).unwrap()
    }

    fn scoring_crew(llm: Arc<ScriptedLLM>) -> Crew {
        let agents = vec![agent(llm)];
        let task = TaskSpec::structured::<CandidateScore>(&tasks(), "evaluate_candidate", &agents).unwrap();
        Crew::new(agents, vec![task]).unwrap()
    }

    #[test]
    fn test_construction_keeps_declared_order() {
        let agents = vec![agent(Arc::new(ScriptedLLM::replying(GOOD)))];
        let first = TaskSpec::from_config(&tasks(), "evaluate_candidate", &agents).unwrap();
        let second = TaskSpec::from_config(&tasks(), "summarize", &agents).unwrap();
        let crew = Crew::new(agents, vec![first, second]).unwrap();
        let names: Vec<&str> = crew.tasks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["evaluate_candidate", "summarize"]);
        assert_eq!(crew.process(), Process::Sequential);
    }

    #[test]
    fn test_unresolved_agent_makes_no_calls() {
        let llm = Arc::new(ScriptedLLM::replying(GOOD));
        let agents = vec![agent(llm.clone())];
        let err = TaskSpec::from_config(&tasks(), "lost", &agents).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedAgent);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_task_bound_to_foreign_agent_is_rejected() {
        let ours = agent(Arc::new(ScriptedLLM::replying(GOOD)));
        let foreign = Arc::new(AgentSpec::new("other", "r", "g", "b", Arc::new(ScriptedLLM::replying(GOOD))));
        let task = TaskSpec::new("t", "d", "e", foreign);
        let err = Crew::new(vec![ours], vec![task]).unwrap_err();
        assert!(matches!(err, CrewError::UnresolvedAgent { ref agent, .. } if agent == "other"));
    }

    #[test]
    fn test_task_bound_to_same_named_foreign_agent_is_rejected() {
        let ours_llm = Arc::new(ScriptedLLM::replying(GOOD));
        let foreign_llm = Arc::new(ScriptedLLM::replying("foreign"));
        let ours = Arc::new(AgentSpec::new("hr", "r", "g", "b", ours_llm.clone()));
        let foreign = Arc::new(AgentSpec::new("hr", "r", "g", "b", foreign_llm.clone()));
        let task = TaskSpec::new("t", "d", "e", foreign);

        let err = Crew::new(vec![ours], vec![task]).unwrap_err();
        assert!(matches!(err, CrewError::UnresolvedAgent { ref agent, .. } if agent == "hr"));
        assert_eq!(ours_llm.calls(), 0);
        assert_eq!(foreign_llm.calls(), 0);
    }

    #[test]
    fn test_construction_rejects_bad_wiring() {
        let a = agent(Arc::new(ScriptedLLM::replying(GOOD)));
        assert!(matches!(
            Crew::new(vec![a.clone()], Vec::new()),
            Err(CrewError::Config(ConfigError::NoTasks))
        ));

        let dup = vec![
            TaskSpec::new("t", "d", "e", a.clone()),
            TaskSpec::new("t", "d", "e", a.clone()),
        ];
        assert!(matches!(
            Crew::new(vec![a.clone()], dup),
            Err(CrewError::Config(ConfigError::Duplicate { kind: "task", .. }))
        ));

        assert!(matches!(
            Crew::new(vec![a.clone(), a.clone()], vec![TaskSpec::new("t", "d", "e", a.clone())]),
            Err(CrewError::Config(ConfigError::Duplicate { kind: "agent", .. }))
        ));

        let forward = vec![
            TaskSpec::new("first", "d", "e", a.clone()).with_context(["second"]),
            TaskSpec::new("second", "d", "e", a.clone()),
        ];
        assert!(matches!(
            Crew::new(vec![a], forward),
            Err(CrewError::Config(ConfigError::InvalidContext { .. }))
        ));
    }

    #[test]
    fn test_run_returns_coerced_record() {
        let llm = Arc::new(ScriptedLLM::replying(GOOD));
        let crew = scoring_crew(llm.clone());
        let score: CandidateScore = crew.run(&inputs()).unwrap();
        assert_eq!(
            score,
            CandidateScore {
                id: "c-42".to_string(),
                score: 87,
                reason: "Strong Rust background".to_string(),
            }
        );
        assert_eq!(llm.calls(), 1);
        let prompt = &llm.prompts()[0].0;
        assert!(prompt.contains("Evaluate candidate c-42 (Ada)."));
        assert!(prompt.contains("CandidateScore"));
    }

    #[test]
    fn test_missing_score_is_output_schema_error() {
        let llm = Arc::new(ScriptedLLM::replying(r#"{"id": "c-42", "reason": "forgot the score"}"#));
        let crew = scoring_crew(llm);
        let err = crew.run::<CandidateScore>(&inputs()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutputSchema);
        assert_eq!(err.task_index, 0);
        assert_eq!(err.task_name, "evaluate_candidate");
    }

    #[test]
    fn test_invocation_failure_halts_later_tasks() {
        let first = Arc::new(ScriptedLLM::failing("connection refused"));
        let second = Arc::new(ScriptedLLM::replying("never"));
        let a = Arc::new(AgentSpec::new("screener", "Screener", "Screen", "b", first.clone()));
        let b = Arc::new(AgentSpec::new("writer", "Writer", "Write", "b", second.clone()));
        let crew = Crew::new(
            vec![a.clone(), b.clone()],
            vec![
                TaskSpec::new("screen", "Screen", "Notes", a),
                TaskSpec::new("write", "Write", "Report", b),
            ],
        )
        .unwrap();

        let err = crew.kickoff(&HashMap::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invocation);
        assert_eq!(err.task_index, 0);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[test]
    fn test_runs_are_idempotent_with_deterministic_stub() {
        let crew = scoring_crew(Arc::new(ScriptedLLM::replying(GOOD)));
        let first: CandidateScore = crew.run(&inputs()).unwrap();
        let second: CandidateScore = crew.run(&inputs()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_input_fails_before_model_call() {
        let llm = Arc::new(ScriptedLLM::replying(GOOD));
        let crew = scoring_crew(llm.clone());
        let partial = HashMap::from([("candidate_id".to_string(), "c-42".to_string())]);
        let err = crew.kickoff(&partial).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.task_index, 0);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_explicit_context_is_folded_in() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            Reply::Text(GOOD.to_string()),
            Reply::Text("Ada is a strong match.".to_string()),
        ]));
        let agents = vec![agent(llm.clone())];
        let evaluate = TaskSpec::structured::<CandidateScore>(&tasks(), "evaluate_candidate", &agents).unwrap();
        let summarize = TaskSpec::from_config(&tasks(), "summarize", &agents).unwrap();
        let crew = Crew::new(agents, vec![evaluate, summarize]).unwrap();

        let output = crew.kickoff(&inputs()).unwrap();
        assert_eq!(output.raw, "Ada is a strong match.");
        assert!(output.structured.is_none());
        assert_eq!(output.tasks_output.len(), 2);
        assert_eq!(llm.prompts()[1].1.as_deref(), Some(GOOD));
    }

    #[test]
    fn test_run_fails_when_final_task_is_raw() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            Reply::Text(GOOD.to_string()),
            Reply::Text("Ada is a strong match.".to_string()),
        ]));
        let agents = vec![agent(llm)];
        let evaluate = TaskSpec::structured::<CandidateScore>(&tasks(), "evaluate_candidate", &agents).unwrap();
        let summarize = TaskSpec::from_config(&tasks(), "summarize", &agents).unwrap();
        let crew = Crew::new(agents, vec![evaluate, summarize]).unwrap();

        let err = crew.run::<CandidateScore>(&inputs()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutputSchema);
        assert_eq!(err.task_index, 1);
        assert_eq!(err.task_name, "summarize");
    }

    #[test]
    fn test_cancelled_before_start() {
        let llm = Arc::new(ScriptedLLM::replying(GOOD));
        let flag = Arc::new(AtomicBool::new(true));
        let crew = scoring_crew(llm.clone()).with_cancellation(flag.clone());
        let err = crew.kickoff(&inputs()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.task_index, 0);
        assert_eq!(llm.calls(), 0);

        flag.store(false, Ordering::SeqCst);
        assert!(crew.kickoff(&inputs()).is_ok());
    }

    #[test]
    fn test_task_callback_sees_each_output() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let crew = scoring_crew(Arc::new(ScriptedLLM::replying(GOOD)))
            .verbose(true)
            .with_task_callback(move |output| sink.lock().unwrap().push(output.task_name.clone()));
        crew.kickoff(&inputs()).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["evaluate_candidate".to_string()]);
    }

    #[test]
    fn test_custom_converter() {
        #[derive(Debug)]
        struct Fixed;
        impl Converter for Fixed {
            fn coerce(
                &self,
                _raw: &str,
                _schema: &crate::utilities::schema::OutputSchema,
            ) -> Result<serde_json::Value, crate::utilities::converter::ConverterError> {
                Ok(serde_json::json!({"id": "fixed", "score": 1, "reason": "stub"}))
            }
        }
        let crew = scoring_crew(Arc::new(ScriptedLLM::replying("not json at all"))).with_converter(Arc::new(Fixed));
        let score: CandidateScore = crew.run(&inputs()).unwrap();
        assert_eq!(score.id, "fixed");
    }

    #[tokio::test]
    async fn test_kickoff_async() {
        let crew = scoring_crew(Arc::new(ScriptedLLM::replying(GOOD)));
        let output = crew.kickoff_async(inputs()).await.unwrap();
        let score: CandidateScore = output.into_typed().unwrap();
        assert_eq!(score.score, 87);
    }

    #[test]
    fn test_display() {
        let crew = scoring_crew(Arc::new(ScriptedLLM::replying(GOOD)));
        let text = crew.to_string();
        assert!(text.contains("process=sequential"));
        assert!(text.contains("number_of_tasks=1"));
    }
}
