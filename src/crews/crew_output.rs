//! Result of a completed crew run.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tasks::task_output::TaskOutput;
use crate::utilities::converter::ConverterError;

/// Output of a successful run: the final task's result plus every task
/// output in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Id of the run that produced this output.
    pub run_id: Uuid,
    /// Raw output of the final task.
    pub raw: String,
    /// Structured output of the final task, if it declared a schema.
    pub structured: Option<serde_json::Value>,
    /// Output of each task.
    pub tasks_output: Vec<TaskOutput>,
}

impl CrewOutput {
    /// Build from the task outputs of a run. Returns `None` when no task ran.
    pub fn from_tasks(run_id: Uuid, tasks_output: Vec<TaskOutput>) -> Option<Self> {
        let last = tasks_output.last()?;
        Some(Self {
            run_id,
            raw: last.raw.clone(),
            structured: last.structured.clone(),
            tasks_output,
        })
    }

    /// Convert the final structured value into a typed record.
    pub fn into_typed<T: DeserializeOwned>(&self) -> Result<T, ConverterError> {
        let schema = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_string();
        let value = self.structured.clone().ok_or_else(|| ConverterError::Deserialize {
            schema: schema.clone(),
            message: "the final task has no structured output".to_string(),
        })?;
        serde_json::from_value(value).map_err(|e| ConverterError::Deserialize {
            schema,
            message: e.to_string(),
        })
    }
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.structured {
            Some(ref value) => write!(f, "{}", value),
            None => write!(f, "{}", self.raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateScore;
    use serde_json::json;

    #[test]
    fn test_from_tasks_uses_last_output() {
        let outputs = vec![
            TaskOutput::new("research", "a", "d", "notes", None),
            TaskOutput::new("score", "a", "d", "raw", Some(json!({"id": "c", "score": 9, "reason": "r"}))),
        ];
        let output = CrewOutput::from_tasks(Uuid::new_v4(), outputs).unwrap();
        assert_eq!(output.raw, "raw");
        assert_eq!(output.tasks_output.len(), 2);
        let score: CandidateScore = output.into_typed().unwrap();
        assert_eq!(score.score, 9);
    }

    #[test]
    fn test_from_tasks_empty() {
        assert!(CrewOutput::from_tasks(Uuid::new_v4(), Vec::new()).is_none());
    }

    #[test]
    fn test_into_typed_without_structured_output() {
        let outputs = vec![TaskOutput::new("t", "a", "d", "plain", None)];
        let output = CrewOutput::from_tasks(Uuid::new_v4(), outputs).unwrap();
        let err = output.into_typed::<CandidateScore>().unwrap_err();
        assert!(matches!(err, ConverterError::Deserialize { ref schema, .. } if schema == "CandidateScore"));
    }
}
