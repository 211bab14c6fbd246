//! The record produced by the candidate evaluation task.

use serde::{Deserialize, Serialize};

use crate::utilities::schema::{FieldKind, OutputSchema, StructuredOutput};

/// Score assigned to one candidate, with the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Unique id of the candidate being scored.
    pub id: String,
    /// Fit score from 1 to 100.
    pub score: i64,
    /// Why the score was assigned.
    pub reason: String,
}

impl StructuredOutput for CandidateScore {
    fn schema() -> OutputSchema {
        OutputSchema::new("CandidateScore")
            .described_field("id", FieldKind::String, "The candidate's unique ID")
            .described_field("score", FieldKind::Integer, "A score between 1 and 100")
            .described_field(
                "reason",
                FieldKind::String,
                "Detailed reasoning covering skill match, experience, cultural fit and growth potential",
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::converter::{Converter, JsonConverter};

    #[test]
    fn test_schema_matches_struct_fields() {
        let schema = CandidateScore::schema();
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "score", "reason"]);

        let sample = CandidateScore {
            id: "c-1".to_string(),
            score: 87,
            reason: "Solid".to_string(),
        };
        let value = serde_json::to_value(&sample).unwrap();
        let coerced = JsonConverter.coerce(&value.to_string(), &schema).unwrap();
        let back: CandidateScore = serde_json::from_value(coerced).unwrap();
        assert_eq!(back, sample);
    }
}
