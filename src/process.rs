//! Process policies for crew execution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a crew schedules its tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Process {
    /// Tasks are executed one after another in order.
    #[default]
    Sequential,
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Process::Sequential => write!(f, "sequential"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_name() {
        assert_eq!(serde_json::to_string(&Process::Sequential).unwrap(), "\"sequential\"");
        let parsed: Process = serde_json::from_str("\"sequential\"").unwrap();
        assert_eq!(parsed, Process::default());
    }
}
