use serde::{Deserialize, Serialize};

/// Result of validating one data file against a compiled schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidationOutcome {
    Success,
    Failure {
        message: String,
        line: Option<u64>,
        column: Option<u64>,
    },
}

impl ValidationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ValidationOutcome::Success)
    }
}
