// Operator Port (for testability)
// The discrimination loop never executes probes against the target;
// it shows them to a human and reads back the observed output.

use crate::error::{AppError, Result};

/// Operator input interface (allows scripting in tests)
pub trait Operator: Send {
    /// Present a probe for manual comparison against the system under
    /// test and read one line of observed output.
    fn observe(&mut self, probe: &str) -> Result<String>;
}

/// Scripted operator replaying a fixed answer sequence (tests)
pub struct ScriptedOperator {
    answers: std::collections::VecDeque<String>,
    pub probes_seen: Vec<String>,
}

impl ScriptedOperator {
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            probes_seen: Vec::new(),
        }
    }
}

impl Operator for ScriptedOperator {
    fn observe(&mut self, probe: &str) -> Result<String> {
        self.probes_seen.push(probe.to_string());
        self.answers.pop_front().ok_or(AppError::OperatorClosed)
    }
}
