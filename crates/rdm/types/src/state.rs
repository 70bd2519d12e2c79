//! Test outcome states

use serde::{Deserialize, Serialize};

/// The state of one responder test
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestState {
    /// Not executed, either pending or skipped by the runner
    #[default]
    NotRun,
    Passed,
    Failed,
    /// The test itself is faulty (bad setup, unexpected exception in its body)
    Broken,
}

impl TestState {
    /// Whether the test reached a verdict
    pub fn is_terminal(self) -> bool {
        !matches!(self, TestState::NotRun)
    }
}

impl std::fmt::Display for TestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestState::NotRun => write!(f, "Not Run"),
            TestState::Passed => write!(f, "Passed"),
            TestState::Failed => write!(f, "Failed"),
            TestState::Broken => write!(f, "Broken"),
        }
    }
}
