//! What a run hands back to its caller

use crate::DrainReport;
use chrono::{DateTime, Utc};
use rdm_types::TestState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// One scheduled test, in execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    pub description: String,
    pub state: TestState,
    /// Time spent in the test body; zero if it did not run
    pub duration: Duration,
    /// Why the runner skipped the test, if it did
    pub skip_reason: Option<String>,
    pub warnings: Vec<String>,
    /// Queued-message drain that preceded the test
    pub drain: Option<DrainReport>,
}

impl TestRecord {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            state: TestState::NotRun,
            duration: Duration::ZERO,
            skip_reason: None,
            warnings: Vec::new(),
            drain: None,
        }
    }

    pub fn was_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }

    /// True if the preceding drain ended before the queue was confirmed empty
    pub fn drain_incomplete(&self) -> bool {
        self.drain
            .as_ref()
            .is_some_and(|report| !report.reason.is_drained())
    }
}

/// Counts per state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub not_run: usize,
}

/// Ordered test records plus the final property store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub tests: Vec<TestRecord>,
    pub properties: BTreeMap<String, Value>,
    /// Whitelisted names that matched no registered test
    pub unknown_tests: Vec<String>,
}

impl RunOutcome {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.tests.len(),
            ..Default::default()
        };
        for test in &self.tests {
            match test.state {
                TestState::Passed => summary.passed += 1,
                TestState::Failed => summary.failed += 1,
                TestState::Broken => summary.broken += 1,
                TestState::NotRun => summary.not_run += 1,
            }
        }
        summary
    }

    pub fn get(&self, name: &str) -> Option<&TestRecord> {
        self.tests.iter().find(|test| test.name == name)
    }

    /// Tests whose preceding drain did not empty the queue
    pub fn undrained(&self) -> Vec<&str> {
        self.tests
            .iter()
            .filter(|test| test.drain_incomplete())
            .map(|test| test.name.as_str())
            .collect()
    }

    /// Names in execution order
    pub fn order(&self) -> Vec<&str> {
        self.tests.iter().map(|test| test.name.as_str()).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
