//! Response-time statistics gathered while tests run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Kind of request a timing sample belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestKind {
    Get,
    Set,
    Discovery,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Get => write!(f, "GET"),
            RequestKind::Set => write!(f, "SET"),
            RequestKind::Discovery => write!(f, "DISCOVERY"),
        }
    }
}

/// Aggregate over the samples of one request kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSummary {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
}

/// Collected response-time samples, keyed by request kind
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    samples: BTreeMap<RequestKind, Vec<Duration>>,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: RequestKind, elapsed: Duration) {
        self.samples.entry(kind).or_default().push(elapsed);
    }

    pub fn samples(&self, kind: RequestKind) -> &[Duration] {
        self.samples.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn summary(&self, kind: RequestKind) -> Option<TimingSummary> {
        let samples = self.samples.get(&kind)?;
        let min = samples.iter().min()?;
        let max = samples.iter().max()?;
        let total: Duration = samples.iter().sum();
        Some(TimingSummary {
            count: samples.len(),
            min: *min,
            max: *max,
            mean: total / samples.len() as u32,
        })
    }

    /// Total number of samples across all request kinds
    pub fn total(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }
}
