//! The test execution loop
//!
//! A run selects tests, builds and orders the dependency graph, then for each
//! test in order: reports progress, drains the responder's queued messages,
//! skips the test if it is broken or a property it requires was never set,
//! otherwise runs it and logs the result. Setup errors abort the run before
//! any test executes.

use crate::{
    topological_sort, DependencyGraph, QueuedMessageFetcher, RunOptions, RunOutcome,
    RunnerConfig, RunnerResult, TestDefinition, TestRecord, TestRegistry, TestSetup,
    FACTORY_DEFAULTS_TESTS,
};
use chrono::{Local, Utc};
use parking_lot::Mutex;
use rdm_transport::RdmTransport;
use rdm_types::{DeviceProperties, ParameterCatalog, TestState, TimingStats};
use std::sync::Arc;
use tokio::time::Instant;

/// Progress observer: `(tests completed, tests scheduled)`
pub type ProgressFn<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

/// Runs registered tests against one responder
pub struct TestRunner {
    config: RunnerConfig,
    catalog: Arc<ParameterCatalog>,
    transport: Arc<dyn RdmTransport>,
    registry: TestRegistry,
    timing: Arc<Mutex<TimingStats>>,
}

impl TestRunner {
    pub fn new(
        config: RunnerConfig,
        catalog: Arc<ParameterCatalog>,
        transport: Arc<dyn RdmTransport>,
    ) -> Self {
        Self {
            config,
            catalog,
            transport,
            registry: TestRegistry::new(),
            timing: Arc::new(Mutex::new(TimingStats::new())),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn registry(&self) -> &TestRegistry {
        &self.registry
    }

    /// Register a test; it runs only if a later run selects it
    pub fn register_test(&mut self, definition: TestDefinition) -> RunnerResult<()> {
        self.registry.register(definition)
    }

    /// Register a batch of tests
    pub fn register_all(
        &mut self,
        definitions: impl IntoIterator<Item = TestDefinition>,
    ) -> RunnerResult<usize> {
        self.registry.register_all(definitions)
    }

    /// Response-time samples recorded by tests so far
    pub fn timing_stats(&self) -> TimingStats {
        self.timing.lock().clone()
    }

    fn setup(&self) -> TestSetup {
        TestSetup {
            universe: self.config.universe,
            uid: self.config.uid,
            catalog: Arc::clone(&self.catalog),
            transport: Arc::clone(&self.transport),
            broadcast_write_delay: self.config.broadcast_write_delay(),
            timing: Arc::clone(&self.timing),
        }
    }

    fn fetcher(&self) -> RunnerResult<QueuedMessageFetcher> {
        Ok(QueuedMessageFetcher::new(
            self.config.universe,
            self.config.uid,
            Arc::clone(&self.transport),
            &self.catalog,
            self.config.queued_message_limit,
        )?
        .with_ack_timer_limit(self.config.ack_timer_limit))
    }

    /// Candidate tests for a run in registration order, plus whitelisted
    /// names that match no registered test
    fn select(&self, options: &RunOptions) -> (Vec<Arc<TestDefinition>>, Vec<String>) {
        let mut unknown = Vec::new();
        let mut candidates: Vec<Arc<TestDefinition>> = match &options.whitelist {
            None => self.registry.definitions().cloned().collect(),
            Some(whitelist) => {
                for name in whitelist {
                    if !self.registry.contains(name) {
                        tracing::error!(test = %name, "Test {} doesn't exist, skipping", name);
                        unknown.push(name.clone());
                    }
                }
                self.registry
                    .definitions()
                    .filter(|definition| whitelist.contains(definition.name()))
                    .cloned()
                    .collect()
            }
        };

        if options.skip_factory_defaults {
            candidates.retain(|definition| !FACTORY_DEFAULTS_TESTS.contains(&definition.name()));
        }
        (candidates, unknown)
    }

    /// Run the selected tests
    ///
    /// Returns every scheduled test in execution order together with the
    /// final property store. Fails only on setup errors (missing provider,
    /// unknown dependency, dependency cycle, queue parameters absent from the
    /// catalog), before anything is sent.
    pub async fn run_tests(
        &self,
        options: &RunOptions,
        mut progress: Option<ProgressFn<'_>>,
    ) -> RunnerResult<RunOutcome> {
        let started_at = Utc::now();
        let run_start = Instant::now();

        let fetcher = self.fetcher()?;
        let mut properties = DeviceProperties::new(self.registry.provided_properties());
        let (candidates, unknown_tests) = self.select(options);
        let graph = DependencyGraph::build(&self.registry, &self.setup(), candidates.iter())?;
        let order = topological_sort(graph.edges());
        let mut nodes = graph.into_nodes();

        tracing::debug!(
            "Test order is {:?}",
            order
                .iter()
                .filter_map(|&index| nodes.get(index).map(|node| node.name()))
                .collect::<Vec<_>>()
        );

        let is_debug = tracing::enabled!(tracing::Level::DEBUG);
        let inter_test_delay = self.config.inter_test_delay();
        let total = order.len();
        let mut completed = 0;
        let mut records = Vec::with_capacity(total);

        for (position, &index) in order.iter().enumerate() {
            let Some(node) = nodes.get_mut(index) else {
                continue;
            };

            if let Some(progress) = progress.as_deref_mut() {
                progress(completed, total);
            }
            let drain = fetcher.drain_all().await;

            let (start_header, end_header) = match (self.config.timestamp, is_debug) {
                (true, true) => (timestamp_header(), String::new()),
                (true, false) => (String::new(), timestamp_header()),
                (false, _) => (String::new(), String::new()),
            };

            let name = node.name().to_string();
            let description = node.definition().description().to_string();
            tracing::debug!(test = %name, "{}{}: {}", start_header, name, description);

            let mut record = TestRecord::new(&name, description);
            if !drain.reason.is_drained() {
                tracing::warn!(
                    test = %name,
                    reason = %drain.reason,
                    "Queued messages not drained before {}",
                    name
                );
            }
            record.drain = Some(drain);

            if node.fixture().state() == TestState::Broken {
                tracing::debug!(test = %name, "{}: Test broken after init, skipping test.", name);
                record.state = TestState::Broken;
                record.skip_reason = Some("broken after init".to_string());
                records.push(record);
                continue;
            }

            let missing = properties
                .first_missing(node.requires().iter().map(String::as_str))
                .map(str::to_string);
            if let Some(property) = missing {
                tracing::debug!(
                    test = %name,
                    property = %property,
                    "{}: Property: {} not found, skipping test.",
                    name,
                    property
                );
                record.skip_reason = Some(format!("property {} not found", property));
                completed += 1;
                records.push(record);
                continue;
            }

            let test_start = Instant::now();
            node.fixture_mut().run(&mut properties).await;
            record.duration = test_start.elapsed();

            if position + 1 < total && !inter_test_delay.is_zero() {
                tokio::time::sleep(inter_test_delay).await;
            }

            record.state = node.fixture().state();
            record.warnings = node.fixture().warnings();
            tracing::info!(test = %name, state = %record.state, "{}{}: {}", end_header, name, record.state);

            completed += 1;
            records.push(record);
        }

        let outcome = RunOutcome {
            started_at,
            duration: run_start.elapsed(),
            tests: records,
            properties: properties.snapshot(),
            unknown_tests,
        };
        let summary = outcome.summary();
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            broken = summary.broken,
            not_run = summary.not_run,
            "Run complete"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for TestRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRunner")
            .field("config", &self.config)
            .field("tests", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// `dd-mm-YYYY HH:MM:SS.ffffff ` in local time
fn timestamp_header() -> String {
    format!("{} ", Local::now().format("%d-%m-%Y %H:%M:%S%.6f"))
}
