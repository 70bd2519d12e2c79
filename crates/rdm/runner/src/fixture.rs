//! The contract between the runner and individual responder tests
//!
//! A test is registered as a [`TestDefinition`]: its name, the device
//! properties it PROVIDES, the properties it REQUIRES, the tests it must run
//! after (DEPS) and a factory building the fixture. The runner instantiates
//! each definition at most once per run.

use crate::RunnerConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use rdm_transport::RdmTransport;
use rdm_types::{DeviceProperties, ParameterCatalog, TestState, TimingStats, Uid};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Handles every fixture is built with
#[derive(Clone)]
pub struct TestSetup {
    pub universe: u32,
    pub uid: Uid,
    pub catalog: Arc<ParameterCatalog>,
    pub transport: Arc<dyn RdmTransport>,
    pub broadcast_write_delay: Duration,
    pub timing: Arc<Mutex<TimingStats>>,
}

impl TestSetup {
    /// Setup for the responder named in `config`, with a fresh timing collector
    pub fn new(
        config: &RunnerConfig,
        catalog: Arc<ParameterCatalog>,
        transport: Arc<dyn RdmTransport>,
    ) -> Self {
        Self {
            universe: config.universe,
            uid: config.uid,
            catalog,
            transport,
            broadcast_write_delay: config.broadcast_write_delay(),
            timing: Arc::new(Mutex::new(TimingStats::new())),
        }
    }
}

impl fmt::Debug for TestSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSetup")
            .field("universe", &self.universe)
            .field("uid", &self.uid)
            .field("broadcast_write_delay", &self.broadcast_write_delay)
            .finish_non_exhaustive()
    }
}

/// A single responder test instance
#[async_trait]
pub trait ResponderTest: Send {
    /// Current state. A fixture that could not initialise reports
    /// [`TestState::Broken`] before it is ever run.
    fn state(&self) -> TestState;

    /// Properties needed beyond the definition's REQUIRES
    fn extra_requires(&self) -> Vec<String> {
        Vec::new()
    }

    /// Warnings gathered while running, for reporting
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute the test, publishing any PROVIDES values into `properties`
    /// and settling [`ResponderTest::state`].
    async fn run(&mut self, properties: &mut DeviceProperties);
}

/// A fixture whose body is a plain function over the property store
pub struct FnTest<F> {
    body: F,
    state: TestState,
}

impl<F> FnTest<F>
where
    F: FnMut(&mut DeviceProperties) -> TestState + Send,
{
    pub fn new(body: F) -> Self {
        Self {
            body,
            state: TestState::NotRun,
        }
    }

    /// A fixture that failed to initialise
    pub fn broken(body: F) -> Self {
        Self {
            body,
            state: TestState::Broken,
        }
    }
}

#[async_trait]
impl<F> ResponderTest for FnTest<F>
where
    F: FnMut(&mut DeviceProperties) -> TestState + Send,
{
    fn state(&self) -> TestState {
        self.state
    }

    async fn run(&mut self, properties: &mut DeviceProperties) {
        self.state = (self.body)(properties);
    }
}

/// Builds a fixture for one run
pub type TestFactory = Arc<dyn Fn(&TestSetup) -> Box<dyn ResponderTest> + Send + Sync>;

/// Registration record for one test
#[derive(Clone)]
pub struct TestDefinition {
    name: String,
    description: String,
    provides: BTreeSet<String>,
    requires: BTreeSet<String>,
    deps: BTreeSet<String>,
    factory: TestFactory,
}

impl TestDefinition {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&TestSetup) -> Box<dyn ResponderTest> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            provides: BTreeSet::new(),
            requires: BTreeSet::new(),
            deps: BTreeSet::new(),
            factory: Arc::new(factory),
        }
    }

    /// Definition whose fixture runs `body` synchronously
    pub fn from_fn<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut DeviceProperties) -> TestState + Clone + Send + Sync + 'static,
    {
        Self::new(name, move |_setup: &TestSetup| {
            Box::new(FnTest::new(body.clone())) as Box<dyn ResponderTest>
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn provides<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(properties.into_iter().map(Into::into));
        self
    }

    pub fn requires<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(properties.into_iter().map(Into::into));
        self
    }

    /// Tests that must run before this one regardless of data dependencies
    pub fn depends_on<I, S>(mut self, tests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps.extend(tests.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn provided(&self) -> &BTreeSet<String> {
        &self.provides
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.requires
    }

    pub fn deps(&self) -> &BTreeSet<String> {
        &self.deps
    }

    /// Build a fresh fixture
    pub fn instantiate(&self, setup: &TestSetup) -> Box<dyn ResponderTest> {
        (self.factory)(setup)
    }
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("name", &self.name)
            .field("provides", &self.provides)
            .field("requires", &self.requires)
            .field("deps", &self.deps)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
