//! Responder test runner
//!
//! Sequences responder tests against a single RDM device. Tests declare the
//! device properties they discover (PROVIDES), the ones they need (REQUIRES)
//! and tests they must follow (DEPS). A run builds the dependency graph for
//! the selected tests, orders it topologically and executes it one test at a
//! time, draining the device's queued messages before each test.
//!
//! # Example
//!
//! ```no_run
//! use rdm_runner::{RunOptions, RunnerConfig, TestDefinition, TestRunner};
//! use rdm_transport::ScriptedTransport;
//! use rdm_types::{ParameterCatalog, TestState, Uid};
//! use std::sync::Arc;
//!
//! # async fn example() -> rdm_runner::RunnerResult<()> {
//! let config = RunnerConfig::new(1, Uid::new(0x7a70, 0x0000_0001));
//! let transport = Arc::new(ScriptedTransport::new());
//! let mut runner = TestRunner::new(config, Arc::new(ParameterCatalog::standard()), transport);
//!
//! runner.register_test(
//!     TestDefinition::from_fn("DeviceInfo", |properties| {
//!         properties.set("dmx_footprint", 4);
//!         TestState::Passed
//!     })
//!     .provides(["dmx_footprint"]),
//! )?;
//!
//! let outcome = runner.run_tests(&RunOptions::all(), None).await?;
//! println!("{:?}", outcome.summary());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod fixture;
pub mod graph;
pub mod outcome;
pub mod queued_message;
pub mod registry;
pub mod runner;
pub mod scheduler;

pub use self::config::{
    RunOptions, RunnerConfig, DEFAULT_ACK_TIMER_LIMIT, DEFAULT_QUEUED_MESSAGE_LIMIT,
    FACTORY_DEFAULTS_TESTS,
};
pub use error::{RunnerError, RunnerResult};
pub use fixture::{FnTest, ResponderTest, TestDefinition, TestFactory, TestSetup};
pub use graph::{DependencyGraph, NodeIndex, TestNode};
pub use outcome::{RunOutcome, RunSummary, TestRecord};
pub use queued_message::{
    DrainAction, DrainReport, DrainSession, DrainState, QueueParameters, QueuedMessageFetcher,
    StopReason,
};
pub use registry::TestRegistry;
pub use runner::{ProgressFn, TestRunner};
pub use scheduler::topological_sort;
