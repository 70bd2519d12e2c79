//! Shared fixtures for runner integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rdm_runner::{RunnerConfig, TestDefinition, TestRunner};
use rdm_transport::{RdmTransport, TransportError};
use rdm_types::{GetRequest, NackReason, ParameterCatalog, ParameterId, RdmResponse, TestState, Uid};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const UNIVERSE: u32 = 1;
pub const UID: Uid = Uid::new(0x7a70, 0x0000_0001);

/// Install a subscriber honouring `RUST_LOG`, once per test binary
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A responder with nothing queued: every GET QUEUED_MESSAGE is NACKed
#[derive(Default)]
pub struct QuietResponder {
    requests: AtomicUsize,
}

impl QuietResponder {
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RdmTransport for QuietResponder {
    async fn get(&self, request: &GetRequest) -> Result<RdmResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if request.pid == ParameterId::QUEUED_MESSAGE {
            Ok(RdmResponse::nack(request.pid, NackReason::UNKNOWN_PID))
        } else {
            Ok(RdmResponse::nack(request.pid, NackReason::UNSUPPORTED_COMMAND_CLASS))
        }
    }
}

pub fn config() -> RunnerConfig {
    RunnerConfig::new(UNIVERSE, UID)
}

pub fn runner_with(config: RunnerConfig, transport: Arc<dyn RdmTransport>) -> TestRunner {
    init_tracing();
    TestRunner::new(config, Arc::new(ParameterCatalog::standard()), transport)
}

pub fn quiet_runner() -> (TestRunner, Arc<QuietResponder>) {
    let transport = Arc::new(QuietResponder::default());
    (runner_with(config(), transport.clone()), transport)
}

pub fn passing(name: &str) -> TestDefinition {
    TestDefinition::from_fn(name, |_| TestState::Passed)
}

/// A test that publishes `value` under each of its PROVIDES
pub fn provider(name: &str, properties: &[&str], value: i64) -> TestDefinition {
    let names: Vec<String> = properties.iter().map(|p| p.to_string()).collect();
    let provided = names.clone();
    TestDefinition::from_fn(name, move |store| {
        for property in &names {
            store.set(property.clone(), value);
        }
        TestState::Passed
    })
    .provides(provided)
}
