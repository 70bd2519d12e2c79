//! RDM transport boundary primitives.
//!
//! A transport delivers one request to a responder and hands back the decoded
//! response. Framing, retries on the wire and discovery all live behind this
//! boundary; the runner only composes GETs.

#![deny(unsafe_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rdm_types::{GetRequest, RdmResponse};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

/// Trait for RDM transports.
///
/// `get` resolves once the response (or a transport failure) is available.
/// Callers issue at most one request at a time per responder.
#[async_trait]
pub trait RdmTransport: Send + Sync {
    async fn get(&self, request: &GetRequest) -> Result<RdmResponse, TransportError>;
}

/// Transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport disconnected")]
    Disconnected,

    #[error("Request timed out")]
    Timeout,

    #[error("Request rejected by the transport: {0}")]
    Rejected(String),

    #[error("No scripted response left for request to PID {0}")]
    ScriptExhausted(String),
}

/// A scripted reply with an optional simulated round-trip time.
#[derive(Clone, Debug)]
struct ScriptedReply {
    result: Result<RdmResponse, TransportError>,
    latency: Duration,
}

/// Deterministic in-memory transport used for tests and dry runs.
///
/// Replies are consumed in the order they were pushed, one per request,
/// regardless of what was requested. Every request is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<GetRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transport that answers with `responses` in order
    pub fn with_responses(responses: impl IntoIterator<Item = RdmResponse>) -> Self {
        let transport = Self::new();
        for response in responses {
            transport.push_response(response);
        }
        transport
    }

    pub fn push_response(&self, response: RdmResponse) {
        self.push(Ok(response), Duration::ZERO);
    }

    pub fn push_response_after(&self, response: RdmResponse, latency: Duration) {
        self.push(Ok(response), latency);
    }

    pub fn push_error(&self, error: TransportError) {
        self.push(Err(error), Duration::ZERO);
    }

    fn push(&self, result: Result<RdmResponse, TransportError>, latency: Duration) {
        self.replies
            .lock()
            .push_back(ScriptedReply { result, latency });
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GetRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }
}

#[async_trait]
impl RdmTransport for ScriptedTransport {
    async fn get(&self, request: &GetRequest) -> Result<RdmResponse, TransportError> {
        self.requests.lock().push(request.clone());
        let reply = self.replies.lock().pop_front();

        let Some(reply) = reply else {
            tracing::debug!(pid = %request.pid, "Scripted transport has no reply left");
            return Err(TransportError::ScriptExhausted(request.pid.to_string()));
        };

        if !reply.latency.is_zero() {
            tokio::time::sleep(reply.latency).await;
        }
        reply.result
    }
}
