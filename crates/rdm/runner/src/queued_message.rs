//! Queued-message drain engine
//!
//! Before each test the responder's backlog of queued messages is fetched
//! until the device reports it is empty. The protocol logic lives in
//! [`DrainSession`], a synchronous state machine that only decides what to do
//! next. [`QueuedMessageFetcher`] drives it: it performs the GETs, arms the
//! ACK_TIMER wake-ups and feeds every completion back into the session.
//!
//! At most one GET is in flight at a time. ACK_TIMER wake-ups are tracked by
//! an outstanding counter and the session never ends on a terminal response
//! while one is pending, except when a limit is hit. Two limits bound every
//! session: back-to-back re-issues (reset by each ACK_TIMER) and the total
//! number of ACK_TIMER responses.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use crate::{RunnerError, RunnerResult};
use rdm_transport::{RdmTransport, TransportError};
use rdm_types::{
    CommandClass, GetRequest, NackReason, ParameterCatalog, ParameterId, RdmResponse,
    ResponseCode, ResponseType, StatusType, Uid,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ── Parameters ───────────────────────────────────────────────────────

/// The two parameters a drain exchanges, as named in the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueParameters {
    pub queued_message: ParameterId,
    pub status_messages: ParameterId,
}

impl QueueParameters {
    /// Resolve QUEUED_MESSAGE and STATUS_MESSAGES
    pub fn from_catalog(catalog: &ParameterCatalog) -> RunnerResult<Self> {
        let lookup = |name: &str| {
            catalog
                .get_by_name(name)
                .map(|descriptor| descriptor.id)
                .ok_or_else(|| RunnerError::UnknownParameter(name.to_string()))
        };
        Ok(Self {
            queued_message: lookup("QUEUED_MESSAGE")?,
            status_messages: lookup("STATUS_MESSAGES")?,
        })
    }
}

// ── Session state machine ────────────────────────────────────────────

/// Why a drain session ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// NACK UNKNOWN_PID to GET QUEUED_MESSAGE: nothing is queued
    NoQueuedMessages,
    /// ACK carrying an empty STATUS_MESSAGES list
    EmptyStatusMessages,
    /// The transport failed to deliver the request
    TransportError(String),
    /// The response failed RDM-layer validation
    ProtocolError(ResponseCode),
    /// Too many back-to-back re-issues
    LoopLimit(u32),
    /// Too many ACK_TIMER responses in one session
    AckTimerLimit(u32),
    /// No request or timer was left to wait on
    Stalled,
}

impl StopReason {
    /// True if the backlog is known to be empty
    pub fn is_drained(&self) -> bool {
        matches!(
            self,
            StopReason::NoQueuedMessages | StopReason::EmptyStatusMessages
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoQueuedMessages => f.write_str("no queued messages"),
            StopReason::EmptyStatusMessages => f.write_str("empty status messages"),
            StopReason::TransportError(e) => write!(f, "transport error: {}", e),
            StopReason::ProtocolError(code) => write!(f, "protocol error: {}", code),
            StopReason::LoopLimit(limit) => write!(f, "loop limit of {} reached", limit),
            StopReason::AckTimerLimit(limit) => {
                write!(f, "ACK TIMER limit of {} reached", limit)
            }
            StopReason::Stalled => f.write_str("stalled"),
        }
    }
}

/// Session phase
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrainState {
    /// Not started
    Idle,
    /// A GET QUEUED_MESSAGE is in flight
    AwaitingResponse,
    /// No GET in flight; waiting on ACK_TIMER wake-ups
    Draining,
    Terminated(StopReason),
}

/// What the driver must do next
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrainAction {
    /// Send a GET QUEUED_MESSAGE
    Fetch,
    /// Wake the session after the delay
    ScheduleAckTimer(Duration),
    /// Nothing to send; wait for the next completion
    Wait,
    /// End the session
    Stop(StopReason),
}

/// Counters for one drain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub reason: StopReason,
    pub requests_sent: u32,
    pub ack_timers_scheduled: u32,
    pub immediate_reissues: u32,
}

/// Protocol state of a single drain
#[derive(Debug)]
pub struct DrainSession {
    state: DrainState,
    parameters: QueueParameters,
    limit: u32,
    ack_timer_limit: u32,
    /// Immediate re-issues since the start or the last ACK_TIMER
    counter: u32,
    outstanding_ack_timers: u32,
    requests_sent: u32,
    ack_timers_scheduled: u32,
    immediate_reissues: u32,
}

impl DrainSession {
    /// Session with `limit` for both re-issues and ACK_TIMERs
    pub fn new(parameters: QueueParameters, limit: u32) -> Self {
        Self {
            state: DrainState::Idle,
            parameters,
            limit,
            ack_timer_limit: limit,
            counter: 0,
            outstanding_ack_timers: 0,
            requests_sent: 0,
            ack_timers_scheduled: 0,
            immediate_reissues: 0,
        }
    }

    pub fn with_ack_timer_limit(mut self, limit: u32) -> Self {
        self.ack_timer_limit = limit;
        self
    }

    pub fn state(&self) -> &DrainState {
        &self.state
    }

    pub fn outstanding_ack_timers(&self) -> u32 {
        self.outstanding_ack_timers
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, DrainState::Terminated(_))
    }

    /// Issue the first GET
    pub fn start(&mut self) -> DrainAction {
        if self.state != DrainState::Idle {
            return DrainAction::Wait;
        }
        self.counter = 0;
        if self.limit == 0 {
            tracing::error!(limit = self.limit, "Queued message hit loop limit of {}", self.limit);
            return self.abort(StopReason::LoopLimit(self.limit));
        }
        self.fetch()
    }

    /// Feed the outcome of the in-flight GET
    pub fn on_response(&mut self, result: Result<&RdmResponse, &TransportError>) -> DrainAction {
        if self.is_terminated() {
            return DrainAction::Wait;
        }
        self.state = DrainState::Draining;

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "Error: {}", err);
                return self.finish(StopReason::TransportError(err.to_string()));
            }
        };

        if !response.response_code.is_ok() {
            tracing::error!(code = ?response.response_code, "Error: {}", response.response_code);
            return self.finish(StopReason::ProtocolError(response.response_code));
        }

        if let ResponseType::AckTimer { delay } = response.response_type {
            if self.ack_timers_scheduled >= self.ack_timer_limit {
                tracing::error!(
                    limit = self.ack_timer_limit,
                    "Queued message hit ACK TIMER limit of {}",
                    self.ack_timer_limit
                );
                return self.abort(StopReason::AckTimerLimit(self.ack_timer_limit));
            }
            tracing::debug!(
                delay_ms = delay.as_millis() as u64,
                "Got ACK TIMER set to {} ms",
                delay.as_millis()
            );
            self.outstanding_ack_timers += 1;
            self.ack_timers_scheduled += 1;
            self.counter = 0;
            return DrainAction::ScheduleAckTimer(delay);
        }

        if self.is_unknown_queued_message(response) {
            return self.finish(StopReason::NoQueuedMessages);
        }

        if self.is_empty_status_messages(response) {
            if response.queued_messages > 0 {
                tracing::error!(
                    queued = response.queued_messages,
                    "Got a empty status message but the queued message count is {}",
                    response.queued_messages
                );
            }
            return self.finish(StopReason::EmptyStatusMessages);
        }

        self.reissue()
    }

    /// An ACK_TIMER delay has elapsed
    pub fn on_ack_timer_expired(&mut self) -> DrainAction {
        if self.is_terminated() {
            return DrainAction::Wait;
        }
        self.outstanding_ack_timers = self.outstanding_ack_timers.saturating_sub(1);
        if self.state == DrainState::AwaitingResponse {
            // The GET already in flight serves this wake-up
            return DrainAction::Wait;
        }
        self.fetch()
    }

    /// Force the session to end, e.g. when nothing is left to wait on
    pub fn abort(&mut self, reason: StopReason) -> DrainAction {
        self.state = DrainState::Terminated(reason.clone());
        DrainAction::Stop(reason)
    }

    /// Counters so far, with the given reason
    pub fn report(&self, reason: StopReason) -> DrainReport {
        DrainReport {
            reason,
            requests_sent: self.requests_sent,
            ack_timers_scheduled: self.ack_timers_scheduled,
            immediate_reissues: self.immediate_reissues,
        }
    }

    fn fetch(&mut self) -> DrainAction {
        self.state = DrainState::AwaitingResponse;
        self.requests_sent += 1;
        DrainAction::Fetch
    }

    fn reissue(&mut self) -> DrainAction {
        self.counter += 1;
        if self.counter >= self.limit {
            tracing::error!(limit = self.limit, "Queued message hit loop limit of {}", self.limit);
            return self.abort(StopReason::LoopLimit(self.limit));
        }
        self.immediate_reissues += 1;
        self.fetch()
    }

    fn is_unknown_queued_message(&self, response: &RdmResponse) -> bool {
        response.nack_reason() == Some(NackReason::UNKNOWN_PID)
            && response.command_class == CommandClass::GetResponse
            && response.pid == self.parameters.queued_message
    }

    fn is_empty_status_messages(&self, response: &RdmResponse) -> bool {
        response.response_type == ResponseType::Ack
            && response.command_class == CommandClass::GetResponse
            && response.pid == self.parameters.status_messages
            && response
                .payload
                .as_ref()
                .and_then(|payload| payload.status_messages())
                .is_some_and(|messages| messages.is_empty())
    }

    /// Terminal response: stop unless ACK_TIMER wake-ups are pending
    fn finish(&mut self, reason: StopReason) -> DrainAction {
        if self.outstanding_ack_timers == 0 {
            self.abort(reason)
        } else {
            tracing::debug!(
                outstanding = self.outstanding_ack_timers,
                reason = %reason,
                "Deferring drain stop until ACK timers resolve"
            );
            DrainAction::Wait
        }
    }
}


// ── Driver ───────────────────────────────────────────────────────────

enum DrainEvent {
    Response(Result<RdmResponse, TransportError>),
    AckTimerExpired,
}

/// Fetches queued messages from one responder until its backlog is empty
pub struct QueuedMessageFetcher {
    transport: Arc<dyn RdmTransport>,
    parameters: QueueParameters,
    request: GetRequest,
    limit: u32,
    ack_timer_limit: u32,
}

impl QueuedMessageFetcher {
    /// Fetcher for one responder; fails if the catalog lacks QUEUED_MESSAGE
    /// or STATUS_MESSAGES
    pub fn new(
        universe: u32,
        uid: Uid,
        transport: Arc<dyn RdmTransport>,
        catalog: &ParameterCatalog,
        limit: u32,
    ) -> RunnerResult<Self> {
        let parameters = QueueParameters::from_catalog(catalog)?;
        Ok(Self {
            transport,
            parameters,
            request: GetRequest::queued_message(
                universe,
                uid,
                parameters.queued_message,
                StatusType::Advisory,
            ),
            limit,
            ack_timer_limit: limit,
        })
    }

    pub fn with_ack_timer_limit(mut self, limit: u32) -> Self {
        self.ack_timer_limit = limit;
        self
    }

    /// The request sent on every fetch
    pub fn request(&self) -> &GetRequest {
        &self.request
    }

    /// Drain the backlog, returning once the session has terminated
    pub async fn drain_all(&self) -> DrainReport {
        let mut session = DrainSession::new(self.parameters, self.limit)
            .with_ack_timer_limit(self.ack_timer_limit);
        let mut pending: FuturesUnordered<BoxFuture<'static, DrainEvent>> = FuturesUnordered::new();

        let mut action = session.start();
        loop {
            match action {
                DrainAction::Fetch => pending.push(self.fetch()),
                DrainAction::ScheduleAckTimer(delay) => pending.push(
                    tokio::time::sleep(delay)
                        .map(|_| DrainEvent::AckTimerExpired)
                        .boxed(),
                ),
                DrainAction::Wait => {}
                DrainAction::Stop(reason) => {
                    let report = session.report(reason);
                    tracing::debug!(
                        reason = %report.reason,
                        requests = report.requests_sent,
                        ack_timers = report.ack_timers_scheduled,
                        "Queued message drain finished"
                    );
                    return report;
                }
            }

            action = match pending.next().await {
                Some(DrainEvent::Response(result)) => session.on_response(result.as_ref()),
                Some(DrainEvent::AckTimerExpired) => session.on_ack_timer_expired(),
                None => {
                    tracing::error!("Queued message drain has nothing left to wait on");
                    session.abort(StopReason::Stalled)
                }
            };
        }
    }

    fn fetch(&self) -> BoxFuture<'static, DrainEvent> {
        let transport = Arc::clone(&self.transport);
        let request = self.request.clone();
        async move { DrainEvent::Response(transport.get(&request).await) }.boxed()
    }
}

impl fmt::Debug for QueuedMessageFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedMessageFetcher")
            .field("request", &self.request)
            .field("limit", &self.limit)
            .field("ack_timer_limit", &self.ack_timer_limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdm_transport::ScriptedTransport;
    use rdm_types::{ResponsePayload, StatusMessage, ROOT_DEVICE};

    fn ack() -> RdmResponse {
        RdmResponse::ack(ParameterId::DEVICE_LABEL, Some(ResponsePayload::Raw(vec![0x41])))
    }

    fn unknown_pid() -> RdmResponse {
        RdmResponse::nack(ParameterId::QUEUED_MESSAGE, NackReason::UNKNOWN_PID)
    }

    fn timer(ms: u64) -> RdmResponse {
        RdmResponse::ack_timer(ParameterId::QUEUED_MESSAGE, Duration::from_millis(ms))
    }

    fn standard() -> QueueParameters {
        QueueParameters::from_catalog(&ParameterCatalog::standard()).unwrap()
    }

    fn session(limit: u32) -> DrainSession {
        DrainSession::new(standard(), limit)
    }

    fn fetcher(transport: &Arc<ScriptedTransport>, limit: u32) -> QueuedMessageFetcher {
        QueuedMessageFetcher::new(
            1,
            Uid::new(0x7a70, 0x0000_0001),
            transport.clone(),
            &ParameterCatalog::standard(),
            limit,
        )
        .unwrap()
    }

    // ── State machine ──

    #[test]
    fn test_start_fetches_once() {
        let mut session = session(25);
        assert_eq!(session.start(), DrainAction::Fetch);
        assert_eq!(session.state(), &DrainState::AwaitingResponse);
        assert_eq!(session.start(), DrainAction::Wait);
    }

    #[test]
    fn test_unknown_pid_nack_stops() {
        let mut session = session(25);
        session.start();
        let action = session.on_response(Ok(&unknown_pid()));
        assert_eq!(action, DrainAction::Stop(StopReason::NoQueuedMessages));
        assert!(session.is_terminated());
    }

    #[test]
    fn test_unknown_pid_for_other_pid_reissues() {
        let mut session = session(25);
        session.start();
        let other = RdmResponse::nack(ParameterId::DEVICE_LABEL, NackReason::UNKNOWN_PID);
        assert_eq!(session.on_response(Ok(&other)), DrainAction::Fetch);

        let set_class = unknown_pid().with_command_class(CommandClass::SetResponse);
        assert_eq!(session.on_response(Ok(&set_class)), DrainAction::Fetch);

        let other_reason = RdmResponse::nack(ParameterId::QUEUED_MESSAGE, NackReason::FORMAT_ERROR);
        assert_eq!(session.on_response(Ok(&other_reason)), DrainAction::Fetch);
    }

    #[test]
    fn test_empty_status_messages_stops() {
        let mut session = session(25);
        session.start();
        let empty = RdmResponse::status_messages(vec![]);
        assert_eq!(
            session.on_response(Ok(&empty)),
            DrainAction::Stop(StopReason::EmptyStatusMessages)
        );
    }

    #[test]
    fn test_empty_status_with_queued_count_still_stops() {
        let mut session = session(25);
        session.start();
        let empty = RdmResponse::status_messages(vec![]).with_queued_messages(3);
        assert_eq!(
            session.on_response(Ok(&empty)),
            DrainAction::Stop(StopReason::EmptyStatusMessages)
        );
    }

    #[test]
    fn test_non_empty_status_messages_reissues() {
        let mut session = session(25);
        session.start();
        let message = StatusMessage {
            sub_device: ROOT_DEVICE,
            status_type: StatusType::Advisory,
            status_message_id: 0x0001,
            data_value1: 0,
            data_value2: 0,
        };
        let response = RdmResponse::status_messages(vec![message]);
        assert_eq!(session.on_response(Ok(&response)), DrainAction::Fetch);
    }

    #[test]
    fn test_transport_error_stops() {
        let mut session = session(25);
        session.start();
        let action = session.on_response(Err(&TransportError::Timeout));
        assert_eq!(
            action,
            DrainAction::Stop(StopReason::TransportError("Request timed out".into()))
        );
    }

    #[test]
    fn test_bad_response_code_stops() {
        let mut session = session(25);
        session.start();
        let bad = RdmResponse::failed(ParameterId::QUEUED_MESSAGE, ResponseCode::ChecksumIncorrect);
        assert_eq!(
            session.on_response(Ok(&bad)),
            DrainAction::Stop(StopReason::ProtocolError(ResponseCode::ChecksumIncorrect))
        );
    }

    #[test]
    fn test_terminal_response_waits_for_outstanding_timer() {
        let mut session = session(25);
        session.start();
        assert_eq!(
            session.on_response(Ok(&timer(100))),
            DrainAction::ScheduleAckTimer(Duration::from_millis(100))
        );
        assert_eq!(session.outstanding_ack_timers(), 1);

        assert_eq!(session.on_response(Ok(&unknown_pid())), DrainAction::Wait);
        assert!(!session.is_terminated());
        assert_eq!(session.on_response(Err(&TransportError::Disconnected)), DrainAction::Wait);

        assert_eq!(session.on_ack_timer_expired(), DrainAction::Fetch);
        assert_eq!(session.outstanding_ack_timers(), 0);
        assert_eq!(
            session.on_response(Ok(&unknown_pid())),
            DrainAction::Stop(StopReason::NoQueuedMessages)
        );
    }

    #[test]
    fn test_timer_during_inflight_get_does_not_double_fetch() {
        let mut session = session(25);
        session.start();
        session.on_response(Ok(&timer(10)));
        session.on_response(Ok(&timer(20)));
        assert_eq!(session.on_ack_timer_expired(), DrainAction::Fetch);
        assert_eq!(session.on_ack_timer_expired(), DrainAction::Wait);
        assert_eq!(session.outstanding_ack_timers(), 0);
        assert_eq!(
            session.on_response(Ok(&unknown_pid())),
            DrainAction::Stop(StopReason::NoQueuedMessages)
        );
    }

    #[test]
    fn test_loop_limit_ignores_outstanding_timers() {
        let mut session = session(2);
        session.start();
        session.on_response(Ok(&timer(100)));
        assert_eq!(session.on_response(Ok(&ack())), DrainAction::Fetch);
        assert_eq!(
            session.on_response(Ok(&ack())),
            DrainAction::Stop(StopReason::LoopLimit(2))
        );
        assert_eq!(session.outstanding_ack_timers(), 1);
    }

    #[test]
    fn test_zero_limit_sends_nothing() {
        let mut session = session(0);
        assert_eq!(session.start(), DrainAction::Stop(StopReason::LoopLimit(0)));
        assert!(session.is_terminated());
        assert_eq!(session.report(StopReason::LoopLimit(0)).requests_sent, 0);
    }

    #[test]
    fn test_ack_timer_limit_stops_endless_timers() {
        let mut session = session(25).with_ack_timer_limit(3);
        session.start();
        for _ in 0..3 {
            assert_eq!(
                session.on_response(Ok(&timer(10))),
                DrainAction::ScheduleAckTimer(Duration::from_millis(10))
            );
            assert_eq!(session.on_ack_timer_expired(), DrainAction::Fetch);
        }
        assert_eq!(
            session.on_response(Ok(&timer(10))),
            DrainAction::Stop(StopReason::AckTimerLimit(3))
        );
        let report = session.report(StopReason::AckTimerLimit(3));
        assert_eq!(report.ack_timers_scheduled, 3);
        assert_eq!(report.requests_sent, 4);
    }

    #[test]
    fn test_parameters_from_catalog() {
        let mut catalog = ParameterCatalog::standard();
        assert_eq!(
            QueueParameters::from_catalog(&catalog).unwrap(),
            QueueParameters {
                queued_message: ParameterId::QUEUED_MESSAGE,
                status_messages: ParameterId::STATUS_MESSAGES,
            }
        );

        catalog.insert("QUEUED_MESSAGE", ParameterId(0x8020));
        let parameters = QueueParameters::from_catalog(&catalog).unwrap();
        assert_eq!(parameters.queued_message, ParameterId(0x8020));

        let err = QueueParameters::from_catalog(&ParameterCatalog::empty()).unwrap_err();
        assert!(matches!(err, RunnerError::UnknownParameter(name) if name == "QUEUED_MESSAGE"));
    }

    #[test]
    fn test_terminal_checks_follow_catalog_ids() {
        let parameters = QueueParameters {
            queued_message: ParameterId(0x8020),
            status_messages: ParameterId(0x8030),
        };
        let mut session = DrainSession::new(parameters, 25);
        session.start();

        assert_eq!(session.on_response(Ok(&unknown_pid())), DrainAction::Fetch);
        assert_eq!(
            session.on_response(Ok(&RdmResponse::status_messages(vec![]))),
            DrainAction::Fetch
        );
        let remapped = RdmResponse::nack(ParameterId(0x8020), NackReason::UNKNOWN_PID);
        assert_eq!(
            session.on_response(Ok(&remapped)),
            DrainAction::Stop(StopReason::NoQueuedMessages)
        );
    }

    #[test]
    fn test_stop_reason_serializes() {
        let report = DrainReport {
            reason: StopReason::AckTimerLimit(25),
            requests_sent: 26,
            ack_timers_scheduled: 25,
            immediate_reissues: 0,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["reason"]["AckTimerLimit"], 25);
        assert_eq!(value["requests_sent"], 26);
    }

    #[test]
    fn test_events_after_termination_are_ignored() {
        let mut session = session(25);
        session.start();
        session.on_response(Ok(&unknown_pid()));
        assert_eq!(session.on_response(Ok(&ack())), DrainAction::Wait);
        assert_eq!(session.on_ack_timer_expired(), DrainAction::Wait);
        assert_eq!(
            session.state(),
            &DrainState::Terminated(StopReason::NoQueuedMessages)
        );
    }

    // ── Driver ──

    #[tokio::test(start_paused = true)]
    async fn test_drain_sends_advisory_get_to_root() {
        let transport = Arc::new(ScriptedTransport::with_responses([unknown_pid()]));
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::NoQueuedMessages);
        assert_eq!(report.requests_sent, 1);
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].pid, ParameterId::QUEUED_MESSAGE);
        assert_eq!(requests[0].sub_device, ROOT_DEVICE);
        assert_eq!(requests[0].data, vec![StatusType::Advisory.as_byte()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_ack_timers_then_nack() {
        let transport = Arc::new(ScriptedTransport::with_responses([
            timer(100),
            timer(50),
            timer(0),
            unknown_pid(),
        ]));
        let start = tokio::time::Instant::now();
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::NoQueuedMessages);
        assert_eq!(report.ack_timers_scheduled, 3);
        assert_eq!(report.requests_sent, 4);
        assert_eq!(report.immediate_reissues, 0);
        assert_eq!(transport.remaining(), 0);
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_messages_then_empty_status() {
        let transport = Arc::new(ScriptedTransport::with_responses([
            ack(),
            ack(),
            RdmResponse::status_messages(vec![]),
        ]));
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::EmptyStatusMessages);
        assert_eq!(report.requests_sent, 3);
        assert_eq!(report.immediate_reissues, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_loop_limit() {
        let transport = Arc::new(ScriptedTransport::with_responses((0..30).map(|_| ack())));
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::LoopLimit(25));
        assert_eq!(report.requests_sent, 25);
        assert_eq!(transport.remaining(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_ack_timer_resets_loop_counter() {
        let mut script: Vec<RdmResponse> = (0..10).map(|_| ack()).collect();
        script.push(timer(20));
        script.extend((0..40).map(|_| ack()));
        let transport = Arc::new(ScriptedTransport::with_responses(script));

        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::LoopLimit(25));
        assert_eq!(report.requests_sent, 36);
        assert_eq!(report.ack_timers_scheduled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_transport_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(ack());
        transport.push_error(TransportError::Disconnected);
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(
            report.reason,
            StopReason::TransportError("Transport disconnected".into())
        );
        assert!(!report.reason.is_drained());
        assert_eq!(report.requests_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_transport_error_after_ack_timer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_response(timer(10));
        transport.push_error(TransportError::Timeout);
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(
            report.reason,
            StopReason::TransportError("Request timed out".into())
        );
        assert_eq!(report.requests_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_always_ack_timer_terminates() {
        let transport = Arc::new(ScriptedTransport::with_responses((0..40).map(|_| timer(10))));
        let report = fetcher(&transport, 25).drain_all().await;

        assert_eq!(report.reason, StopReason::AckTimerLimit(25));
        assert!(!report.reason.is_drained());
        assert_eq!(report.ack_timers_scheduled, 25);
        assert_eq!(report.requests_sent, 26);
        assert_eq!(transport.remaining(), 14);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_separate_ack_timer_limit() {
        let transport = Arc::new(ScriptedTransport::with_responses((0..10).map(|_| timer(5))));
        let report = fetcher(&transport, 25).with_ack_timer_limit(4).drain_all().await;

        assert_eq!(report.reason, StopReason::AckTimerLimit(4));
        assert_eq!(report.requests_sent, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_zero_limit_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::with_responses([unknown_pid()]));
        let report = fetcher(&transport, 0).drain_all().await;

        assert_eq!(report.reason, StopReason::LoopLimit(0));
        assert_eq!(report.requests_sent, 0);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_uses_catalog_parameter_id() {
        let mut catalog = ParameterCatalog::standard();
        catalog.insert("QUEUED_MESSAGE", ParameterId(0x8020));
        let transport = Arc::new(ScriptedTransport::with_responses([
            unknown_pid(),
            RdmResponse::nack(ParameterId(0x8020), NackReason::UNKNOWN_PID),
        ]));
        let fetcher =
            QueuedMessageFetcher::new(1, Uid::new(0x7a70, 1), transport.clone(), &catalog, 25)
                .unwrap();
        let report = fetcher.drain_all().await;

        assert_eq!(report.reason, StopReason::NoQueuedMessages);
        assert_eq!(report.requests_sent, 2);
        assert!(transport
            .requests()
            .iter()
            .all(|request| request.pid == ParameterId(0x8020)));
    }

    #[test]
    fn test_fetcher_requires_queue_parameters() {
        let transport: Arc<dyn RdmTransport> = Arc::new(ScriptedTransport::new());
        let err = QueuedMessageFetcher::new(
            1,
            Uid::new(0x7a70, 1),
            transport,
            &ParameterCatalog::empty(),
            25,
        )
        .unwrap_err();
        assert!(matches!(err, RunnerError::UnknownParameter(_)));
    }
}
