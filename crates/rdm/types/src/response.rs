//! Requests and decoded responses exchanged with a responder
//!
//! Wire framing is handled by the transport; these types carry only the
//! fields the runner inspects.

use crate::{ParameterId, StatusType, Uid, ROOT_DEVICE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Request ──────────────────────────────────────────────────────────

/// A GET request addressed to one responder
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub universe: u32,
    pub uid: Uid,
    pub sub_device: u16,
    pub pid: ParameterId,
    /// Raw parameter data appended to the request
    pub data: Vec<u8>,
}

impl GetRequest {
    pub fn new(universe: u32, uid: Uid, sub_device: u16, pid: ParameterId) -> Self {
        Self {
            universe,
            uid,
            sub_device,
            pid,
            data: Vec::new(),
        }
    }

    /// GET QUEUED_MESSAGE with the given status type, always to the root device
    ///
    /// `pid` is the QUEUED_MESSAGE identifier as resolved by the catalog.
    pub fn queued_message(
        universe: u32,
        uid: Uid,
        pid: ParameterId,
        status_type: StatusType,
    ) -> Self {
        Self::new(universe, uid, ROOT_DEVICE, pid).with_data(vec![status_type.as_byte()])
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }
}

// ── Response classification ──────────────────────────────────────────

/// Command class of a response frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandClass {
    DiscoverResponse,
    GetResponse,
    SetResponse,
}

/// Outcome of the request at the RDM layer, before the responder's answer is inspected
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    CompletedOk,
    WasBroadcast,
    Timeout,
    InvalidResponse,
    ChecksumIncorrect,
    UnknownUid,
    DeviceMismatch,
    SubDeviceMismatch,
    PidMismatch,
}

impl ResponseCode {
    pub fn is_ok(self) -> bool {
        self == ResponseCode::CompletedOk
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ResponseCode::CompletedOk => "Completed Ok",
            ResponseCode::WasBroadcast => "Request was broadcast",
            ResponseCode::Timeout => "Response Timeout",
            ResponseCode::InvalidResponse => "Invalid Response",
            ResponseCode::ChecksumIncorrect => "Incorrect checksum",
            ResponseCode::UnknownUid => "The response was for an unknown UID",
            ResponseCode::DeviceMismatch => "The response was from a different device",
            ResponseCode::SubDeviceMismatch => "The response was from a different sub device",
            ResponseCode::PidMismatch => "The response was for a different PID",
        };
        f.write_str(text)
    }
}

/// NACK reason code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NackReason(pub u16);

impl NackReason {
    pub const UNKNOWN_PID: Self = Self(0x0000);
    pub const FORMAT_ERROR: Self = Self(0x0001);
    pub const HARDWARE_FAULT: Self = Self(0x0002);
    pub const PROXY_REJECT: Self = Self(0x0003);
    pub const WRITE_PROTECT: Self = Self(0x0004);
    pub const UNSUPPORTED_COMMAND_CLASS: Self = Self(0x0005);
    pub const DATA_OUT_OF_RANGE: Self = Self(0x0006);
    pub const BUFFER_FULL: Self = Self(0x0007);
    pub const PACKET_SIZE_UNSUPPORTED: Self = Self(0x0008);
    pub const SUB_DEVICE_OUT_OF_RANGE: Self = Self(0x0009);
    pub const PROXY_BUFFER_FULL: Self = Self(0x000a);
}

impl std::fmt::Display for NackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match *self {
            Self::UNKNOWN_PID => "Unknown PID",
            Self::FORMAT_ERROR => "Format error",
            Self::HARDWARE_FAULT => "Hardware fault",
            Self::PROXY_REJECT => "Proxy reject",
            Self::WRITE_PROTECT => "Write protect",
            Self::UNSUPPORTED_COMMAND_CLASS => "Unsupported command class",
            Self::DATA_OUT_OF_RANGE => "Data out of range",
            Self::BUFFER_FULL => "Buffer full",
            Self::PACKET_SIZE_UNSUPPORTED => "Packet size unsupported",
            Self::SUB_DEVICE_OUT_OF_RANGE => "Sub device out of range",
            Self::PROXY_BUFFER_FULL => "Proxy buffer full",
            NackReason(other) => return write!(f, "Unknown NACK reason 0x{:04x}", other),
        };
        f.write_str(text)
    }
}

/// The responder's answer type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Ack,
    /// Retry after the given delay
    AckTimer { delay: Duration },
    Nack(NackReason),
}

// ── Payload ──────────────────────────────────────────────────────────

/// One entry of a STATUS_MESSAGES response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub sub_device: u16,
    pub status_type: StatusType,
    pub status_message_id: u16,
    pub data_value1: i16,
    pub data_value2: i16,
}

/// Decoded parameter data of an ACK
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResponsePayload {
    StatusMessages { messages: Vec<StatusMessage> },
    Fields(serde_json::Value),
    Raw(Vec<u8>),
}

impl ResponsePayload {
    /// The status message list, if this is a STATUS_MESSAGES payload
    pub fn status_messages(&self) -> Option<&[StatusMessage]> {
        match self {
            ResponsePayload::StatusMessages { messages } => Some(messages),
            _ => None,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────

/// A decoded response from a responder
///
/// Queued-message GETs are answered with whatever message the responder had
/// queued, so `pid` may differ from the requested parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RdmResponse {
    pub response_code: ResponseCode,
    pub response_type: ResponseType,
    pub command_class: CommandClass,
    pub pid: ParameterId,
    pub sub_device: u16,
    /// Message count field of the response header
    pub queued_messages: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

impl RdmResponse {
    fn get_response(pid: ParameterId, response_type: ResponseType) -> Self {
        Self {
            response_code: ResponseCode::CompletedOk,
            response_type,
            command_class: CommandClass::GetResponse,
            pid,
            sub_device: ROOT_DEVICE,
            queued_messages: 0,
            payload: None,
        }
    }

    /// ACK to a GET
    pub fn ack(pid: ParameterId, payload: Option<ResponsePayload>) -> Self {
        let mut response = Self::get_response(pid, ResponseType::Ack);
        response.payload = payload;
        response
    }

    /// ACK carrying a STATUS_MESSAGES list
    pub fn status_messages(messages: Vec<StatusMessage>) -> Self {
        Self::ack(
            ParameterId::STATUS_MESSAGES,
            Some(ResponsePayload::StatusMessages { messages }),
        )
    }

    /// ACK_TIMER to a GET
    pub fn ack_timer(pid: ParameterId, delay: Duration) -> Self {
        Self::get_response(pid, ResponseType::AckTimer { delay })
    }

    /// NACK to a GET
    pub fn nack(pid: ParameterId, reason: NackReason) -> Self {
        Self::get_response(pid, ResponseType::Nack(reason))
    }

    /// A frame that failed RDM-layer validation
    pub fn failed(pid: ParameterId, response_code: ResponseCode) -> Self {
        let mut response = Self::get_response(pid, ResponseType::Ack);
        response.response_code = response_code;
        response
    }

    pub fn with_queued_messages(mut self, count: u8) -> Self {
        self.queued_messages = count;
        self
    }

    pub fn with_command_class(mut self, command_class: CommandClass) -> Self {
        self.command_class = command_class;
        self
    }

    pub fn with_sub_device(mut self, sub_device: u16) -> Self {
        self.sub_device = sub_device;
        self
    }

    /// The NACK reason, if this is a NACK
    pub fn nack_reason(&self) -> Option<NackReason> {
        match self.response_type {
            ResponseType::Nack(reason) => Some(reason),
            _ => None,
        }
    }

    /// The ACK_TIMER delay, if this is an ACK_TIMER
    pub fn ack_timer_delay(&self) -> Option<Duration> {
        match self.response_type {
            ResponseType::AckTimer { delay } => Some(delay),
            _ => None,
        }
    }
}
