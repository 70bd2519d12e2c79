//! Domain types for RDM responder conformance testing
//!
//! An RDM responder is a device on a DMX512 bus that answers
//! request/response management messages. The responder test runner
//! sequences third-party test fixtures against one responder; this crate
//! holds the vocabulary they share.
//!
//! # Key Concepts
//!
//! - **Uid**: the 48-bit address of a responder (manufacturer + device).
//! - **ParameterId**: the 16-bit identifier of a managed parameter, resolved
//!   by name through the [`ParameterCatalog`].
//! - **RdmResponse**: a decoded reply, classified as ACK, ACK-TIMER or NACK,
//!   or a transport failure.
//! - **DeviceProperties**: the per-run fact table through which tests publish
//!   what they discovered about the responder.
//! - **TestState**: the outcome of a single test fixture.
//! - **TimingStats**: response-time samples gathered while tests run.

#![deny(unsafe_code)]

mod errors;
mod pid;
mod properties;
mod response;
mod state;
mod timing;
mod uid;

pub use errors::*;
pub use pid::*;
pub use properties::*;
pub use response::*;
pub use state::*;
pub use timing::*;
pub use uid::*;
