//! Wire and data types for the fanbridge session driver.
//!
//! This crate contains the serde-serializable types shared between the
//! driver and its callers: cookie jars exported/imported across process
//! restarts, inbound message records produced by the unread scan, and the
//! Chrome DevTools Protocol envelopes spoken over the WebSocket transport.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: no behavior beyond serialization/deserialization and
//!   trivial constructors
//! * Stable: changes only when a persisted or wire format changes
//!
//! The behavioral API lives in `fanbridge-driver`.

pub mod cdp;
pub mod cookie;
pub mod message;

pub use cdp::*;
pub use cookie::*;
pub use message::*;
