//! Event storage and broadcast: the append-only per-session log (C1) and the
//! single API surface (C2) agent code uses to emit events into it.
//!
//! Event storage is shared, concurrency-safe, and never mutated by business
//! code directly — everything flows through [`EventBroadcaster`].

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod broadcaster;
mod event;
mod storage;

pub use broadcaster::EventBroadcaster;
pub use event::{ContentBlockType, Event, EventType};
pub use storage::{
    EventAdapter, EventStorage, SessionContext, SessionContextUpdate, DEFAULT_CHANNEL_CAPACITY,
    DEFAULT_LOG_CAP,
};
