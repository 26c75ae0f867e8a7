//! Read-only catalog of tools and skills loaded from declarative config
//! (C3). Immutable after process start; filtering produces new registries
//! rather than mutating the source.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod capability;
mod registry;

pub use capability::{AdmissionContext, Capability, CapabilityKind, Constraints, Cost, Layer};
pub use registry::{CapabilityRegistry, RegistryError, ToolSchema};
