//! Lease-based service registry
//!
//! Workers register with a TTL and keep their lease alive; entries whose
//! lease runs out are swept. Coordinators discover instances or follow a
//! change-only watch stream. Served in-process or over HTTP.

mod api;
mod client;
mod error;
mod heartbeat;
mod registry;
pub mod server;

pub use api::RegistryApi;
pub use client::{ClientConfig, RegistryClient};
pub use error::RegistryError;
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use registry::{RegistryConfig, ServiceRegistry};
