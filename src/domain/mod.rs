//! Domain layer: pure entities, state machines, and ports.
//!
//! Contains no infrastructure concerns (no SQL, no filesystem, no HTTP).

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AgentFailureKind, OrchardError, OrchardResult};
