//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON log formatting
//! - Log rotation
//! - Secret scrubbing
//! - Audit trail

pub mod audit;
pub mod config;
pub mod logger;
pub mod rotation;
pub mod secret_scrubbing;

pub use audit::AuditLogger;
pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
