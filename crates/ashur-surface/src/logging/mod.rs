//! Logging utilities.
//!
//! Centralizes logger initialization for hosts that do not bring their own.
//! The crate itself only uses the `log` facade; initializing `env_logger`
//! here is optional and idempotent.

mod init;

pub use init::{LoggingConfig, init_logging};
