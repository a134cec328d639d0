//! Structured logging setup for the kairos-rs gateway.
//!
//! - [`logger`] - `env_logger`-based structured, colorized log formatting

pub mod logger;
