//! Wiring for the `vitals-monitor` binary.
//!
//! Exposed as a library so the configuration parser and the evaluation
//! loop can be exercised from integration tests.

pub mod config;
pub mod evaluation;

pub use config::{ConfigError, LogFormat, MonitorConfig, Source};
pub use evaluation::EvaluationLoop;
