//! Runtime glue that wires configuration, telemetry, summary reporting, and
//! runner orchestration.

pub mod config;
pub mod report;
pub mod runner;
pub mod telemetry;
