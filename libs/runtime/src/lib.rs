//! Process-level plumbing shared by the binaries: layered configuration
//! and logging initialization.

pub mod config;
pub mod logging;

pub use config::{default_logging_config, AppConfig, CliArgs, LoggingConfig, Section};
