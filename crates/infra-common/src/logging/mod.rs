//! Logging setup shared by the ORTC crates

pub mod setup;

pub use setup::{log_welcome, parse_log_level, setup_logging, try_setup_logging, LoggingConfig};
