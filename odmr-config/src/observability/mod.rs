//! Observability module
//!
//! Structured logging for the loader and the CLI.

pub mod logging;

pub use logging::{LogFormat, init_logging};
