//! Configuration module
//!
//! Loading and validation of experiment configuration documents, plus the
//! run-snapshot change detector.

pub mod extract;
pub mod loader;
pub mod snapshot;
pub mod validation;

pub use loader::{
    ConfigLimits, ConfigLoader, LoadResult, LoadWarning, LoaderOptions, PsPathCheck, load,
};
pub use odmr_config_core::config::*;
pub use snapshot::{RunSnapshot, SnapshotStatus};
pub use validation::{ValidationResult, Validator};
