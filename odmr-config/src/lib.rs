//! `odmr-config` - Loader and validator for ODMR experiment configuration
//!
//! Parses the YAML document that describes one optically detected magnetic
//! resonance run into a typed, immutable [`config::ExperimentConfig`],
//! rejecting malformed documents with a field-precise [`error::ConfigError`].
//!
//! ```no_run
//! let text = std::fs::read_to_string("odmr.yaml")?;
//! let config = odmr_config::load(&text)?;
//! println!("{} averages", config.averages);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod sequence;

pub use config::loader::load;
