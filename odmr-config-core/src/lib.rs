//! `odmr-config` core: typed experiment configuration records
//!
//! This crate provides the record types a consumer receives after an ODMR
//! experiment configuration document has been loaded, the open value model
//! used for driver-specific settings, the pulse-sequence document schema,
//! and the error types shared across the workspace. It performs no I/O.

pub mod config;
pub mod error;
pub mod sequence;
