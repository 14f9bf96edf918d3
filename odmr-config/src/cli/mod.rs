//! Command-line interface
//!
//! Argument definitions and command handlers for the `odmr-config` binary.

pub mod args;
pub mod commands;
