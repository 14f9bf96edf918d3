//! Shared integration-test helpers: fixture lookup and running the
//! `odmr-config` binary as a child process.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Returns the path to a test fixture.
#[must_use]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Reads a test fixture into a string.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn read_fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Runs the binary with `args` and waits for it to exit.
///
/// Logging environment overrides are cleared so output is predictable.
#[allow(clippy::missing_panics_doc)]
#[must_use]
pub fn spawn_command(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_odmr-config"))
        .args(args)
        .env_remove("ODMR_CONFIG_LOG_LEVEL")
        .env_remove("ODMR_CONFIG_LOG_FORMAT")
        .env_remove("ODMR_CONFIG_FILE")
        .env("ODMR_CONFIG_COLOR", "never")
        .output()
        .expect("failed to run odmr-config")
}

/// Stdout of a finished command as text.
#[must_use]
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished command as text.
#[must_use]
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
