//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod sequence;
pub mod show;
pub mod snapshot;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::OdmrConfigError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub fn dispatch(cli: Cli) -> Result<(), OdmrConfigError> {
    match cli.command {
        Commands::Validate(args) => validate::run(&args, cli.quiet),
        Commands::Show(args) => show::run(&args),
        Commands::Sequence(args) => sequence::run(&args, cli.quiet),
        Commands::Snapshot(args) => snapshot::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => version::run(&args),
    }
}

/// Fails with a not-found I/O error unless `path` exists.
pub(crate) fn require_exists(path: &std::path::Path) -> Result<(), OdmrConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(OdmrConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )))
    }
}
