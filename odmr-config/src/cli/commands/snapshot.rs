//! `snapshot` command.

use crate::cli::args::SnapshotArgs;
use crate::cli::commands::require_exists;
use crate::config::RunSnapshot;
use crate::error::Result;

/// Record the run snapshot of a configuration and print whether it changed.
///
/// # Errors
///
/// Returns an error if the document cannot be read or is not valid YAML,
/// or if the snapshot cannot be written.
pub fn run(args: &SnapshotArgs) -> Result<()> {
    require_exists(&args.file)?;
    let text = std::fs::read_to_string(&args.file)?;

    let snapshot = RunSnapshot::for_document(&args.file);
    let status = snapshot.record(&text)?;
    tracing::info!(
        file = %args.file.display(),
        snapshot = %snapshot.aux_path().display(),
        %status,
        "snapshot recorded"
    );

    println!("{status}");
    Ok(())
}
