//! `sequence` command.

use serde::Serialize;

use crate::cli::args::{OutputFormat, SequenceArgs};
use crate::cli::commands::require_exists;
use crate::config::ConfigLoader;
use crate::error::{ConfigError, Result, Severity, ValidationResult};
use crate::sequence::load_sequence_file;

#[derive(Debug, Serialize)]
struct SequenceReport<'a> {
    sequence: String,
    config: String,
    valid: bool,
    blocks: usize,
    pulses: usize,
    #[serde(flatten)]
    result: &'a ValidationResult,
}

/// Check a pulse-sequence document against a configuration's channel
/// mapping.
///
/// With `quiet`, human output is limited to error-severity issues.
///
/// # Errors
///
/// Returns an error if either file is missing or fails to load, and
/// [`ConfigError::InconsistentField`] if the sequence does not fit the
/// configuration.
pub fn run(args: &SequenceArgs, quiet: bool) -> Result<()> {
    require_exists(&args.config)?;
    require_exists(&args.sequence)?;

    let config = ConfigLoader::with_defaults().load_file(&args.config)?.config;
    let document = load_sequence_file(&args.sequence)?;
    let result = document.check_against(&config.synchroniser);
    tracing::info!(
        sequence = %args.sequence.display(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "checked pulse sequence"
    );

    match args.format {
        OutputFormat::Human => {
            for issue in result.issues() {
                if !quiet || issue.severity == Severity::Error {
                    println!("{issue}");
                }
            }
            if result.is_valid() && !quiet {
                println!(
                    "ok: {} ({} blocks, {} pulses)",
                    args.sequence.display(),
                    document.blocks.len(),
                    pulse_total(&document)
                );
            }
        }
        OutputFormat::Json => {
            let report = SequenceReport {
                sequence: args.sequence.display().to_string(),
                config: args.config.display().to_string(),
                valid: result.is_valid(),
                blocks: document.blocks.len(),
                pulses: pulse_total(&document),
                result: &result,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if result.has_errors() {
        return Err(ConfigError::InconsistentField {
            issues: result.errors,
        }
        .into());
    }
    Ok(())
}

fn pulse_total(document: &crate::sequence::SequenceDocument) -> usize {
    document.blocks.values().map(|b| b.pulse_count()).sum()
}
