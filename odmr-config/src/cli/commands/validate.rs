//! `validate` command.
//!
//! Loads each file with the full pipeline and reports a verdict per file.
//! Every file is checked even after a failure.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::cli::commands::require_exists;
use crate::config::{ConfigLoader, LoaderOptions, PsPathCheck};
use crate::error::{ConfigError, Result};

/// Verdict for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    failed: usize,
}

#[derive(Debug, Serialize)]
struct Report {
    files: Vec<FileReport>,
    summary: Summary,
}

/// Validate configuration files.
///
/// With `quiet`, human output is limited to failed files and their errors.
///
/// # Errors
///
/// Returns an I/O error if a file does not exist, and
/// [`ConfigError::ValidationFailed`] if any file fails validation.
pub fn run(args: &ValidateArgs, quiet: bool) -> Result<()> {
    for path in &args.files {
        require_exists(path)?;
    }

    let loader = ConfigLoader::new(LoaderOptions {
        ps_path_check: if args.check_ps_path {
            PsPathCheck::Require
        } else {
            PsPathCheck::Warn
        },
        ..LoaderOptions::default()
    });

    let files: Vec<FileReport> = args
        .files
        .iter()
        .map(|path| validate_file(&loader, path, args.strict))
        .collect();
    let failed = files.iter().filter(|f| !f.valid).count();
    let report = Report {
        summary: Summary {
            total: files.len(),
            failed,
        },
        files,
    };

    match args.format {
        OutputFormat::Human => print!("{}", render_human(&report, quiet)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if failed > 0 {
        return Err(ConfigError::ValidationFailed { count: failed }.into());
    }
    Ok(())
}

fn validate_file(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    tracing::info!(file = %path.display(), "validating configuration");

    let (errors, warnings) = match loader.load_file(path) {
        Ok(result) => {
            for warning in &result.warnings {
                tracing::warn!(
                    file = %path.display(),
                    location = warning.location.as_deref().unwrap_or("<document>"),
                    "{}",
                    warning.message
                );
            }
            let warnings: Vec<String> = result.warnings.iter().map(ToString::to_string).collect();
            let errors = if strict && !warnings.is_empty() {
                vec![format!(
                    "{} warning(s) treated as errors (--strict)",
                    warnings.len()
                )]
            } else {
                Vec::new()
            };
            (errors, warnings)
        }
        Err(e) => (error_messages(&e), Vec::new()),
    };

    let valid = errors.is_empty();
    if valid {
        tracing::info!(file = %path.display(), "configuration valid");
    }

    FileReport {
        path: path.display().to_string(),
        valid,
        errors,
        warnings,
    }
}

/// Flattens an error into one message per problem.
fn error_messages(error: &ConfigError) -> Vec<String> {
    match error {
        ConfigError::InconsistentField { issues } => {
            issues.iter().map(|i| format!("{} at {}", i.message, i.path)).collect()
        }
        other => vec![other.to_string()],
    }
}

/// Writes warnings to stderr and returns the stdout text.
fn render_human(report: &Report, quiet: bool) -> String {
    let mut out = String::new();
    for file in &report.files {
        if !quiet {
            for warning in &file.warnings {
                eprintln!("warning: {}: {warning}", file.path);
            }
        }
        if file.valid {
            if !quiet {
                let _ = writeln!(out, "ok: {}", file.path);
            }
        } else {
            let _ = writeln!(out, "FAILED: {}", file.path);
            for error in &file.errors {
                let _ = writeln!(out, "  error: {error}");
            }
        }
    }
    if !quiet {
        let _ = writeln!(
            out,
            "{} file(s) checked, {} failed",
            report.summary.total, report.summary.failed
        );
    }
    out
}
