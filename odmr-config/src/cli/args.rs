//! CLI argument definitions
//!
//! All Clap derive structs for `odmr-config` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Loader and validator for ODMR experiment configuration documents.
#[derive(Parser, Debug)]
#[command(name = "odmr-config", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "ODMR_CONFIG_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "ODMR_CONFIG_LOG_FORMAT"
    )]
    pub log_format: LogFormat,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration files.
    Validate(ValidateArgs),

    /// Load a configuration file and print the resulting record.
    Show(ShowArgs),

    /// Check a pulse-sequence document against a configuration.
    Sequence(SequenceArgs),

    /// Record the run snapshot and report whether the document changed.
    Snapshot(SnapshotArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,

    /// Fail when `ps_path` does not reference a readable file.
    #[arg(long)]
    pub check_ps_path: bool,
}

/// Arguments for `show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Configuration file to load.
    pub file: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `sequence`.
#[derive(Args, Debug)]
pub struct SequenceArgs {
    /// Pulse-sequence document to check.
    pub sequence: PathBuf,

    /// Configuration whose channel mapping the sequence must use.
    #[arg(short, long, env = "ODMR_CONFIG_FILE")]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `snapshot`.
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Configuration file; the snapshot is kept beside it as `<name>.aux`.
    pub file: PathBuf,
}

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_validate_multiple_files() {
        let cli = Cli::try_parse_from(["odmr-config", "validate", "a.yaml", "b.yaml", "--strict"])
            .unwrap();
        match cli.command {
            Commands::Validate(args) => {
                assert_eq!(args.files.len(), 2);
                assert!(args.strict);
                assert!(!args.check_ps_path);
                assert_eq!(args.format, OutputFormat::Human);
            }
            other => panic!("expected validate, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_requires_a_file() {
        let result = Cli::try_parse_from(["odmr-config", "validate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sequence_requires_config() {
        // Detach --config from ODMR_CONFIG_FILE so the caller's environment
        // cannot satisfy it.
        let command = Cli::command().mut_subcommand("sequence", |sub| {
            sub.mut_arg("config", |arg| arg.env(None::<&'static str>))
        });
        let err = command
            .try_get_matches_from(["odmr-config", "sequence", "sequence.yaml"])
            .unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_sequence_config_flag() {
        let cli = Cli::try_parse_from([
            "odmr-config",
            "sequence",
            "sequence.yaml",
            "--config",
            "odmr.yaml",
        ])
        .unwrap();
        match cli.command {
            Commands::Sequence(args) => assert_eq!(args.config, PathBuf::from("odmr.yaml")),
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "odmr-config",
            "show",
            "odmr.yaml",
            "-vv",
            "--color",
            "never",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
        match cli.command {
            Commands::Show(args) => assert_eq!(args.format, OutputFormat::Json),
            other => panic!("expected show, got {other:?}"),
        }
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["odmr-config", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["odmr-config", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_unknown_shell_rejected() {
        assert!(Cli::try_parse_from(["odmr-config", "completions", "tcsh"]).is_err());
    }
}
