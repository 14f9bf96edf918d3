//! `odmr-config` - validate and inspect ODMR experiment configurations

use clap::Parser;
use clap::error::ErrorKind;

use odmr_config::cli::args::Cli;
use odmr_config::cli::commands;
use odmr_config::error::{ExitCode, OdmrConfigError};
use odmr_config::observability::init_logging;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(OdmrConfigError::from(e).exit_code());
        }
    };

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    match commands::dispatch(cli) {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
