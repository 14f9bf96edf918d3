//! `show` command.

use std::fmt::Write as _;

use crate::cli::args::{OutputFormat, ShowArgs};
use crate::cli::commands::require_exists;
use crate::config::{ConfigLoader, DeviceSpec, ExperimentConfig};
use crate::error::Result;
use indexmap::IndexMap;

/// Load a configuration and print the resulting record.
///
/// # Errors
///
/// Returns an error if the file does not exist or fails to load.
pub fn run(args: &ShowArgs) -> Result<()> {
    require_exists(&args.file)?;
    let result = ConfigLoader::with_defaults().load_file(&args.file)?;
    for warning in &result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<document>"),
            "{}",
            warning.message
        );
    }

    match args.format {
        OutputFormat::Human => print!("{}", render_human(&result.config)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*result.config)?),
    }
    Ok(())
}

/// Renders a one-line-per-section summary of a configuration.
#[must_use]
pub fn render_human(config: &ExperimentConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "experiment_type: {}", config.experiment_type);
    let _ = writeln!(
        out,
        "averages:        {} ({} acquisitions)",
        config.averages,
        config.total_steps()
    );
    let _ = writeln!(out, "sensor:          {}", config.sensor.kind);

    let channels: Vec<String> = config
        .synchroniser
        .channel_mapping
        .iter()
        .map(|(name, index)| format!("{name}={index}"))
        .collect();
    let _ = writeln!(
        out,
        "synchroniser:    {} [{}]",
        config.synchroniser.kind,
        channels.join(", ")
    );

    let _ = writeln!(out, "dynamic_steps:   {}", config.dynamic_steps);
    let _ = writeln!(out, "dynamic_devices: {}", devices(&config.dynamic_devices));
    let _ = writeln!(out, "static_devices:  {}", devices(&config.static_devices));
    let _ = writeln!(
        out,
        "data:            averaging_mode={} compress={} reference_channels={}",
        config.data.averaging_mode, config.data.compress, config.data.reference_channels
    );
    let _ = writeln!(out, "ps_path:         {}", config.ps_path.display());

    let parameters: Vec<String> = config
        .pulse_sequence
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    let _ = writeln!(out, "pulse_sequence:  {}", none_if_empty(&parameters));
    out
}

fn devices(table: &IndexMap<String, DeviceSpec>) -> String {
    let entries: Vec<String> = table
        .iter()
        .map(|(name, device)| format!("{name} ({} @ {})", device.device_type, device.address))
        .collect();
    none_if_empty(&entries)
}

fn none_if_empty(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
