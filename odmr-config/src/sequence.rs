//! Pulse-sequence document loading.
//!
//! The generator at `ps_path` writes a sequence document that the
//! synchroniser plays. This module parses and type-checks it with the same
//! error kinds and dotted field paths as the configuration loader; the
//! cross-check against a channel mapping is
//! [`SequenceDocument::check_against`].

use indexmap::IndexMap;
use serde_yaml::Value;
use std::path::Path;

use crate::config::extract::{self, Section, describe};
use crate::config::loader::parse_yaml;
use crate::error::ConfigError;
use odmr_config_core::config::value::join_path;

pub use odmr_config_core::sequence::{
    Pulse, RESERVED_KEYS, SequenceBlock, SequenceDocument, TotalDuration,
};

/// Parses a pulse-sequence document.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed YAML,
/// [`ConfigError::MissingField`] for an absent reserved key or pulse
/// field, and [`ConfigError::TypeMismatch`] for values of the wrong type.
pub fn load_sequence(text: &str) -> Result<SequenceDocument, ConfigError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let root = parse_yaml(text)?;
    let doc = Section::root(&root, RESERVED_KEYS)?;

    let total_duration = total_duration(doc.require("total_duration")?)?;
    let sequencing_order = string_list(doc.require("sequencing_order")?, "sequencing_order")?;
    let sequencing_repeats = repeat_list(doc.require("sequencing_repeats")?)?;

    let mut blocks = IndexMap::new();
    for (name, value) in extract::entries(&root, "")? {
        if RESERVED_KEYS.contains(&name.as_str()) {
            continue;
        }
        let block = block(value, &name)?;
        blocks.insert(name, block);
    }

    tracing::debug!(
        blocks = blocks.len(),
        ordered = sequencing_order.len(),
        "loaded pulse sequence"
    );

    Ok(SequenceDocument {
        total_duration,
        sequencing_order,
        sequencing_repeats,
        blocks,
    })
}

/// Reads and parses a pulse-sequence file.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if the file cannot be read, and
/// otherwise the errors of [`load_sequence`].
pub fn load_sequence_file(path: &Path) -> Result<SequenceDocument, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;
    load_sequence(&text)
}

fn total_duration(value: &Value) -> Result<TotalDuration, ConfigError> {
    match value {
        Value::String(s) if s == "ignore" => Ok(TotalDuration::Ignore),
        Value::Number(_) => {
            let duration = extract::finite_number(value, "total_duration")?.as_f64();
            if duration < 0.0 {
                return Err(ConfigError::type_mismatch(
                    "total_duration",
                    "non-negative number",
                    describe(value),
                ));
            }
            Ok(TotalDuration::Fixed(duration))
        }
        other => Err(ConfigError::type_mismatch(
            "total_duration",
            "number or \"ignore\"",
            describe(other),
        )),
    }
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>, ConfigError> {
    sequence(value, path)?
        .iter()
        .enumerate()
        .map(|(i, item)| match extract::untag(item) {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::type_mismatch(
                format!("{path}[{i}]"),
                "string",
                describe(other),
            )),
        })
        .collect()
}

fn repeat_list(value: &Value) -> Result<Vec<u64>, ConfigError> {
    sequence(value, "sequencing_repeats")?
        .iter()
        .enumerate()
        .map(|(i, item)| extract::positive_int(item, &format!("sequencing_repeats[{i}]")))
        .collect()
}

fn sequence<'a>(value: &'a Value, path: &str) -> Result<&'a [Value], ConfigError> {
    match value {
        Value::Sequence(items) => Ok(items.as_slice()),
        Value::Null => Ok(&[]),
        other => Err(ConfigError::type_mismatch(path, "list", describe(other))),
    }
}

fn block(value: &Value, name: &str) -> Result<SequenceBlock, ConfigError> {
    let mut channels = IndexMap::new();
    for (channel, pulses_value) in extract::entries(value, name)? {
        let channel_path = join_path(name, &channel);
        let mut pulses = IndexMap::new();
        for (pulse_name, pulse_value) in extract::entries(pulses_value, &channel_path)? {
            let section = Section::new(
                pulse_value,
                join_path(&channel_path, &pulse_name),
                Pulse::FIELDS,
            )?;
            pulses.insert(pulse_name, pulse(&section)?);
        }
        channels.insert(channel, pulses);
    }
    Ok(SequenceBlock { channels })
}

fn pulse(section: &Section<'_>) -> Result<Pulse, ConfigError> {
    Ok(Pulse {
        start: section.number("start")?.as_f64(),
        duration: section.number("duration")?.as_f64(),
        amplitude: section.optional_number("amplitude")?.map(|n| n.as_f64()),
        frequency: section.optional_number("frequency")?.map(|n| n.as_f64()),
        phase: section.optional_number("phase")?.map(|n| n.as_f64()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENCE: &str = r"
total_duration: 10
sequencing_order: [init, readout]
sequencing_repeats: [100, 1]
init:
  LASER:
    pump: {start: 0, duration: 3}
  MW:
    pi: {start: 3.5, duration: 0.1, amplitude: 0.8, frequency: 2.87e9, phase: 0}
readout:
  READ:
    window: {start: 0, duration: 1.5}
";

    #[test]
    fn test_load_sequence() {
        let doc = load_sequence(SEQUENCE).unwrap();
        assert_eq!(doc.total_duration, TotalDuration::Fixed(10.0));
        assert_eq!(doc.sequencing_order, ["init", "readout"]);
        assert_eq!(doc.sequencing_repeats, [100, 1]);
        assert_eq!(doc.blocks.len(), 2);

        let pi = doc.blocks["init"].channels["MW"]["pi"];
        assert!((pi.start - 3.5).abs() < f64::EPSILON);
        assert_eq!(pi.amplitude, Some(0.8));
        assert_eq!(pi.frequency, Some(2.87e9));
        assert_eq!(doc.blocks["readout"].channels["READ"]["window"].phase, None);
    }

    #[test]
    fn test_total_duration_ignore() {
        let text = SEQUENCE.replace("total_duration: 10", "total_duration: ignore");
        let doc = load_sequence(&text).unwrap();
        assert_eq!(doc.total_duration, TotalDuration::Ignore);
    }

    #[test]
    fn test_total_duration_other_string() {
        let text = SEQUENCE.replace("total_duration: 10", "total_duration: forever");
        let err = load_sequence(&text).unwrap_err();
        assert_eq!(err.field(), Some("total_duration"));
    }

    #[test]
    fn test_missing_reserved_key() {
        let text = SEQUENCE.replace("sequencing_repeats: [100, 1]\n", "");
        match load_sequence(&text).unwrap_err() {
            ConfigError::MissingField { field, .. } => assert_eq!(field, "sequencing_repeats"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let text = SEQUENCE.replace("[100, 1]", "[100, 0]");
        let err = load_sequence(&text).unwrap_err();
        assert_eq!(err.field(), Some("sequencing_repeats[1]"));
    }

    #[test]
    fn test_pulse_missing_duration() {
        let text = SEQUENCE.replace("{start: 0, duration: 1.5}", "{start: 0}");
        let err = load_sequence(&text).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
        assert_eq!(err.field(), Some("readout.READ.window.duration"));
    }

    #[test]
    fn test_pulse_non_numeric_start() {
        let text = SEQUENCE.replace("{start: 0, duration: 3}", "{start: soon, duration: 3}");
        let err = load_sequence(&text).unwrap_err();
        assert_eq!(err.field(), Some("init.LASER.pump.start"));
    }

    #[test]
    fn test_load_sequence_file_missing() {
        let err = load_sequence_file(Path::new("/nonexistent/sequence.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }
}
