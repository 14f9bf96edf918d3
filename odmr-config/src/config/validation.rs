//! Configuration validation
//!
//! Semantic validation of an extracted `ExperimentConfig`. Field presence
//! and types are settled by extraction; this pass checks the invariants
//! that span fields.
//!
//! Validation collects ALL issues (doesn't stop at first) so a document
//! with several inconsistencies reports every one of them.

use odmr_config_core::config::schema::{
    AveragingMode, DataSpec, DeviceKind, DeviceSpec, ExperimentConfig, ExperimentType, SensorKind,
    SensorSpec, SynchroniserKind, SynchroniserSpec,
};
use odmr_config_core::config::value::{ParamMap, join_path};
use std::collections::HashMap;

use crate::config::extract::MAX_SUGGESTION_DISTANCE;

pub use odmr_config_core::error::ValidationResult;

// ============================================================================
// Public API
// ============================================================================

/// Configuration validator.
///
/// Errors make the configuration unusable; warnings are surfaced alongside
/// the loaded record.
#[derive(Debug, Default)]
pub struct Validator {
    result: ValidationResult,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns the result.
    pub fn validate(&mut self, config: &ExperimentConfig) -> ValidationResult {
        self.result = ValidationResult::default();

        // Cross-field invariants
        self.validate_dynamic_steps(config);
        self.validate_channel_mapping(&config.synchroniser, &config.data);
        self.validate_device_tables(config);

        // Open values
        self.validate_known_values(config);
        self.validate_unknown_keys(config);
        self.validate_sensor(&config.sensor);

        std::mem::take(&mut self.result)
    }

    // ========================================================================
    // Cross-field invariants
    // ========================================================================

    fn validate_dynamic_steps(&mut self, config: &ExperimentConfig) {
        if config.dynamic_steps != config.data.dynamic_steps {
            self.result.add_error(
                "data.dynamic_steps",
                &format!(
                    "is {} but dynamic_steps is {}",
                    config.data.dynamic_steps, config.dynamic_steps
                ),
            );
        }

        if config.dynamic_steps > 1 && config.dynamic_devices.is_empty() {
            self.result.add_warning(
                "dynamic_devices",
                &format!(
                    "no dynamic devices although dynamic_steps is {}",
                    config.dynamic_steps
                ),
            );
        }
    }

    fn validate_channel_mapping(&mut self, synchroniser: &SynchroniserSpec, data: &DataSpec) {
        let mapping = &synchroniser.channel_mapping;
        if mapping.is_empty() {
            self.result.add_warning("synchroniser.channel_mapping", "no channels are mapped");
        }

        // Channels are combined as bits of one output word, so an index may
        // carry only one logical channel.
        let mut assigned: HashMap<u32, &str> = HashMap::new();
        for (name, index) in mapping {
            if let Some(first) = assigned.get(index) {
                self.result.add_error(
                    &format!("synchroniser.channel_mapping.{name}"),
                    &format!("channel index {index} is already assigned to '{first}'"),
                );
            } else {
                assigned.insert(*index, name);
            }
        }

        let reference_channels = usize::try_from(data.reference_channels).unwrap_or(usize::MAX);
        if reference_channels > mapping.len() {
            self.result.add_warning(
                "data.reference_channels",
                &format!(
                    "{} reference channels but only {} channels are mapped",
                    data.reference_channels,
                    mapping.len()
                ),
            );
        }
    }

    fn validate_device_tables(&mut self, config: &ExperimentConfig) {
        for name in config.static_devices.keys() {
            if config.dynamic_devices.contains_key(name) {
                self.result.add_warning(
                    format!("static_devices.{name}"),
                    format!("device '{name}' is also listed under dynamic_devices"),
                );
            }
        }

        for (role, name, device) in config.devices() {
            let path = format!("{}.{name}", role.section());
            self.validate_device(device, &path);
        }
    }

    fn validate_device(&mut self, device: &DeviceSpec, path: &str) {
        if device.address.trim().is_empty() {
            self.result.add_warning(&join_path(path, "address"), "address is empty");
        }

        self.check_known(
            &join_path(path, "device_type"),
            device.device_type.as_str(),
            device.device_type.is_known(),
            DeviceKind::KNOWN,
        );
        self.check_unknown_keys(path, &device.extra, DeviceSpec::FIELDS);
    }

    // ========================================================================
    // Open values
    // ========================================================================

    fn validate_known_values(&mut self, config: &ExperimentConfig) {
        let experiment_type = &config.experiment_type;
        self.check_known(
            "experiment_type",
            experiment_type.as_str(),
            experiment_type.is_known(),
            ExperimentType::KNOWN,
        );

        let sensor = &config.sensor.kind;
        self.check_known("sensor.type", sensor.as_str(), sensor.is_known(), SensorKind::KNOWN);

        let synchroniser = &config.synchroniser.kind;
        self.check_known(
            "synchroniser.type",
            synchroniser.as_str(),
            synchroniser.is_known(),
            SynchroniserKind::KNOWN,
        );

        let averaging = &config.data.averaging_mode;
        self.check_known(
            "data.averaging_mode",
            averaging.as_str(),
            averaging.is_known(),
            AveragingMode::KNOWN,
        );
    }

    fn validate_unknown_keys(&mut self, config: &ExperimentConfig) {
        self.check_unknown_keys("", &config.extra, ExperimentConfig::FIELDS);
        self.check_unknown_keys("sensor", &config.sensor.extra, SensorSpec::FIELDS);
        self.check_unknown_keys(
            "synchroniser",
            &config.synchroniser.extra,
            SynchroniserSpec::FIELDS,
        );
        self.check_unknown_keys("data", &config.data.extra, DataSpec::FIELDS);
    }

    fn validate_sensor(&mut self, sensor: &SensorSpec) {
        if sensor.kind != SensorKind::Daq {
            return;
        }
        if let Err(e) = sensor.daq() {
            let path = e.field().unwrap_or("sensor.config").to_string();
            self.result.add_warning(&path, &format!("DAQ settings are not usable: {e}"));
        }
    }

    fn check_known(&mut self, path: &str, value: &str, known: bool, candidates: &[&str]) {
        if known {
            return;
        }
        let message = match suggest(value, candidates) {
            Some(s) => format!("unrecognised value '{value}' (did you mean '{s}'?)"),
            None => format!(
                "unrecognised value '{value}' (known: {})",
                candidates.join(", ")
            ),
        };
        self.result.add_warning(path, &message);
    }

    fn check_unknown_keys(&mut self, path: &str, extra: &ParamMap, fields: &[&str]) {
        for key in extra.keys() {
            let message = match suggest(key, fields) {
                Some(s) => format!("unknown key '{key}' (did you mean '{s}'?)"),
                None => format!("unknown key '{key}'"),
            };
            self.result.add_warning(&join_path(path, key), &message);
        }
    }

}

// ============================================================================
// Helper Functions
// ============================================================================

/// Finds the candidate closest to `input` within
/// [`MAX_SUGGESTION_DISTANCE`].
fn suggest<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, strsim::damerau_levenshtein(input, c)))
        .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(_, dist)| *dist)
        .map(|(c, _)| c)
}

// ============================================================================
// Tests
// ============================================================================
