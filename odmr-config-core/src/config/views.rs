//! Typed views over driver-specific `config` maps.
//!
//! The loader keeps sensor and device settings as open [`ParamMap`]s. A
//! consumer that knows the driver asks for a view, which is validated at
//! that point and reports problems with the same field paths the loader
//! uses.

use serde::Serialize;

use crate::config::schema::{SensorKind, SensorSpec};
use crate::config::value::{ParamMap, ParamValue};
use crate::error::ConfigError;

/// Settings of a `DAQ` sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaqConfig {
    /// Samples taken per acquisition window
    pub number_measurements: u64,

    /// Input terminal, e.g. `Dev1/ai0`
    pub apd_input: Option<String>,

    /// Sampling rate in samples per second
    pub sampling_rate: Option<f64>,

    /// Remaining settings, passed through to the driver
    pub extra: ParamMap,
}

impl SensorSpec {
    /// Interprets `config` as [`DaqConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] if the sensor is not a `DAQ`
    /// or a setting has the wrong type, and [`ConfigError::MissingField`]
    /// if `number_measurements` is absent.
    pub fn daq(&self) -> Result<DaqConfig, ConfigError> {
        if self.kind != SensorKind::Daq {
            return Err(ConfigError::type_mismatch(
                "sensor.type",
                "DAQ",
                format!("'{}'", self.kind),
            ));
        }

        let number_measurements = match self.config.get("number_measurements") {
            None => {
                return Err(ConfigError::MissingField {
                    field: "sensor.config.number_measurements".to_string(),
                    suggestion: None,
                });
            }
            Some(value) => value.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                mismatch("number_measurements", "positive integer", value)
            })?,
        };

        let apd_input = match self.config.get("apd_input") {
            None | Some(ParamValue::Null) => None,
            Some(ParamValue::String(s)) => Some(s.clone()),
            Some(other) => return Err(mismatch("apd_input", "string", other)),
        };

        let sampling_rate = match self.config.get("sampling_rate") {
            None | Some(ParamValue::Null) => None,
            Some(value) => Some(
                value
                    .as_f64()
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .ok_or_else(|| mismatch("sampling_rate", "positive number", value))?,
            ),
        };

        let extra = self
            .config
            .iter()
            .filter(|(k, _)| {
                !matches!(
                    k.as_str(),
                    "number_measurements" | "apd_input" | "sampling_rate"
                )
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(DaqConfig {
            number_measurements,
            apd_input,
            sampling_rate,
            extra,
        })
    }
}

fn mismatch(key: &str, expected: &str, found: &ParamValue) -> ConfigError {
    ConfigError::type_mismatch(
        format!("sensor.config.{key}"),
        expected,
        format!("{} {found}", found.type_name()),
    )
}
