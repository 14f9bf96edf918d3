//! Configuration schema types
//!
//! The typed, immutable record produced by loading an experiment
//! configuration document. Field names follow the document's keys.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::value::{Number, ParamMap, ParamValue};

// ============================================================================
// Open enums
// ============================================================================

/// Declares a string-valued enum whose set of values is open.
///
/// Known spellings get a variant; anything else is kept verbatim in
/// `Other` so that documents from newer producers still load.
macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value not recognised by this crate, kept verbatim.
            Other(String),
        }

        impl $name {
            /// Every recognised spelling, in declaration order.
            pub const KNOWN: &'static [&'static str] = &[$($text),+];

            /// Maps a document string to a variant. Matching is exact.
            #[must_use]
            pub fn parse(raw: &str) -> Self {
                match raw {
                    $( $text => Self::$variant, )+
                    other => Self::Other(other.to_string()),
                }
            }

            /// The spelling used in the document.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $text, )+
                    Self::Other(raw) => raw.as_str(),
                }
            }

            /// Returns `false` for [`Self::Other`].
            #[must_use]
            pub const fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

open_enum! {
    /// Kind of measurement the run performs.
    pub enum ExperimentType {
        /// Optically detected magnetic resonance sweep
        Odmr => "ODMR",
    }
}

open_enum! {
    /// Acquisition hardware used as the sensor.
    pub enum SensorKind {
        /// Data-acquisition card reading a photodiode
        Daq => "DAQ",
    }
}

open_enum! {
    /// Timing card that sequences the digital channels.
    pub enum SynchroniserKind {
        /// `SpinCore` `PulseBlaster` card
        PulseBlaster => "PulseBlaster",
    }
}

open_enum! {
    /// Instrument driver selector for a device entry.
    pub enum DeviceKind {
        /// `WindFreak` microwave synthesiser
        WindFreak => "WindFreak",
    }
}

open_enum! {
    /// How repeated measurements are combined.
    pub enum AveragingMode {
        /// Averages are interleaved across the dynamic sweep
        Spread => "spread",
        /// Repeated measurements are summed at each step
        Sum => "sum",
    }
}

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root record for one experiment run.
///
/// Invariant after loading: `dynamic_steps == data.dynamic_steps`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentConfig {
    /// Measurement kind
    pub experiment_type: ExperimentType,

    /// Number of averages, always positive
    pub averages: u64,

    /// Acquisition hardware
    pub sensor: SensorSpec,

    /// Timing card and its channel mapping
    pub synchroniser: SynchroniserSpec,

    /// Points in the swept parameter, always positive
    pub dynamic_steps: u64,

    /// Devices whose settings change at every dynamic step
    pub dynamic_devices: IndexMap<String, DeviceSpec>,

    /// Devices configured once for the whole run
    pub static_devices: IndexMap<String, DeviceSpec>,

    /// Data handling
    pub data: DataSpec,

    /// Pulse-sequence generator on the host filesystem
    pub ps_path: PathBuf,

    /// Numeric parameters passed to the pulse-sequence generator
    pub pulse_sequence: IndexMap<String, Number>,

    /// Top-level keys this crate does not know, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl ExperimentConfig {
    /// Top-level keys a document must contain, in schema order.
    pub const FIELDS: &'static [&'static str] = &[
        "experiment_type",
        "averages",
        "sensor",
        "synchroniser",
        "dynamic_steps",
        "dynamic_devices",
        "static_devices",
        "data",
        "ps_path",
        "pulse_sequence",
    ];

    /// Looks up a device by name in either device table.
    #[must_use]
    pub fn device(&self, name: &str) -> Option<(DeviceRole, &DeviceSpec)> {
        self.dynamic_devices
            .get(name)
            .map(|d| (DeviceRole::Dynamic, d))
            .or_else(|| self.static_devices.get(name).map(|d| (DeviceRole::Static, d)))
    }

    /// Iterates over every device, dynamic ones first.
    pub fn devices(&self) -> impl Iterator<Item = (DeviceRole, &str, &DeviceSpec)> {
        self.dynamic_devices
            .iter()
            .map(|(n, d)| (DeviceRole::Dynamic, n.as_str(), d))
            .chain(
                self.static_devices
                    .iter()
                    .map(|(n, d)| (DeviceRole::Static, n.as_str(), d)),
            )
    }

    /// Total number of acquisitions the run performs.
    #[must_use]
    pub const fn total_steps(&self) -> u64 {
        self.averages.saturating_mul(self.dynamic_steps)
    }
}

/// Which device table an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// Listed under `dynamic_devices`
    Dynamic,
    /// Listed under `static_devices`
    Static,
}

impl DeviceRole {
    /// The document key of the table.
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic_devices",
            Self::Static => "static_devices",
        }
    }
}

// ============================================================================
// Sensor
// ============================================================================

/// Acquisition hardware and its driver-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSpec {
    /// Sensor type selector
    #[serde(rename = "type")]
    pub kind: SensorKind,

    /// Driver-specific settings; keys depend on `kind`
    pub config: ParamMap,

    /// Unknown keys, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl SensorSpec {
    /// Keys this section defines.
    pub const FIELDS: &'static [&'static str] = &["type", "config"];

    /// Looks up a driver setting.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.config.get(key)
    }
}

// ============================================================================
// Synchroniser
// ============================================================================

/// Timing card, its settings, and the logical-to-physical channel mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynchroniserSpec {
    /// Synchroniser type selector
    #[serde(rename = "type")]
    pub kind: SynchroniserKind,

    /// Driver-specific settings
    pub config: ParamMap,

    /// Logical channel name to physical output index
    pub channel_mapping: IndexMap<String, u32>,

    /// Unknown keys, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl SynchroniserSpec {
    /// Keys this section defines.
    pub const FIELDS: &'static [&'static str] = &["type", "config", "channel_mapping"];

    /// Physical index of a logical channel.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<u32> {
        self.channel_mapping.get(name).copied()
    }

    /// Groups logical channel names by the physical index they use.
    ///
    /// A well-formed mapping has exactly one name per index.
    #[must_use]
    pub fn channel_names_by_index(&self) -> BTreeMap<u32, Vec<&str>> {
        let mut by_index: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
        for (name, index) in &self.channel_mapping {
            by_index.entry(*index).or_default().push(name);
        }
        by_index
    }
}

// ============================================================================
// Devices
// ============================================================================

/// One instrument entry under `dynamic_devices` or `static_devices`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSpec {
    /// Driver selector
    pub device_type: DeviceKind,

    /// Serial port or bus address; format depends on the driver
    pub address: String,

    /// Driver-specific settings, scalars or nested lists of scalars
    pub config: ParamMap,

    /// Unknown keys, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl DeviceSpec {
    /// Keys this section defines.
    pub const FIELDS: &'static [&'static str] = &["device_type", "address", "config"];

    /// Looks up a driver setting.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.config.get(key)
    }
}

// ============================================================================
// Data
// ============================================================================

/// How acquired data is averaged and stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSpec {
    /// Averaging strategy
    pub averaging_mode: AveragingMode,

    /// Points in the swept parameter; must match the root value
    pub dynamic_steps: u64,

    /// Whether stored data is compressed
    pub compress: bool,

    /// Number of reference channels recorded alongside the signal
    pub reference_channels: u32,

    /// Unknown keys, kept verbatim
    #[serde(flatten)]
    pub extra: ParamMap,
}

impl DataSpec {
    /// Keys this section defines.
    pub const FIELDS: &'static [&'static str] = &[
        "averaging_mode",
        "dynamic_steps",
        "compress",
        "reference_channels",
    ];
}
