//! Configuration loader
//!
//! This module implements the loading pipeline for an experiment
//! configuration document:
//! 1. BOM stripping and size limit
//! 2. YAML parsing
//! 3. Required-field and type extraction into `ExperimentConfig`
//! 4. Limits
//! 5. Semantic validation (cross-field invariants)
//! 6. Optional `ps_path` check
//! 7. Freeze with `Arc`
//!
//! The producer rewrites the document wholesale before each run. The loader
//! reads it in one go and treats that read as an atomic snapshot; reading
//! while the producer is still writing is outside its control, so callers
//! load only between runs.

use indexmap::IndexMap;
use odmr_config_core::config::schema::{
    AveragingMode, DataSpec, DeviceKind, DeviceSpec, ExperimentConfig, ExperimentType, SensorKind,
    SensorSpec, SynchroniserKind, SynchroniserSpec,
};
use odmr_config_core::config::value::join_path;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::extract::{self, Section};
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Loads a configuration document from text with default options.
///
/// Reads nothing but `document_text`; `ps_path` is not checked.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found, see [`ConfigLoader::load_str`].
pub fn load(document_text: &str) -> Result<ExperimentConfig, ConfigError> {
    let result = ConfigLoader::with_defaults().load_str(document_text)?;
    Ok(Arc::unwrap_or_clone(result.config))
}

/// When and how `ps_path` is checked against the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PsPathCheck {
    /// Not checked; the consuming system owns the pulse-sequence file.
    #[default]
    Defer,
    /// A missing file is reported as a warning.
    Warn,
    /// A missing or unreadable file fails the load with
    /// [`ConfigError::PathNotFound`].
    Require,
}

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// How `ps_path` is checked.
    pub ps_path_check: PsPathCheck,

    /// Limits for configuration size.
    pub limits: ConfigLimits,
}

/// Limits for configuration size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum document size in bytes.
    pub max_config_size: usize,

    /// Maximum number of devices (dynamic plus static).
    pub max_devices: usize,

    /// Maximum number of `pulse_sequence` parameters.
    pub max_pulse_parameters: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("ODMR_CONFIG_MAX_SIZE", 1024 * 1024),
            max_devices: env_or("ODMR_CONFIG_MAX_DEVICES", 64),
            max_pulse_parameters: env_or("ODMR_CONFIG_MAX_PULSE_PARAMETERS", 256),
        }
    }
}

/// Result of loading a configuration document.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<ExperimentConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Dotted field path the warning is about.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) if !location.is_empty() => write!(f, "{} at {location}", self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
///
/// Handles the full pipeline from YAML text to a frozen `ExperimentConfig`.
/// Loading is deterministic and has no side effects beyond reading the
/// input, so a loader can be reused freely.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a new configuration loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new configuration loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// The options this loader was built with.
    #[must_use]
    pub const fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Loads a configuration document from text.
    ///
    /// A relative `ps_path` is resolved against the working directory when
    /// it is checked.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - YAML parsing fails or the document is empty ([`ConfigError::Parse`])
    /// - A required field is absent ([`ConfigError::MissingField`])
    /// - A field has the wrong type or range ([`ConfigError::TypeMismatch`])
    /// - A cross-field invariant is violated ([`ConfigError::InconsistentField`])
    /// - `ps_path` is required to exist but does not ([`ConfigError::PathNotFound`])
    /// - A size limit is exceeded ([`ConfigError::InvalidValue`])
    pub fn load_str(&self, document_text: &str) -> Result<LoadResult, ConfigError> {
        self.load_document(document_text, None)
    }

    /// Loads a configuration file.
    ///
    /// The file is read once, whole, and never written. A relative
    /// `ps_path` is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file cannot be read, and
    /// otherwise the same errors as [`ConfigLoader::load_str`].
    pub fn load_file(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let max_size = self.options.limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > max_size {
            return Err(size_error(file_size, max_size));
        }

        let bytes = std::fs::read(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let text = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
            line: None,
            column: None,
            message: format!("document is not valid UTF-8: {e}"),
        })?;

        tracing::debug!(file = %path.display(), bytes = file_size, "read configuration file");
        self.load_document(&text, path.parent())
    }

    fn load_document(
        &self,
        raw: &str,
        base_dir: Option<&Path>,
    ) -> Result<LoadResult, ConfigError> {
        let limits = &self.options.limits;
        let mut warnings = Vec::new();

        // Stage 1: BOM and size
        let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        if text.len() > limits.max_config_size {
            return Err(size_error(text.len(), limits.max_config_size));
        }

        // Stage 2: YAML parsing
        let root = parse_yaml(text)?;

        // Stage 3: Extraction
        let config = build_config(&root)?;
        tracing::debug!(
            experiment_type = %config.experiment_type,
            dynamic_steps = config.dynamic_steps,
            "extracted configuration"
        );

        // Stage 4: Limits
        check_limits(&config, limits)?;

        // Stage 5: Validation
        let mut validator = Validator::new();
        let validation = validator.validate(&config);
        if validation.has_errors() {
            return Err(ConfigError::InconsistentField {
                issues: validation.errors,
            });
        }
        warnings.extend(validation.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        // Stage 6: ps_path
        self.check_ps_path(&config.ps_path, base_dir, &mut warnings)?;

        // Stage 7: Freeze
        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }

    fn check_ps_path(
        &self,
        ps_path: &Path,
        base_dir: Option<&Path>,
        warnings: &mut Vec<LoadWarning>,
    ) -> Result<(), ConfigError> {
        if self.options.ps_path_check == PsPathCheck::Defer {
            return Ok(());
        }

        let resolved = resolve_ps_path(ps_path, base_dir);
        if is_readable_file(&resolved) {
            return Ok(());
        }

        match self.options.ps_path_check {
            PsPathCheck::Require => Err(ConfigError::PathNotFound { path: resolved }),
            PsPathCheck::Warn => {
                warnings.push(LoadWarning {
                    message: format!(
                        "pulse sequence file '{}' does not exist or is not readable",
                        resolved.display()
                    ),
                    location: Some("ps_path".to_string()),
                });
                Ok(())
            }
            PsPathCheck::Defer => Ok(()),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses YAML text into a value, mapping syntax errors to
/// [`ConfigError::Parse`].
///
/// # Errors
///
/// Syntax errors and empty documents.
pub fn parse_yaml(text: &str) -> Result<Value, ConfigError> {
    let blank = text
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Err(ConfigError::Parse {
            line: None,
            column: None,
            message: "document is empty".to_string(),
        });
    }

    let root: Value = serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
        line: e.location().map(|l| l.line()),
        column: e.location().map(|l| l.column()),
        message: e.to_string(),
    })?;

    if root.is_null() {
        return Err(ConfigError::Parse {
            line: None,
            column: None,
            message: "document is empty".to_string(),
        });
    }

    Ok(root)
}

/// Resolves `ps_path` against `base_dir` when it is relative.
#[must_use]
pub fn resolve_ps_path(ps_path: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(dir) if ps_path.is_relative() && !dir.as_os_str().is_empty() => dir.join(ps_path),
        _ => ps_path.to_path_buf(),
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && std::fs::File::open(path).is_ok()
}

// ============================================================================
// Extraction
// ============================================================================

/// Builds the typed record from a parsed document.
///
/// Required keys are checked in schema order before any value is
/// interpreted, so a document missing several keys reports the first one
/// in that order.
fn build_config(root: &Value) -> Result<ExperimentConfig, ConfigError> {
    let doc = Section::root(root, ExperimentConfig::FIELDS)?;
    for field in ExperimentConfig::FIELDS {
        doc.require(field)?;
    }

    let experiment_type = ExperimentType::parse(&doc.non_empty_string("experiment_type")?);
    let averages = doc.positive_int("averages")?;
    let sensor = build_sensor(&doc.section("sensor", SensorSpec::FIELDS)?)?;
    let synchroniser =
        build_synchroniser(&doc.section("synchroniser", SynchroniserSpec::FIELDS)?)?;
    let dynamic_steps = doc.positive_int("dynamic_steps")?;
    let dynamic_devices = build_devices(&doc, "dynamic_devices")?;
    let static_devices = build_devices(&doc, "static_devices")?;
    let data = build_data(&doc.section("data", DataSpec::FIELDS)?)?;
    let ps_path = PathBuf::from(doc.non_empty_string("ps_path")?);
    let pulse_sequence = build_pulse_sequence(&doc)?;
    let extra = doc.extra()?;

    Ok(ExperimentConfig {
        experiment_type,
        averages,
        sensor,
        synchroniser,
        dynamic_steps,
        dynamic_devices,
        static_devices,
        data,
        ps_path,
        pulse_sequence,
        extra,
    })
}

fn build_sensor(section: &Section<'_>) -> Result<SensorSpec, ConfigError> {
    Ok(SensorSpec {
        kind: SensorKind::parse(&section.non_empty_string("type")?),
        config: section.params("config")?,
        extra: section.extra()?,
    })
}

fn build_synchroniser(section: &Section<'_>) -> Result<SynchroniserSpec, ConfigError> {
    let kind = SynchroniserKind::parse(&section.non_empty_string("type")?);
    let config = section.params("config")?;

    let mapping_path = section.field_path("channel_mapping");
    let mut channel_mapping = IndexMap::new();
    for (name, value) in section.entries("channel_mapping")? {
        let index = extract::non_negative_u32(value, &join_path(&mapping_path, &name))?;
        channel_mapping.insert(name, index);
    }

    Ok(SynchroniserSpec {
        kind,
        config,
        channel_mapping,
        extra: section.extra()?,
    })
}

fn build_devices(
    doc: &Section<'_>,
    key: &str,
) -> Result<IndexMap<String, DeviceSpec>, ConfigError> {
    let table_path = doc.field_path(key);
    let mut devices = IndexMap::new();
    for (name, value) in doc.entries(key)? {
        let section = Section::new(value, join_path(&table_path, &name), DeviceSpec::FIELDS)?;
        let device = DeviceSpec {
            device_type: DeviceKind::parse(&section.non_empty_string("device_type")?),
            address: section.string("address")?,
            config: section.params("config")?,
            extra: section.extra()?,
        };
        devices.insert(name, device);
    }
    Ok(devices)
}

fn build_data(section: &Section<'_>) -> Result<DataSpec, ConfigError> {
    Ok(DataSpec {
        averaging_mode: AveragingMode::parse(&section.non_empty_string("averaging_mode")?),
        dynamic_steps: section.positive_int("dynamic_steps")?,
        compress: section.boolean("compress")?,
        reference_channels: section.index("reference_channels")?,
        extra: section.extra()?,
    })
}

fn build_pulse_sequence(
    doc: &Section<'_>,
) -> Result<IndexMap<String, odmr_config_core::config::Number>, ConfigError> {
    let path = doc.field_path("pulse_sequence");
    doc.entries("pulse_sequence")?
        .into_iter()
        .map(|(name, value)| {
            let number = extract::finite_number(value, &join_path(&path, &name))?;
            Ok((name, number))
        })
        .collect()
}

// ============================================================================
// Limits
// ============================================================================

fn check_limits(config: &ExperimentConfig, limits: &ConfigLimits) -> Result<(), ConfigError> {
    let device_count = config.dynamic_devices.len() + config.static_devices.len();
    if device_count > limits.max_devices {
        return Err(ConfigError::InvalidValue {
            field: "dynamic_devices/static_devices".to_string(),
            value: format!("{device_count} devices"),
            expected: format!(
                "at most {} devices (set ODMR_CONFIG_MAX_DEVICES to raise the limit)",
                limits.max_devices
            ),
        });
    }

    let parameter_count = config.pulse_sequence.len();
    if parameter_count > limits.max_pulse_parameters {
        return Err(ConfigError::InvalidValue {
            field: "pulse_sequence".to_string(),
            value: format!("{parameter_count} parameters"),
            expected: format!(
                "at most {} parameters (set ODMR_CONFIG_MAX_PULSE_PARAMETERS to raise the limit)",
                limits.max_pulse_parameters
            ),
        });
    }

    Ok(())
}

fn size_error(size: usize, max: usize) -> ConfigError {
    ConfigError::InvalidValue {
        field: "file_size".to_string(),
        value: format!("{size} bytes"),
        expected: format!("at most {max} bytes (set ODMR_CONFIG_MAX_SIZE to raise the limit)"),
    }
}

/// Reads a `usize` from an environment variable, falling back to `default`.
fn env_or(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
