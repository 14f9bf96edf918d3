//! Open value model for the free-form parts of a configuration.
//!
//! `config` maps under the sensor, the synchroniser and each device, and any
//! unknown keys, are kept as [`ParamValue`] trees. Their meaning depends on
//! the sibling `type`/`device_type`, so they are interpreted lazily by
//! whoever knows that type (see [`crate::config::views`]).

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

use crate::error::ConfigError;

/// An ordered string-keyed map of open values.
pub type ParamMap = IndexMap<String, ParamValue>;

// ============================================================================
// Number
// ============================================================================

/// A numeric scalar that remembers whether it was written as an integer.
///
/// Floats compare by bit pattern, so a `.nan` read from a document equals
/// the same `.nan` read again.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum Number {
    /// Integer literal
    Int(i64),
    /// Integer literal above `i64::MAX`
    UInt(u64),
    /// Floating-point literal
    Float(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Number {}

impl Number {
    /// Returns the value as `f64`, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::UInt(u) => u as f64,
            Self::Float(f) => f,
        }
    }

    /// Returns the value if it was written as an integer that fits in `i64`.
    #[must_use]
    pub const fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i),
            Self::UInt(_) | Self::Float(_) => None,
        }
    }

    /// Returns the value if it was written as a non-negative integer.
    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        match self {
            Self::Int(i) => u64::try_from(i).ok(),
            Self::UInt(u) => Some(u),
            Self::Float(_) => None,
        }
    }

    /// Returns `true` if the value was written as an integer.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

// ============================================================================
// ParamValue
// ============================================================================

/// A dynamically typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `null` or `~`
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer or float scalar
    Number(Number),
    /// String scalar
    String(String),
    /// Sequence of values
    List(Vec<ParamValue>),
    /// Mapping with string keys
    Map(ParamMap),
}

impl ParamValue {
    /// Converts a parsed YAML value into an open value.
    ///
    /// Scalar mapping keys are converted to their textual form; mappings
    /// or sequences used as keys are rejected. Custom tags are dropped and
    /// the tagged value is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] naming `field` (extended with
    /// the nested key or index) if a mapping key is not a scalar.
    pub fn from_yaml(value: &Value, field: &str) -> Result<Self, ConfigError> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(number_from_yaml(n)),
            Value::String(s) => Self::String(s.clone()),
            Value::Sequence(items) => Self::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| Self::from_yaml(item, &format!("{field}[{idx}]")))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = ParamMap::with_capacity(map.len());
                for (key, item) in map {
                    let key = key_to_string(key, field)?;
                    let child = Self::from_yaml(item, &join_path(field, &key))?;
                    out.insert(key, child);
                }
                Self::Map(out)
            }
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value, field)?,
        })
    }

    /// Short name of this value's type, for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(Number::Int(_) | Number::UInt(_)) => "integer",
            Self::Number(Number::Float(_)) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "mapping",
        }
    }

    /// Returns `true` for [`ParamValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value if it is an integer literal.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Returns the value if it is a non-negative integer literal.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Returns any number as `f64`.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&ParamMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up `key` if this value is a mapping.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, item)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a YAML number, keeping integer literals exact.
#[must_use]
pub fn number_from_yaml(n: &serde_yaml::Number) -> Number {
    if let Some(i) = n.as_i64() {
        Number::Int(i)
    } else if let Some(u) = n.as_u64() {
        Number::UInt(u)
    } else {
        Number::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Converts a scalar mapping key to its string form.
///
/// # Errors
///
/// Returns [`ConfigError::TypeMismatch`] if the key is a mapping or a
/// sequence.
pub fn key_to_string(key: &Value, field: &str) -> Result<String, ConfigError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => key_to_string(&tagged.value, field),
        Value::Sequence(_) | Value::Mapping(_) => Err(ConfigError::type_mismatch(
            field,
            "mapping with scalar keys",
            "a non-scalar key",
        )),
    }
}

/// Appends `key` to a dotted field path.
#[must_use]
pub fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
