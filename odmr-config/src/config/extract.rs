//! Typed field extraction from parsed YAML.
//!
//! A [`Section`] wraps one mapping of the document together with its dotted
//! path and the keys the schema defines for it, so every failure names the
//! exact field. Extraction is fail-fast: the first bad field aborts.

use odmr_config_core::config::value::{
    Number, ParamMap, ParamValue, join_path, key_to_string, number_from_yaml,
};
use serde_yaml::{Mapping, Value};

use crate::error::ConfigError;

/// Largest edit distance at which an unknown key is offered as a
/// correction for a missing one.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// One mapping of the document, addressed by its dotted path.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    map: &'a Mapping,
    path: String,
    fields: &'static [&'static str],
}

impl<'a> Section<'a> {
    /// Wraps the document root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is empty or its root
    /// is not a mapping.
    pub fn root(value: &'a Value, fields: &'static [&'static str]) -> Result<Self, ConfigError> {
        match untag(value) {
            Value::Mapping(map) => Ok(Self {
                map,
                path: String::new(),
                fields,
            }),
            Value::Null => Err(ConfigError::Parse {
                line: None,
                column: None,
                message: "document is empty".to_string(),
            }),
            other => Err(ConfigError::Parse {
                line: None,
                column: None,
                message: format!("document root must be a mapping, found {}", describe(other)),
            }),
        }
    }

    /// Wraps a nested mapping found at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TypeMismatch`] if `value` is not a mapping.
    pub fn new(
        value: &'a Value,
        path: impl Into<String>,
        fields: &'static [&'static str],
    ) -> Result<Self, ConfigError> {
        let path = path.into();
        match untag(value) {
            Value::Mapping(map) => Ok(Self { map, path, fields }),
            other => Err(ConfigError::type_mismatch(path, "mapping", describe(other))),
        }
    }

    /// Dotted path of this section (empty for the root).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dotted path of `key` inside this section.
    #[must_use]
    pub fn field_path(&self, key: &str) -> String {
        join_path(&self.path, key)
    }

    /// Returns the value at `key`, if present.
    #[must_use]
    pub fn optional(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).map(untag)
    }

    /// Returns the value at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`], with a spelling suggestion when
    /// an unknown key is close to `key`.
    pub fn require(&self, key: &str) -> Result<&'a Value, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingField {
            field: self.field_path(key),
            suggestion: self.suggest(key),
        })
    }

    /// Finds the unknown key closest to `key`, within
    /// [`MAX_SUGGESTION_DISTANCE`].
    fn suggest(&self, key: &str) -> Option<String> {
        self.map
            .keys()
            .filter_map(Value::as_str)
            .filter(|k| !self.fields.contains(k))
            .map(|k| (k, strsim::damerau_levenshtein(key, k)))
            .filter(|(_, dist)| *dist <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(_, dist)| *dist)
            .map(|(k, _)| k.to_string())
    }

    /// Reads a string field.
    ///
    /// # Errors
    ///
    /// Missing field or non-string value.
    pub fn string(&self, key: &str) -> Result<String, ConfigError> {
        match self.require(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(ConfigError::type_mismatch(
                self.field_path(key),
                "string",
                describe(other),
            )),
        }
    }

    /// Reads a string field that must not be blank.
    ///
    /// # Errors
    ///
    /// Missing field, non-string value, or blank string.
    pub fn non_empty_string(&self, key: &str) -> Result<String, ConfigError> {
        let value = self.string(key)?;
        if value.trim().is_empty() {
            return Err(ConfigError::type_mismatch(
                self.field_path(key),
                "non-empty string",
                "empty string",
            ));
        }
        Ok(value)
    }

    /// Reads an integer field that must be greater than zero.
    ///
    /// # Errors
    ///
    /// Missing field, non-integer value, or a value `<= 0`.
    pub fn positive_int(&self, key: &str) -> Result<u64, ConfigError> {
        positive_int(self.require(key)?, &self.field_path(key))
    }

    /// Reads a non-negative integer field that fits in `u32`.
    ///
    /// # Errors
    ///
    /// Missing field, non-integer value, negative or out-of-range value.
    pub fn index(&self, key: &str) -> Result<u32, ConfigError> {
        non_negative_u32(self.require(key)?, &self.field_path(key))
    }

    /// Reads a boolean field.
    ///
    /// # Errors
    ///
    /// Missing field or non-boolean value.
    pub fn boolean(&self, key: &str) -> Result<bool, ConfigError> {
        match self.require(key)? {
            Value::Bool(b) => Ok(*b),
            other => Err(ConfigError::type_mismatch(
                self.field_path(key),
                "boolean",
                describe(other),
            )),
        }
    }

    /// Reads a finite number field.
    ///
    /// # Errors
    ///
    /// Missing field, non-numeric or non-finite value.
    pub fn number(&self, key: &str) -> Result<Number, ConfigError> {
        finite_number(self.require(key)?, &self.field_path(key))
    }

    /// Reads an optional finite number field; `null` counts as absent.
    ///
    /// # Errors
    ///
    /// Non-numeric or non-finite value.
    pub fn optional_number(&self, key: &str) -> Result<Option<Number>, ConfigError> {
        match self.optional(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => finite_number(value, &self.field_path(key)).map(Some),
        }
    }

    /// Opens the nested mapping at `key`.
    ///
    /// # Errors
    ///
    /// Missing field or non-mapping value.
    pub fn section(
        &self,
        key: &str,
        fields: &'static [&'static str],
    ) -> Result<Section<'a>, ConfigError> {
        Section::new(self.require(key)?, self.field_path(key), fields)
    }

    /// Lists the entries of the mapping at `key`; `null` is an empty mapping.
    ///
    /// # Errors
    ///
    /// Missing field, non-mapping value, or non-scalar keys.
    pub fn entries(&self, key: &str) -> Result<Vec<(String, &'a Value)>, ConfigError> {
        entries(self.require(key)?, &self.field_path(key))
    }

    /// Reads the mapping at `key` as an open parameter bag.
    ///
    /// # Errors
    ///
    /// Missing field, non-mapping value, or non-scalar keys.
    pub fn params(&self, key: &str) -> Result<ParamMap, ConfigError> {
        let path = self.field_path(key);
        entries(self.require(key)?, &path)?
            .into_iter()
            .map(|(k, v)| {
                let child = ParamValue::from_yaml(v, &join_path(&path, &k))?;
                Ok((k, child))
            })
            .collect()
    }

    /// Collects every key the schema does not define for this section.
    ///
    /// # Errors
    ///
    /// Non-scalar keys.
    pub fn extra(&self) -> Result<ParamMap, ConfigError> {
        let mut extra = ParamMap::new();
        for (key, value) in self.map {
            let key = key_to_string(key, &self.path)?;
            if self.fields.contains(&key.as_str()) {
                continue;
            }
            let child = ParamValue::from_yaml(value, &self.field_path(&key))?;
            extra.insert(key, child);
        }
        Ok(extra)
    }
}

// ============================================================================
// Value helpers
// ============================================================================

/// Strips a custom YAML tag, keeping the tagged value.
#[must_use]
pub fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Describes a value for a `found` diagnostic.
#[must_use]
pub fn describe(value: &Value) -> String {
    const MAX_SHOWN: usize = 40;
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) if n.is_f64() => format!("float {n}"),
        Value::Number(n) => format!("integer {n}"),
        Value::String(s) if s.chars().count() > MAX_SHOWN => {
            let head: String = s.chars().take(MAX_SHOWN).collect();
            format!("string \"{head}...\"")
        }
        Value::String(s) => format!("string {s:?}"),
        Value::Sequence(_) => "sequence".to_string(),
        Value::Mapping(_) => "mapping".to_string(),
        Value::Tagged(tagged) => describe(&tagged.value),
    }
}

/// Lists the entries of a mapping value; `null` is an empty mapping.
///
/// # Errors
///
/// Returns [`ConfigError::TypeMismatch`] for non-mapping values or
/// non-scalar keys.
pub fn entries<'a>(value: &'a Value, path: &str) -> Result<Vec<(String, &'a Value)>, ConfigError> {
    match untag(value) {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| Ok((key_to_string(k, path)?, untag(v))))
            .collect(),
        other => Err(ConfigError::type_mismatch(path, "mapping", describe(other))),
    }
}

/// Reads an integer greater than zero.
///
/// # Errors
///
/// Returns [`ConfigError::TypeMismatch`] for anything else, including
/// floats with an integral value.
pub fn positive_int(value: &Value, field: &str) -> Result<u64, ConfigError> {
    match untag(value) {
        Value::Number(n) => match n.as_u64() {
            Some(v) if v > 0 => Ok(v),
            _ => Err(ConfigError::type_mismatch(
                field,
                "positive integer",
                describe(value),
            )),
        },
        other => Err(ConfigError::type_mismatch(
            field,
            "positive integer",
            describe(other),
        )),
    }
}

/// Reads a non-negative integer that fits in `u32`.
///
/// # Errors
///
/// Returns [`ConfigError::TypeMismatch`] for anything else.
pub fn non_negative_u32(value: &Value, field: &str) -> Result<u32, ConfigError> {
    let expected = "non-negative integer";
    match untag(value) {
        Value::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ConfigError::type_mismatch(field, expected, describe(value))),
        other => Err(ConfigError::type_mismatch(field, expected, describe(other))),
    }
}

/// Reads a finite number, keeping integers exact.
///
/// # Errors
///
/// Returns [`ConfigError::TypeMismatch`] for non-numbers, `.nan` and `.inf`.
pub fn finite_number(value: &Value, field: &str) -> Result<Number, ConfigError> {
    match untag(value) {
        Value::Number(n) => {
            let number = number_from_yaml(n);
            if number.as_f64().is_finite() {
                Ok(number)
            } else {
                Err(ConfigError::type_mismatch(
                    field,
                    "finite number",
                    describe(value),
                ))
            }
        }
        other => Err(ConfigError::type_mismatch(field, "number", describe(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["averages", "compress"];

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_root_rejects_empty_and_scalar() {
        assert!(matches!(
            Section::root(&Value::Null, FIELDS),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            Section::root(&yaml("- 1\n- 2"), FIELDS),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_field_with_suggestion() {
        let doc = yaml("averges: 5");
        let root = Section::root(&doc, FIELDS).unwrap();
        match root.require("averages") {
            Err(ConfigError::MissingField { field, suggestion }) => {
                assert_eq!(field, "averages");
                assert_eq!(suggestion.as_deref(), Some("averges"));
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_field_no_suggestion_for_distant_keys() {
        let doc = yaml("totally_unrelated: 5");
        let root = Section::root(&doc, FIELDS).unwrap();
        match root.require("averages") {
            Err(ConfigError::MissingField { suggestion, .. }) => assert!(suggestion.is_none()),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn test_positive_int_rejects_zero_negative_and_float() {
        for (text, found) in [("0", "integer 0"), ("-2", "integer -2"), ("5.0", "float 5.0")] {
            let err = positive_int(&yaml(text), "averages").unwrap_err();
            match err {
                ConfigError::TypeMismatch { field, found: f, .. } => {
                    assert_eq!(field, "averages");
                    assert_eq!(f, found);
                }
                other => panic!("expected TypeMismatch, got {other:?}"),
            }
        }
        assert_eq!(positive_int(&yaml("5"), "averages").unwrap(), 5);
    }

    #[test]
    fn test_positive_int_rejects_quoted_number() {
        let err = positive_int(&yaml("\"5\""), "averages").unwrap_err();
        assert!(err.to_string().contains("string \"5\""));
    }

    #[test]
    fn test_non_negative_u32_bounds() {
        assert_eq!(non_negative_u32(&yaml("0"), "ch").unwrap(), 0);
        assert!(non_negative_u32(&yaml("-1"), "ch").is_err());
        assert!(non_negative_u32(&yaml("4294967296"), "ch").is_err());
    }

    #[test]
    fn test_finite_number_keeps_integers() {
        assert_eq!(finite_number(&yaml("10"), "x").unwrap(), Number::Int(10));
        assert_eq!(finite_number(&yaml("0.5"), "x").unwrap(), Number::Float(0.5));
        assert!(finite_number(&yaml(".nan"), "x").is_err());
        assert!(finite_number(&yaml(".inf"), "x").is_err());
    }

    #[test]
    fn test_entries_null_is_empty() {
        assert!(entries(&Value::Null, "static_devices").unwrap().is_empty());
        assert!(entries(&yaml("[1]"), "static_devices").is_err());
    }

    #[test]
    fn test_extra_collects_unknown_keys() {
        let doc = yaml("averages: 1\nnote: hello\ncompress: true");
        let root = Section::root(&doc, FIELDS).unwrap();
        let extra = root.extra().unwrap();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra["note"].as_str(), Some("hello"));
    }

    #[test]
    fn test_nested_paths() {
        let doc = yaml("data:\n  compress: maybe");
        let root = Section::root(&doc, &["data"]).unwrap();
        let data = root.section("data", FIELDS).unwrap();
        let err = data.boolean("compress").unwrap_err();
        assert_eq!(err.field(), Some("data.compress"));
    }

    #[test]
    fn test_tagged_values_are_unwrapped() {
        let doc = yaml("averages: !custom 5");
        let root = Section::root(&doc, FIELDS).unwrap();
        assert_eq!(root.positive_int("averages").unwrap(), 5);
    }

    #[test]
    fn test_describe_truncates_long_strings() {
        let long = "x".repeat(100);
        let described = describe(&Value::String(long));
        assert!(described.ends_with("...\""));
        assert!(described.len() < 60);
    }
}
