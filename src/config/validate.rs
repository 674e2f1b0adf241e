//! Conversion and validation of merged raw values against the schema.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use super::error::{ValidationErrors, ValidationIssue};
use super::merge::Merged;
use super::schema::{ConfigValue, OptionType, Schema, SchemaEntry};
use super::ConfigError;

/// The validated, converted configuration. Never mutated after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl ValidatedConfig {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ConfigValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ConfigValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(ConfigValue::as_list)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserializes the values into a typed struct, keyed by output name.
    ///
    /// ```no_run
    /// use envguard::{Loader, OptionSpec, Schema};
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct Settings {
    ///     port: u16,
    /// }
    ///
    /// let schema = Schema::new().option("PORT", OptionSpec::number().rename("port"));
    /// let settings: Settings = Loader::new().load(&schema)?.deserialize()?;
    /// # Ok::<(), envguard::ConfigError>(())
    /// ```
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let table: toml::Table = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_toml()))
            .collect();
        toml::Value::Table(table)
            .try_into()
            .map_err(ConfigError::DeserializeError)
    }
}

/// Validates every schema key, collecting all problems before failing.
pub fn validate(schema: &Schema, merged: &Merged) -> Result<ValidatedConfig, ConfigError> {
    let mut values = BTreeMap::new();
    let mut errors = ValidationErrors::default();

    let conflicts = schema.output_conflicts();
    for conflict in &conflicts {
        errors.push(ValidationIssue::OutputConflict {
            key: conflict.key.clone(),
            output: conflict.output.clone(),
            existing: conflict.existing.clone(),
        });
    }

    for entry in schema.entries() {
        if conflicts.iter().any(|c| c.key == entry.key) {
            continue;
        }
        let spec = &entry.spec;
        let Some(raw) = merged.get(&entry.key) else {
            if let Some(default) = spec.default_value() {
                values.insert(entry.output_name().to_string(), default.clone());
            } else if spec.is_required() {
                errors.push(ValidationIssue::Missing {
                    key: entry.key.clone(),
                });
            }
            continue;
        };

        match check_value(entry, raw) {
            Ok(value) => {
                values.insert(entry.output_name().to_string(), value);
            }
            Err(issue) => errors.push(issue),
        }
    }

    if errors.is_empty() {
        Ok(ValidatedConfig { values })
    } else {
        Err(ConfigError::Validation(errors))
    }
}

fn check_value(entry: &SchemaEntry, raw: &str) -> Result<ConfigValue, ValidationIssue> {
    let spec = &entry.spec;
    let converted = match spec.converter() {
        Some(converter) => converter.convert(raw),
        None => convert(spec.kind(), raw),
    }
    .map_err(|reason| ValidationIssue::Conversion {
        key: entry.key.clone(),
        value: raw.to_string(),
        reason,
    })?;

    if let Some(allowed) = spec.allowed_values() {
        let shown = converted.to_string();
        if !allowed.iter().any(|a| *a == shown) {
            return Err(ValidationIssue::Disallowed {
                key: entry.key.clone(),
                value: shown,
                allowed: allowed.to_vec(),
            });
        }
    }

    Ok(converted)
}

/// Built-in conversion for `kind`.
pub fn convert(kind: OptionType, raw: &str) -> Result<ConfigValue, String> {
    match kind {
        OptionType::String => Ok(ConfigValue::String(raw.to_string())),
        OptionType::Number => parse_number(raw),
        OptionType::Boolean => Ok(ConfigValue::Bool(parse_bool(raw))),
        OptionType::StringList => Ok(ConfigValue::List(
            raw.split(',').map(|s| s.trim().to_string()).collect(),
        )),
    }
}

fn parse_number(raw: &str) -> Result<ConfigValue, String> {
    let s = raw.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Ok(ConfigValue::Integer(i));
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(ConfigValue::Float(f)),
        _ => Err("not a valid number".to_string()),
    }
}

/// Recognized words map to their value. Any other non-empty text is `true`,
/// the empty string is `false`.
fn parse_bool(raw: &str) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" | "" => false,
        _ => true,
    }
}
