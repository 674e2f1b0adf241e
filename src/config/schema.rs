//! Schema declarations: which keys a configuration has and how each is checked.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Built-in conversion applied to a raw string value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionType {
    #[default]
    String,
    Number,
    Boolean,
    StringList,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::StringList => "string-list",
        })
    }
}

/// A converted configuration value.
///
/// Numbers that parse as integers are kept as [`ConfigValue::Integer`] so they
/// deserialize into integer fields; anything else numeric is a float.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Name of the variant, as used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "string-list",
        }
    }

    pub(crate) fn to_toml(&self) -> toml::Value {
        match self {
            Self::Bool(b) => toml::Value::Boolean(*b),
            Self::Integer(i) => toml::Value::Integer(*i),
            Self::Float(f) => toml::Value::Float(*f),
            Self::String(s) => toml::Value::String(s.clone()),
            Self::List(items) => {
                toml::Value::Array(items.iter().cloned().map(toml::Value::String).collect())
            }
        }
    }
}

/// String form used for allowed-value checks and template defaults.
///
/// Lists are joined with `,`, the inverse of `string-list` conversion.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

type ConvertFn = dyn Fn(&str) -> Result<ConfigValue, String> + Send + Sync;

/// A caller-supplied conversion that replaces the built-in one for a key.
#[derive(Clone)]
pub struct Converter(Arc<ConvertFn>);

impl Converter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<ConfigValue, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn convert(&self, raw: &str) -> Result<ConfigValue, String> {
        (self.0)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter(..)")
    }
}

/// Declaration of a single configuration key.
///
/// When both a type and a [`Converter`] are present, the converter wins; the
/// type then only annotates the generated template.
#[derive(Debug, Clone, Default)]
pub struct OptionSpec {
    description: String,
    kind: OptionType,
    required: bool,
    default: Option<ConfigValue>,
    allowed_values: Option<Vec<String>>,
    rename: Option<String>,
    converter: Option<Converter>,
}

impl OptionSpec {
    pub fn new(kind: OptionType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::new(OptionType::String)
    }

    pub fn number() -> Self {
        Self::new(OptionType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(OptionType::Boolean)
    }

    pub fn string_list() -> Self {
        Self::new(OptionType::StringList)
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when no raw value is found. It is emitted as given, without
    /// conversion or allowed-value checks.
    pub fn with_default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Stores the validated value under `name` instead of the schema key.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.rename = Some(name.into());
        self
    }

    pub fn convert_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<ConfigValue, String> + Send + Sync + 'static,
    {
        self.converter = Some(Converter::new(f));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> OptionType {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&ConfigValue> {
        self.default.as_ref()
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.allowed_values.as_deref()
    }

    pub fn renamed(&self) -> Option<&str> {
        self.rename.as_deref()
    }

    pub fn converter(&self) -> Option<&Converter> {
        self.converter.as_ref()
    }
}

/// One declared key, with the template section it was declared under.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub key: String,
    pub section: Option<String>,
    pub spec: OptionSpec,
}

impl SchemaEntry {
    /// Name the validated value is stored under.
    pub fn output_name(&self) -> &str {
        self.spec.renamed().unwrap_or(&self.key)
    }
}

/// Ordered set of option declarations.
///
/// Declaration order drives validation error order and template layout.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
    current_section: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    option: Vec<OptionDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionDecl {
    key: String,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default, rename = "type")]
    kind: OptionType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<ConfigValue>,
    #[serde(default)]
    allowed_values: Option<Vec<String>>,
    #[serde(default)]
    rename: Option<String>,
}

impl OptionDecl {
    fn into_entry(self) -> SchemaEntry {
        SchemaEntry {
            key: self.key,
            section: self.section,
            spec: OptionSpec {
                description: self.description,
                kind: self.kind,
                required: self.required,
                default: self.default,
                allowed_values: self.allowed_values,
                rename: self.rename,
                converter: None,
            },
        }
    }
}

/// Two schema keys whose validated values would land under the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConflict {
    /// The later key, whose value cannot be stored.
    pub key: String,
    pub output: String,
    /// The earlier key already stored under `output`.
    pub existing: String,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options declared after this call belong to the named section.
    pub fn section(mut self, name: impl Into<String>) -> Self {
        self.current_section = Some(name.into());
        self
    }

    /// Declares an option. Redeclaring a key replaces the earlier spec in place.
    pub fn option(mut self, key: impl Into<String>, spec: OptionSpec) -> Self {
        let key = key.into();
        let section = self.current_section.clone();
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.spec = spec;
                entry.section = section;
            }
            None => self.entries.push(SchemaEntry { key, section, spec }),
        }
        self
    }

    /// Reads a schema from `[[option]]` tables.
    ///
    /// ```toml
    /// [[option]]
    /// key = "PORT"
    /// type = "number"
    /// default = 3000
    /// section = "Server"
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: SchemaFile = toml::from_str(source).map_err(ConfigError::SchemaParse)?;
        let mut entries: Vec<SchemaEntry> = Vec::with_capacity(file.option.len());
        for decl in file.option {
            if entries.iter().any(|e| e.key == decl.key) {
                return Err(ConfigError::DuplicateOption(decl.key));
            }
            entries.push(decl.into_entry());
        }
        let schema = Self {
            entries,
            current_section: None,
        };
        if let Some(conflict) = schema.output_conflicts().into_iter().next() {
            return Err(ConfigError::DuplicateOption(conflict.output));
        }
        Ok(schema)
    }

    /// Entries whose output name (rename or key) was already taken by an
    /// earlier entry, in declaration order.
    pub fn output_conflicts(&self) -> Vec<OutputConflict> {
        let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for entry in &self.entries {
            let output = entry.output_name();
            match claimed.get(output) {
                Some(existing) => conflicts.push(OutputConflict {
                    key: entry.key.clone(),
                    output: output.to_string(),
                    existing: existing.to_string(),
                }),
                None => {
                    claimed.insert(output, &entry.key);
                }
            }
        }
        conflicts
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&OptionSpec> {
        self.entries.iter().find(|e| e.key == key).map(|e| &e.spec)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
