//! Lookup wrapper that fails on keys the schema never declared.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::schema::{ConfigValue, Schema};
use super::validate::ValidatedConfig;
use super::ConfigError;

/// A [`ValidatedConfig`] whose lookups fail loudly instead of returning
/// `None`.
///
/// A key is resolved by, in order:
/// 1. exact match on an output name,
/// 2. a schema key whose value was stored under a rename,
/// 3. case-insensitive match on an output name.
///
/// Keys matching none of these are [`ConfigError::UndefinedKey`]. Declared
/// keys without a value are [`ConfigError::UnsetKey`] from [`get`](Self::get)
/// and `Ok(None)` from [`get_optional`](Self::get_optional). Typed getters
/// report a value of another type as [`ConfigError::TypeMismatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct StrictConfig {
    config: ValidatedConfig,
    /// Schema key -> output name, for every declared key.
    aliases: BTreeMap<String, String>,
    /// Output names of every declared key, set or not.
    declared: BTreeSet<String>,
}

impl StrictConfig {
    pub fn new(config: ValidatedConfig, schema: &Schema) -> Self {
        let mut aliases = BTreeMap::new();
        let mut declared = BTreeSet::new();
        for entry in schema.entries() {
            aliases.insert(entry.key.clone(), entry.output_name().to_string());
            declared.insert(entry.output_name().to_string());
        }
        Self {
            config,
            aliases,
            declared,
        }
    }

    /// Resolves `key` to its output name.
    pub fn resolve(&self, key: &str) -> Result<&str, ConfigError> {
        if let Some(name) = self.declared.get(key) {
            return Ok(name.as_str());
        }
        if let Some(name) = self.aliases.get(key) {
            return Ok(name.as_str());
        }
        let wanted = key.to_lowercase();
        self.declared
            .iter()
            .find(|name| name.to_lowercase() == wanted)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UndefinedKey(key.to_string()))
    }

    pub fn get(&self, key: &str) -> Result<&ConfigValue, ConfigError> {
        self.get_optional(key)?
            .ok_or_else(|| ConfigError::UnsetKey(key.to_string()))
    }

    /// Like [`get`](Self::get), but a declared key without a value is `Ok(None)`.
    pub fn get_optional(&self, key: &str) -> Result<Option<&ConfigValue>, ConfigError> {
        let name = self.resolve(key)?;
        Ok(self.config.get(name))
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        typed(key, self.get(key)?, "string", ConfigValue::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Result<i64, ConfigError> {
        typed(key, self.get(key)?, "integer", ConfigValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Result<f64, ConfigError> {
        typed(key, self.get(key)?, "number", ConfigValue::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        typed(key, self.get(key)?, "boolean", ConfigValue::as_bool)
    }

    pub fn get_list(&self, key: &str) -> Result<&[String], ConfigError> {
        typed(key, self.get(key)?, "string-list", ConfigValue::as_list)
    }

    pub fn inner(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn into_inner(self) -> ValidatedConfig {
        self.config
    }
}

fn typed<'a, T>(
    key: &str,
    value: &'a ConfigValue,
    expected: &'static str,
    extract: impl FnOnce(&'a ConfigValue) -> Option<T>,
) -> Result<T, ConfigError> {
    extract(value).ok_or_else(|| ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: value.type_name(),
    })
}

impl fmt::Display for StrictConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self.config.iter() {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::RawEnv;
    use crate::config::merge::merge_for_schema;
    use crate::config::schema::OptionSpec;
    use crate::config::validate::validate;

    fn strict(schema: &Schema, text: &str) -> StrictConfig {
        let merged = merge_for_schema(schema, &RawEnv::parse(text), None);
        StrictConfig::new(validate(schema, &merged).unwrap(), schema)
    }

    #[test]
    fn test_exact_case_insensitive_and_rename() {
        let schema = Schema::new()
            .option("PORT", OptionSpec::number())
            .option("DATABASE_URL", OptionSpec::string().rename("dbUrl"));
        let config = strict(&schema, "PORT=8080\nDATABASE_URL=postgres://db\n");

        assert_eq!(config.get_i64("PORT").unwrap(), 8080);
        assert_eq!(config.get_i64("port").unwrap(), 8080);
        assert_eq!(config.get_i64("Port").unwrap(), 8080);

        assert_eq!(config.get_str("dbUrl").unwrap(), "postgres://db");
        assert_eq!(config.get_str("DATABASE_URL").unwrap(), "postgres://db");
        assert_eq!(config.get_str("DBURL").unwrap(), "postgres://db");
    }

    #[test]
    fn test_undeclared_key_fails() {
        let schema = Schema::new().option("PORT", OptionSpec::number());
        let config = strict(&schema, "PORT=1\n");

        let result = config.get("HOST");
        assert!(matches!(result, Err(ConfigError::UndefinedKey(k)) if k == "HOST"));
        assert!(matches!(
            config.get_optional("HOST"),
            Err(ConfigError::UndefinedKey(_))
        ));
    }

    #[test]
    fn test_declared_but_unset_key() {
        let schema = Schema::new().option("OPTIONAL", OptionSpec::string());
        let config = strict(&schema, "");

        assert_eq!(config.get_optional("optional").unwrap(), None);
        assert!(matches!(
            config.get("OPTIONAL"),
            Err(ConfigError::UnsetKey(k)) if k == "OPTIONAL"
        ));
        assert!(matches!(
            config.get_str("OPTIONAL"),
            Err(ConfigError::UnsetKey(_))
        ));
    }

    #[test]
    fn test_typed_getter_on_other_type_fails() {
        let schema = Schema::new()
            .option("NAME", OptionSpec::string())
            .option("PORT", OptionSpec::number());
        let config = strict(&schema, "NAME=demo\nPORT=80\n");

        let result = config.get_i64("NAME");
        assert!(matches!(
            result,
            Err(ConfigError::TypeMismatch { key, expected: "integer", found: "string" })
                if key == "NAME"
        ));
        assert_eq!(config.get_f64("PORT").unwrap(), 80.0);
        assert!(matches!(
            config.get_list("PORT"),
            Err(ConfigError::TypeMismatch { found: "integer", .. })
        ));
    }

    #[test]
    fn test_display_lists_values() {
        let schema = Schema::new()
            .option("A", OptionSpec::string())
            .option("B", OptionSpec::string_list());
        let config = strict(&schema, "A=x\nB=1,2\n");
        assert_eq!(config.to_string(), "A=x\nB=1,2\n");
    }
}
