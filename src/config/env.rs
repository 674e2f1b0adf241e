//! Override mapping consulted for keys missing from every file.

use std::collections::BTreeMap;

/// Snapshot of flat string overrides, usually the process environment.
///
/// Keys are kept sorted, so a case-insensitive lookup that matches more than
/// one key always resolves to the same one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self::from_map(std::env::vars())
    }

    /// Captures the process environment variables that start with `prefix`,
    /// with the prefix removed. `APP_PORT` under prefix `APP_` becomes `PORT`.
    pub fn from_process_with_prefix(prefix: &str) -> Self {
        Self::from_map(std::env::vars()).with_prefix(prefix)
    }

    pub fn from_map<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Keeps only keys carrying `prefix` and strips it from them.
    pub fn with_prefix(self, prefix: &str) -> Self {
        let vars = self
            .vars
            .into_iter()
            .filter_map(|(key, value)| {
                let stripped = key.strip_prefix(prefix)?;
                if stripped.is_empty() {
                    return None;
                }
                Some((stripped.to_string(), value))
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
