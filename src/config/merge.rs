//! Combining parsed files and the override mapping into one raw value per key.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::env::EnvSource;
use super::file::RawEnv;
use super::schema::Schema;
use super::source::FileSystem;
use super::ConfigError;

/// Where a merged value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueOrigin {
    File,
    Override,
}

/// Raw values for schema keys, keyed by schema key.
#[derive(Debug, Clone, Default)]
pub struct Merged {
    pub values: BTreeMap<String, (String, ValueOrigin)>,
}

impl Merged {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|(value, _)| value.as_str())
    }

    pub fn origin(&self, key: &str) -> Option<ValueOrigin> {
        self.values.get(key).map(|(_, origin)| *origin)
    }
}

/// Reads every path in order into one [`RawEnv`]; later files override
/// earlier ones. A read failure aborts the load.
pub fn read_files(fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<RawEnv, ConfigError> {
    let mut env = RawEnv::new();
    for path in paths {
        let contents = fs
            .read_to_string(path)
            .map_err(|source| ConfigError::ReadError {
                path: path.clone(),
                source,
            })?;
        env.extend_from_str(&contents, Some(path));
    }
    Ok(env)
}

/// Picks a raw value for every schema key.
///
/// Files are consulted first, then `overrides` when given. Both lookups
/// compare Unicode-lowercased keys. Keys found in neither are left out.
pub fn merge_for_schema(schema: &Schema, files: &RawEnv, overrides: Option<&EnvSource>) -> Merged {
    let mut merged = Merged::default();

    for entry in schema.entries() {
        let found = lookup_ignore_case(files.values(), &entry.key)
            .map(|value| (value.to_string(), ValueOrigin::File))
            .or_else(|| {
                overrides
                    .and_then(|env| lookup_ignore_case(env.vars(), &entry.key))
                    .map(|value| (value.to_string(), ValueOrigin::Override))
            });

        if let Some(found) = found {
            merged.values.insert(entry.key.clone(), found);
        }
    }

    merged
}

/// Case-insensitive lookup using `str::to_lowercase`. An exact match wins;
/// otherwise the first key in map order whose lowercase form matches.
pub(crate) fn lookup_ignore_case<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<&'a V> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let wanted = key.to_lowercase();
    map.iter()
        .find(|(candidate, _)| candidate.to_lowercase() == wanted)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::OptionSpec;
    use crate::config::source::OsFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new()
            .option("PORT", OptionSpec::number())
            .option("HOST", OptionSpec::string())
            .option("MODE", OptionSpec::string())
    }

    #[test]
    fn test_file_lookup_ignores_case() {
        let files = RawEnv::parse("port=8080\n");
        let merged = merge_for_schema(&schema(), &files, None);

        assert_eq!(merged.get("PORT"), Some("8080"));
        assert_eq!(merged.origin("PORT"), Some(ValueOrigin::File));
        assert_eq!(merged.get("HOST"), None);
    }

    #[test]
    fn test_files_take_precedence_over_overrides() {
        let files = RawEnv::parse("PORT=8080\n");
        let env = EnvSource::from_map([("PORT", "9090"), ("host", "example.com")]);
        let merged = merge_for_schema(&schema(), &files, Some(&env));

        assert_eq!(merged.get("PORT"), Some("8080"));
        assert_eq!(merged.get("HOST"), Some("example.com"));
        assert_eq!(merged.origin("HOST"), Some(ValueOrigin::Override));
        assert_eq!(merged.get("MODE"), None);
    }

    #[test]
    fn test_ambiguous_case_is_deterministic() {
        let files = RawEnv::parse("mode=a\nMode=b\n");
        let merged = merge_for_schema(&schema(), &files, None);
        // "Mode" sorts before "mode"
        assert_eq!(merged.get("MODE"), Some("b"));

        let files = RawEnv::parse("mode=a\nMODE=b\n");
        let merged = merge_for_schema(&schema(), &files, None);
        assert_eq!(merged.get("MODE"), Some("b"));
    }

    #[test]
    fn test_read_files_later_overrides_earlier() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base.env");
        let local = dir.path().join("local.env");
        fs::write(&base, "SHARED=base\nOVERRIDE=base\n").unwrap();
        fs::write(&local, "OVERRIDE=override\nEXTRA=added\n").unwrap();

        let env = read_files(&OsFileSystem, &[base.clone(), local.clone()]).unwrap();

        assert_eq!(env.get("SHARED"), Some("base"));
        assert_eq!(env.get("OVERRIDE"), Some("override"));
        assert_eq!(env.get("EXTRA"), Some("added"));
        assert_eq!(env.duplicates().len(), 1);
        assert_eq!(env.duplicates()[0].previous.file.as_ref(), Some(&base));
    }

    #[test]
    fn test_read_failure_propagates() {
        let dir = TempDir::new().unwrap();
        // A directory exists but cannot be read as text.
        let result = read_files(&OsFileSystem, &[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
