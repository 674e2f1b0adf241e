use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::env::EnvSource;
use super::file::DuplicateKey;
use super::merge::{merge_for_schema, read_files, ValueOrigin};
use super::resolve::{resolve_files, Resolution};
use super::schema::Schema;
use super::source::{FileSystem, OsFileSystem};
use super::strict::StrictConfig;
use super::validate::{validate, ValidatedConfig};
use super::ConfigError;

const DEFAULT_SEARCH_PATH: &str = ".";
const DEFAULT_FILE_NAME: &str = ".env";

/// Builder for loading and validating `key=value` configuration files.
///
/// Every file name is tried in every search path, directory first: all names
/// in the first directory, then all names in the second, and so on. By
/// default only the first file found is read; with [`merge`](Self::merge)
/// every file found is read and later files override earlier ones.
///
/// Keys declared in the schema but absent from every file fall back to the
/// process environment, unless [`env_fallback`](Self::env_fallback) is off.
///
/// ## Example
///
/// ```no_run
/// use envguard::{Loader, OptionSpec, Schema};
///
/// let schema = Schema::new()
///     .option("PORT", OptionSpec::number().with_default(3000))
///     .option("NODE_ENV", OptionSpec::string().allowed(["production", "development"]).required());
///
/// let config = Loader::new()
///     .search_path("config")
///     .file_name(".env")
///     .file_name(".env.local")
///     .merge(true)
///     .load(&schema)?;
///
/// let port = config.get_i64("PORT");
/// # Ok::<(), envguard::ConfigError>(())
/// ```
#[derive(Debug)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct Loader {
    search_paths: Vec<PathBuf>,
    file_names: Vec<PathBuf>,
    resolution: Resolution,
    debug: bool,
    env_fallback: bool,
    overrides: Option<EnvSource>,
    fs: Box<dyn FileSystem>,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            file_names: Vec::new(),
            resolution: Resolution::FirstMatch,
            debug: false,
            env_fallback: true,
            overrides: None,
            fs: Box::new(OsFileSystem),
        }
    }
}

/// Result of a load with the details behind it.
#[derive(Debug)]
pub struct LoadReport {
    pub config: ValidatedConfig,
    /// Files read, in the order they were applied.
    pub files: Vec<PathBuf>,
    /// Keys assigned more than once. Only collected in debug mode.
    pub warnings: Vec<DuplicateKey>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory to search. Defaults to the current directory when
    /// none is added.
    pub fn search_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.search_paths.push(dir.as_ref().to_path_buf());
        self
    }

    pub fn search_paths<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.search_paths
            .extend(dirs.into_iter().map(|d| d.as_ref().to_path_buf()));
        self
    }

    /// Adds a candidate file name. Defaults to `.env` when none is added.
    pub fn file_name(mut self, name: impl AsRef<Path>) -> Self {
        self.file_names.push(name.as_ref().to_path_buf());
        self
    }

    pub fn file_names<I, P>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.file_names
            .extend(names.into_iter().map(|n| n.as_ref().to_path_buf()));
        self
    }

    /// Reads every file found instead of only the first.
    pub fn merge(mut self, merge: bool) -> Self {
        self.resolution = if merge {
            Resolution::MergeAll
        } else {
            Resolution::FirstMatch
        };
        self
    }

    /// Same as [`merge`](Self::merge).
    pub fn cascade(self, cascade: bool) -> Self {
        self.merge(cascade)
    }

    /// Traces file discovery, value sources and duplicate keys.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn env_fallback(mut self, enabled: bool) -> Self {
        self.env_fallback = enabled;
        self
    }

    /// Uses `overrides` instead of the process environment for fallback.
    pub fn overrides(mut self, overrides: EnvSource) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    pub fn load(&self, schema: &Schema) -> Result<ValidatedConfig, ConfigError> {
        self.load_report(schema).map(|report| report.config)
    }

    pub fn load_strict(&self, schema: &Schema) -> Result<StrictConfig, ConfigError> {
        let config = self.load(schema)?;
        Ok(StrictConfig::new(config, schema))
    }

    /// Resolves, reads, merges and validates in one pass.
    pub fn load_report(&self, schema: &Schema) -> Result<LoadReport, ConfigError> {
        let files = self.resolve();
        if self.debug {
            debug!(files = ?files, "resolved configuration files");
        }

        let raw = read_files(self.fs.as_ref(), &files)?;

        let warnings = if self.debug {
            for dup in raw.duplicates() {
                warn!("{dup}");
            }
            raw.duplicates().to_vec()
        } else {
            Vec::new()
        };

        let process_env;
        let overrides = match (&self.overrides, self.env_fallback) {
            (_, false) => None,
            (Some(overrides), true) => Some(overrides),
            (None, true) => {
                process_env = EnvSource::from_process();
                Some(&process_env)
            }
        };

        let merged = merge_for_schema(schema, &raw, overrides);
        if self.debug {
            for entry in schema.entries() {
                let source = match merged.origin(&entry.key) {
                    Some(ValueOrigin::File) => "file",
                    Some(ValueOrigin::Override) => "override",
                    None if entry.spec.default_value().is_some() => "default",
                    None => "unset",
                };
                debug!(key = %entry.key, source, "resolved configuration key");
            }
        }

        let result = validate(schema, &merged);
        if self.debug {
            match &result {
                Ok(config) => debug!(keys = config.len(), "configuration validated"),
                Err(err) => debug!(error = %err, "configuration rejected"),
            }
        }

        Ok(LoadReport {
            config: result?,
            files,
            warnings,
        })
    }

    fn resolve(&self) -> Vec<PathBuf> {
        let default_dirs = [PathBuf::from(DEFAULT_SEARCH_PATH)];
        let default_names = [PathBuf::from(DEFAULT_FILE_NAME)];
        let dirs = if self.search_paths.is_empty() {
            &default_dirs[..]
        } else {
            &self.search_paths[..]
        };
        let names = if self.file_names.is_empty() {
            &default_names[..]
        } else {
            &self.file_names[..]
        };
        resolve_files(self.fs.as_ref(), dirs, names, self.resolution)
    }
}
