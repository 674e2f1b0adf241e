//! Schema-driven loading of `key=value` configuration files.
//!
//! A load runs once: resolve candidate files, parse them, merge them with the
//! override mapping, then convert and validate every schema key.

mod builder;
mod env;
mod error;
mod file;
mod merge;
mod resolve;
mod schema;
mod source;
mod strict;
mod template;
mod validate;

pub use builder::{LoadReport, Loader};
pub use env::EnvSource;
pub use error::{ConfigError, ValidationErrors, ValidationIssue};
pub use file::{DuplicateKey, Location, RawEnv};
pub use merge::{merge_for_schema, read_files, Merged, ValueOrigin};
pub use resolve::{resolve_files, Resolution};
pub use schema::{
    ConfigValue, Converter, OptionSpec, OptionType, OutputConflict, Schema, SchemaEntry,
};
pub use source::{FileSystem, OsFileSystem};
pub use strict::StrictConfig;
pub use template::{render_template, write_template};
pub use validate::{convert, validate, ValidatedConfig};
