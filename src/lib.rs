pub mod config;

pub use config::{
    render_template, write_template, ConfigError, ConfigValue, EnvSource, LoadReport, Loader,
    OptionSpec, OptionType, Schema, StrictConfig, ValidatedConfig,
};
