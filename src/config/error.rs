use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration:\n{0}")]
    Validation(ValidationErrors),

    #[error("undefined configuration key: {0}")]
    UndefinedKey(String),

    #[error("configuration key is declared but has no value: {0}")]
    UnsetKey(String),

    #[error("configuration key {key} holds a {found}, not a {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to parse schema: {0}")]
    SchemaParse(toml::de::Error),

    #[error("option declared more than once: {0}")]
    DuplicateOption(String),

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] toml::de::Error),
}

/// A single problem found while validating one schema key.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationIssue {
    Missing {
        key: String,
    },
    Conversion {
        key: String,
        value: String,
        reason: String,
    },
    Disallowed {
        key: String,
        value: String,
        allowed: Vec<String>,
    },
    OutputConflict {
        key: String,
        output: String,
        existing: String,
    },
}

impl ValidationIssue {
    /// The schema key this issue belongs to.
    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key }
            | Self::Conversion { key, .. }
            | Self::Disallowed { key, .. }
            | Self::OutputConflict { key, .. } => key,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "{key}: required but not set"),
            Self::Conversion { key, value, reason } => {
                write!(f, "{key}: cannot convert '{value}': {reason}")
            }
            Self::Disallowed {
                key,
                value,
                allowed,
            } => write!(
                f,
                "{key}: invalid value '{value}' (allowed: {})",
                allowed.join(", ")
            ),
            Self::OutputConflict {
                key,
                output,
                existing,
            } => write!(f, "{key}: output name '{output}' is already used by {existing}"),
        }
    }
}

/// Every issue collected during one validation pass, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Keys reported as missing, in schema order.
    pub fn missing_keys(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ValidationIssue::Missing { key } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing = self.missing_keys();
        let mut lines = Vec::with_capacity(self.issues.len() + 1);
        if !missing.is_empty() {
            lines.push(format!("missing required configuration: {}", missing.join(", ")));
        }
        lines.extend(self.issues.iter().map(ToString::to_string));
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_leads_with_missing_keys() {
        let mut errors = ValidationErrors::default();
        errors.push(ValidationIssue::Conversion {
            key: "PORT".into(),
            value: "abc".into(),
            reason: "not a number".into(),
        });
        errors.push(ValidationIssue::Missing {
            key: "API_KEY".into(),
        });

        let report = errors.to_string();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "missing required configuration: API_KEY");
        assert_eq!(lines[1], "PORT: cannot convert 'abc': not a number");
        assert_eq!(lines[2], "API_KEY: required but not set");
    }

    #[test]
    fn test_report_without_missing_keys_has_no_header() {
        let mut errors = ValidationErrors::default();
        errors.push(ValidationIssue::Disallowed {
            key: "MODE".into(),
            value: "invalid".into(),
            allowed: vec!["production".into(), "development".into()],
        });

        assert_eq!(
            errors.to_string(),
            "MODE: invalid value 'invalid' (allowed: production, development)"
        );
    }
}
