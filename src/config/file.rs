//! Parsing of `key=value` configuration files.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([\w.\-]+)\s*=\s*(.*)$").expect("valid assignment regex"));

/// Where a key was defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// A key assigned more than once; the later assignment won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateKey {
    pub key: String,
    pub previous: Location,
    pub current: Location,
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duplicate key '{}': {} overrides {}",
            self.key, self.current, self.previous
        )
    }
}

/// Unvalidated key/value pairs, keys exactly as written in the files.
#[derive(Debug, Clone, Default)]
pub struct RawEnv {
    values: BTreeMap<String, String>,
    origins: BTreeMap<String, Location>,
    duplicates: Vec<DuplicateKey>,
}

impl RawEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single file's text.
    pub fn parse(text: &str) -> Self {
        let mut env = Self::new();
        env.extend_from_str(text, None);
        env
    }

    /// Adds the assignments in `text`, overwriting keys already present.
    ///
    /// Blank lines, `#` comments and lines that are not assignments are
    /// skipped. One layer of matching quotes is stripped from values.
    pub fn extend_from_str(&mut self, text: &str, file: Option<&Path>) {
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(caps) = LINE_RE.captures(line) else {
                continue;
            };

            let key = caps[1].to_string();
            let value = unquote(caps[2].trim()).trim().to_string();
            let location = Location {
                file: file.map(Path::to_path_buf),
                line: index + 1,
            };

            if let Some(previous) = self.origins.insert(key.clone(), location.clone()) {
                self.duplicates.push(DuplicateKey {
                    key: key.clone(),
                    previous,
                    current: location,
                });
            }
            self.values.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn location(&self, key: &str) -> Option<&Location> {
        self.origins.get(key)
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn duplicates(&self) -> &[DuplicateKey] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_assignments() {
        let env = RawEnv::parse(
            "# comment\n\
             \n\
             PORT=5000\n\
             app.name = demo\n\
             log-level =   debug  \n",
        );

        assert_eq!(env.get("PORT"), Some("5000"));
        assert_eq!(env.get("app.name"), Some("demo"));
        assert_eq!(env.get("log-level"), Some("debug"));
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_strips_one_layer_of_quotes() {
        let env = RawEnv::parse(
            "A=\"double\"\n\
             B='single'\n\
             C=\"'nested'\"\n\
             D=\"unbalanced'\n\
             E=\"  padded  \"\n",
        );

        assert_eq!(env.get("A"), Some("double"));
        assert_eq!(env.get("B"), Some("single"));
        assert_eq!(env.get("C"), Some("'nested'"));
        assert_eq!(env.get("D"), Some("\"unbalanced'"));
        assert_eq!(env.get("E"), Some("padded"));
    }

    #[test]
    fn test_skips_non_assignments() {
        let env = RawEnv::parse("just text\nKEY WITH SPACE=1\n=novalue\nOK=\n");

        assert_eq!(env.len(), 1);
        assert_eq!(env.get("OK"), Some(""));
    }

    #[test]
    fn test_keys_keep_their_case() {
        let env = RawEnv::parse("Port=1\nPORT=2\n");
        assert_eq!(env.get("Port"), Some("1"));
        assert_eq!(env.get("PORT"), Some("2"));
        assert!(env.duplicates().is_empty());
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let env = RawEnv::parse("A=1\nB=2\nA=3\n");

        assert_eq!(env.get("A"), Some("3"));
        assert_eq!(
            env.duplicates(),
            [DuplicateKey {
                key: "A".into(),
                previous: Location { file: None, line: 1 },
                current: Location { file: None, line: 3 },
            }]
        );
    }

    #[test]
    fn test_duplicates_across_files_name_the_files() {
        let mut env = RawEnv::new();
        env.extend_from_str("A=1\n", Some(Path::new("base/.env")));
        env.extend_from_str("\nA=2\n", Some(Path::new("local/.env")));

        assert_eq!(env.get("A"), Some("2"));
        let dup = &env.duplicates()[0];
        assert_eq!(dup.previous.file.as_deref(), Some(Path::new("base/.env")));
        assert_eq!(dup.current.line, 2);
        assert_eq!(
            dup.to_string(),
            format!(
                "duplicate key 'A': {} overrides {}",
                Path::new("local/.env").display().to_string() + ":2",
                Path::new("base/.env").display().to_string() + ":1"
            )
        );
    }
}
