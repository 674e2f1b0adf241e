//! Example configuration files generated from a schema.

use std::borrow::Cow;
use std::path::Path;

use super::schema::{OptionType, Schema, SchemaEntry};
use super::source::FileSystem;
use super::ConfigError;

/// Renders a commented example file for `schema`.
///
/// Each key gets comment lines describing it, then `KEY=` (required or no
/// default) or `KEY=<default>`, then a blank line. The output parses back
/// with the regular file parser. Defaults that start and end with a quote
/// are wrapped in double quotes. Defaults the parser cannot reproduce
/// (line breaks, outer whitespace) are noted in a comment and left empty.
pub fn render_template(schema: &Schema) -> String {
    let mut out = String::new();
    let mut section: Option<&str> = None;

    for entry in schema.entries() {
        let entry_section = entry.section.as_deref();
        if entry_section != section {
            if let Some(name) = entry_section {
                for line in name.lines() {
                    out.push_str(&format!("# --- {line} ---\n"));
                }
                out.push('\n');
            }
            section = entry_section;
        }

        for comment in comment_lines(entry) {
            out.push_str(&comment);
            out.push('\n');
        }

        let spec = &entry.spec;
        let default = match spec.default_value() {
            Some(default) if !spec.is_required() => Some(default.to_string()),
            _ => None,
        };
        match default.as_deref().map(file_value) {
            Some(Ok(value)) => out.push_str(&format!("{}={}\n", entry.key, value)),
            Some(Err(reason)) => {
                let default = default.as_deref().unwrap_or_default();
                out.push_str(&format!("# default {default:?} {reason}, set it manually\n"));
                out.push_str(&format!("{}=\n", entry.key));
            }
            None => out.push_str(&format!("{}=\n", entry.key)),
        }
        out.push('\n');
    }

    out
}

/// Renders the template and writes it to `path`.
pub fn write_template(
    schema: &Schema,
    path: impl AsRef<Path>,
    fs: &dyn FileSystem,
) -> Result<(), ConfigError> {
    let path = path.as_ref();
    fs.write(path, &render_template(schema))
        .map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
}

/// Form of `value` that the file parser reads back unchanged.
fn file_value(value: &str) -> Result<Cow<'_, str>, &'static str> {
    if value.contains(['\n', '\r']) {
        return Err("contains a line break");
    }
    if value.trim() != value {
        return Err("has leading or trailing whitespace");
    }
    let quoted = value.len() >= 2
        && ['"', '\''].iter().any(|q| value.starts_with(*q) && value.ends_with(*q));
    if quoted {
        Ok(Cow::Owned(format!("\"{value}\"")))
    } else {
        Ok(Cow::Borrowed(value))
    }
}

fn comment_lines(entry: &SchemaEntry) -> Vec<String> {
    let spec = &entry.spec;
    let mut annotations = Vec::new();

    if spec.kind() != OptionType::String {
        annotations.push(format!("[type: {}]", spec.kind()));
    }
    if let Some(allowed) = spec.allowed_values() {
        annotations.push(format!("[allowed: {}]", allowed.join(", ")));
    }
    if spec.is_required() {
        annotations.push("[required]".to_string());
    }

    let mut lines: Vec<String> = spec.description().lines().map(str::to_string).collect();
    let annotations = annotations.join(" ");
    match lines.last_mut() {
        Some(last) if !annotations.is_empty() => {
            last.push(' ');
            last.push_str(&annotations);
        }
        None if !annotations.is_empty() => lines.push(annotations),
        _ => {}
    }

    lines
        .into_iter()
        .map(|line| format!("# {line}").trim_end().to_string())
        .collect()
}
