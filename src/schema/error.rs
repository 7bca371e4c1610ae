use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One step into a JSON tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Field(&'static str),
    Index(usize),
}

/// Renders a path as `tracks[0].notes[3].velocity`.
pub fn render_path(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            Segment::Index(i) => out.push_str(&format!("[{i}]")),
        }
    }
    out
}

/// The first place an input value disagreed with its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: expected {expected}, found {found}", DisplayPath(.path))]
pub struct ValidationError {
    /// Dotted path to the offending field; empty for the root value.
    pub path: String,
    pub expected: String,
    pub found: String,
}

struct DisplayPath<'a>(&'a str);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl ValidationError {
    pub fn new(path: &[Segment], expected: impl Into<String>, found: Option<&Value>) -> Self {
        Self {
            path: render_path(path),
            expected: expected.into(),
            found: found.map(describe_value).unwrap_or_else(|| "nothing".to_owned()),
        }
    }
}

/// A short description of what a JSON value actually is.
pub fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.chars().count() > 32 => {
            let head: String = s.chars().take(32).collect();
            format!("string \"{head}...\"")
        }
        Value::String(s) => format!("string \"{s}\""),
        Value::Array(items) => format!("array of length {}", items.len()),
        Value::Object(_) => "object".to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_rendering() {
        let path = [
            Segment::Field("tracks"),
            Segment::Index(0),
            Segment::Field("notes"),
            Segment::Index(12),
            Segment::Field("velocity"),
        ];
        assert_eq!(render_path(&path), "tracks[0].notes[12].velocity");
        assert_eq!(render_path(&[]), "");
    }

    #[test]
    fn error_message() {
        let err = ValidationError::new(
            &[Segment::Field("header"), Segment::Field("ppq")],
            "integer",
            None,
        );
        assert_eq!(err.to_string(), "header.ppq: expected integer, found nothing");

        let err = ValidationError::new(&[], "object", Some(&json!("loud")));
        assert_eq!(err.to_string(), "<root>: expected object, found string \"loud\"");
    }
}
