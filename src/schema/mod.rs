//! Structural schemas over `serde_json::Value`.
//!
//! A [`Schema`] describes the shape a JSON value must have. It can be used three ways:
//!
//! - [`Schema::guard`] answers whether a value matches, building nothing.
//! - [`Schema::check`] reports the first mismatch as a [`ValidationError`].
//! - [`Schema::slice`] validates and returns a copy holding only the declared fields.

mod definitions;
mod describe;
mod error;

pub use definitions::*;
pub use error::*;

use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub enum Schema {
    String,
    Bool,
    Number {
        min: Option<f64>,
        max: Option<f64>,
        /// `min` itself is rejected.
        exclusive_min: bool,
    },
    Integer {
        min: i64,
        max: i64,
    },
    /// Exactly this value.
    Literal(Value),
    /// One of a fixed set of strings.
    OneOf {
        values: &'static [&'static str],
        lookup: HashSet<&'static str>,
    },
    Array(Box<Schema>),
    Tuple(Vec<Schema>),
    /// An object with the given fields; undeclared fields are ignored.
    Object(Vec<Field>),
    /// Like `Object`, but every field may be absent.
    Partial(Vec<Field>),
    /// The first alternative that matches wins.
    Or(Vec<Schema>),
    /// Both object schemas must match; the sliced fields are merged.
    And(Box<Schema>, Box<Schema>),
    /// A union of object schemas selected by the string in the `tag` field.
    Tagged {
        tag: &'static str,
        variants: Vec<(&'static str, Schema)>,
    },
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub schema: Schema,
    pub optional: bool,
}

pub fn field(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        schema,
        optional: false,
    }
}

pub fn optional(name: &'static str, schema: Schema) -> Field {
    Field {
        name,
        schema,
        optional: true,
    }
}

impl Schema {
    pub fn number() -> Self {
        Schema::Number {
            min: None,
            max: None,
            exclusive_min: false,
        }
    }

    /// A number strictly greater than zero.
    pub fn positive() -> Self {
        Schema::Number {
            min: Some(0.0),
            max: None,
            exclusive_min: true,
        }
    }

    /// A number normalized to `0..=1`.
    pub fn unit() -> Self {
        Schema::Number {
            min: Some(0.0),
            max: Some(1.0),
            exclusive_min: false,
        }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        Schema::Integer { min, max }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Schema::Literal(value.into())
    }

    pub fn one_of(values: &'static [&'static str]) -> Self {
        Schema::OneOf {
            values,
            lookup: values.iter().copied().collect(),
        }
    }

    pub fn array(item: Schema) -> Self {
        Schema::Array(Box::new(item))
    }

    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Object(fields.into_iter().collect())
    }

    pub fn partial(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Partial(fields.into_iter().collect())
    }

    pub fn tagged(tag: &'static str, variants: impl IntoIterator<Item = (&'static str, Schema)>) -> Self {
        Schema::Tagged {
            tag,
            variants: variants.into_iter().collect(),
        }
    }

    pub fn or(self, other: Schema) -> Self {
        match self {
            Schema::Or(mut alternatives) => {
                alternatives.push(other);
                Schema::Or(alternatives)
            }
            first => Schema::Or(vec![first, other]),
        }
    }

    pub fn and(self, other: Schema) -> Self {
        Schema::And(Box::new(self), Box::new(other))
    }

    /// True when `value` matches this schema.
    pub fn guard(&self, value: &Value) -> bool {
        self.walk(value, &mut Vec::new(), false).is_ok()
    }

    /// Validates `value` without building anything.
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        self.walk(value, &mut Vec::new(), false).map(|_| ())
    }

    /// Validates `value` and returns a copy holding only the fields this schema declares.
    pub fn slice(&self, value: &Value) -> Result<Value, ValidationError> {
        self.walk(value, &mut Vec::new(), true)
            .map(|sliced| sliced.unwrap_or(Value::Null))
    }

    /// Shared traversal. Returns `Some` with the sliced value only when `build` is set.
    fn walk(
        &self,
        value: &Value,
        path: &mut Vec<Segment>,
        build: bool,
    ) -> Result<Option<Value>, ValidationError> {
        let keep = |v: &Value| -> Result<Option<Value>, ValidationError> {
            Ok(build.then(|| v.clone()))
        };

        match self {
            Schema::String => match value {
                Value::String(_) => keep(value),
                _ => Err(ValidationError::new(path, "string", Some(value))),
            },
            Schema::Bool => match value {
                Value::Bool(_) => keep(value),
                _ => Err(ValidationError::new(path, "boolean", Some(value))),
            },
            Schema::Number {
                min,
                max,
                exclusive_min,
            } => {
                let in_range = value.as_f64().is_some_and(|n| {
                    min.is_none_or(|min| if *exclusive_min { n > min } else { n >= min })
                        && max.is_none_or(|max| n <= max)
                });

                if in_range {
                    keep(value)
                } else {
                    Err(ValidationError::new(path, self.expectation(), Some(value)))
                }
            }
            Schema::Integer { min, max } => {
                let in_range = value.as_i64().is_some_and(|n| n >= *min && n <= *max);

                if in_range {
                    keep(value)
                } else {
                    Err(ValidationError::new(path, self.expectation(), Some(value)))
                }
            }
            Schema::Literal(expected) => {
                if value == expected {
                    keep(value)
                } else {
                    Err(ValidationError::new(path, self.expectation(), Some(value)))
                }
            }
            Schema::OneOf { lookup, .. } => match value {
                Value::String(s) if lookup.contains(s.as_str()) => keep(value),
                _ => Err(ValidationError::new(path, self.expectation(), Some(value))),
            },
            Schema::Array(item) => {
                let Value::Array(items) = value else {
                    return Err(ValidationError::new(path, "array", Some(value)));
                };

                let mut out = Vec::with_capacity(if build { items.len() } else { 0 });
                for (i, v) in items.iter().enumerate() {
                    path.push(Segment::Index(i));
                    let sliced = item.walk(v, path, build)?;
                    path.pop();

                    out.extend(sliced);
                }

                Ok(build.then_some(Value::Array(out)))
            }
            Schema::Tuple(items) => {
                let Value::Array(values) = value else {
                    return Err(ValidationError::new(path, self.expectation(), Some(value)));
                };

                if values.len() != items.len() {
                    return Err(ValidationError::new(path, self.expectation(), Some(value)));
                }

                let mut out = Vec::new();
                for (i, (schema, v)) in items.iter().zip(values).enumerate() {
                    path.push(Segment::Index(i));
                    let sliced = schema.walk(v, path, build)?;
                    path.pop();

                    out.extend(sliced);
                }

                Ok(build.then_some(Value::Array(out)))
            }
            Schema::Object(fields) => walk_fields(fields, false, value, path, build),
            Schema::Partial(fields) => walk_fields(fields, true, value, path, build),
            Schema::Or(alternatives) => {
                for alternative in alternatives {
                    if alternative.guard(value) {
                        return alternative.walk(value, path, build);
                    }
                }

                Err(ValidationError::new(path, self.expectation(), Some(value)))
            }
            Schema::And(left, right) => {
                let left = left.walk(value, path, build)?;
                let right = right.walk(value, path, build)?;

                Ok(match (left, right) {
                    (Some(Value::Object(mut l)), Some(Value::Object(r))) => {
                        l.extend(r);
                        Some(Value::Object(l))
                    }
                    (left, _) => left,
                })
            }
            Schema::Tagged { tag, variants } => {
                if !value.is_object() {
                    return Err(ValidationError::new(path, "object", Some(value)));
                }

                let discriminant = value.get(*tag);
                let variant = discriminant
                    .and_then(Value::as_str)
                    .and_then(|d| variants.iter().find(|(name, _)| *name == d));

                match variant {
                    Some((_, schema)) => schema.walk(value, path, build),
                    None => {
                        path.push(Segment::Field(*tag));
                        let names = variants
                            .iter()
                            .map(|(name, _)| format!("\"{name}\""))
                            .collect::<Vec<_>>()
                            .join(" | ");
                        Err(ValidationError::new(path, names, discriminant))
                    }
                }
            }
        }
    }

    /// A one-line summary used in validation errors.
    pub fn expectation(&self) -> String {
        match self {
            Schema::String => "string".to_owned(),
            Schema::Bool => "boolean".to_owned(),
            Schema::Number {
                min: Some(min),
                max: Some(max),
                exclusive_min: false,
            } => format!("number in [{min}, {max}]"),
            Schema::Number {
                min: Some(min),
                max: Some(max),
                exclusive_min: true,
            } => format!("number in ({min}, {max}]"),
            Schema::Number {
                min: Some(min),
                exclusive_min: true,
                ..
            } => format!("number > {min}"),
            Schema::Number { min: Some(min), .. } => format!("number >= {min}"),
            Schema::Number { max: Some(max), .. } => format!("number <= {max}"),
            Schema::Number { .. } => "number".to_owned(),
            Schema::Integer { min, max } => format!("integer in [{min}, {max}]"),
            Schema::Literal(v) => v.to_string(),
            Schema::OneOf { values, .. } if values.len() <= 8 => values
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(" | "),
            Schema::OneOf { values, .. } => {
                format!("one of {} allowed strings", values.len())
            }
            Schema::Array(item) => format!("array of {}", item.expectation()),
            Schema::Tuple(items) => format!("array of length {}", items.len()),
            Schema::Object(_) | Schema::Partial(_) | Schema::And(..) => "object".to_owned(),
            Schema::Or(alternatives) => alternatives
                .iter()
                .map(Schema::expectation)
                .collect::<Vec<_>>()
                .join(" | "),
            Schema::Tagged { tag, .. } => format!("object tagged by \"{tag}\""),
        }
    }
}

fn walk_fields(
    fields: &[Field],
    all_optional: bool,
    value: &Value,
    path: &mut Vec<Segment>,
    build: bool,
) -> Result<Option<Value>, ValidationError> {
    let Value::Object(object) = value else {
        return Err(ValidationError::new(path, "object", Some(value)));
    };

    let mut out = Map::new();
    for f in fields {
        path.push(Segment::Field(f.name));

        match object.get(f.name) {
            Some(v) => {
                if let Some(sliced) = f.schema.walk(v, path, build)? {
                    out.insert(f.name.to_owned(), sliced);
                }
            }
            None if f.optional || all_optional => {}
            None => return Err(ValidationError::new(path, f.schema.expectation(), None)),
        }

        path.pop();
    }

    Ok(build.then_some(Value::Object(out)))
}
