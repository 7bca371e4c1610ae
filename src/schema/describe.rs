use super::{Field, Schema};

const INDENT: &str = "  ";

impl Schema {
    /// Renders this schema as a TypeScript-style type expression.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, 0);
        out
    }

    /// Renders `type <name> = ...;`.
    pub fn declaration(&self, name: &str) -> String {
        format!("type {name} = {};\n", self.describe())
    }

    fn render(&self, out: &mut String, depth: usize) {
        match self {
            Schema::String => out.push_str("string"),
            Schema::Bool => out.push_str("boolean"),
            Schema::Number {
                min,
                max,
                exclusive_min,
            } => {
                out.push_str("number");
                match (min, max) {
                    (Some(min), Some(max)) => out.push_str(&format!(" /* {min} to {max} */")),
                    (Some(min), None) if *exclusive_min => out.push_str(&format!(" /* > {min} */")),
                    (Some(min), None) => out.push_str(&format!(" /* >= {min} */")),
                    (None, Some(max)) => out.push_str(&format!(" /* <= {max} */")),
                    (None, None) => {}
                }
            }
            Schema::Integer { min, max } => {
                out.push_str("number /* integer");
                if *min > i64::MIN {
                    out.push_str(&format!(", >= {min}"));
                }
                if *max < i64::MAX {
                    out.push_str(&format!(", <= {max}"));
                }
                out.push_str(" */");
            }
            Schema::Literal(v) => out.push_str(&v.to_string()),
            Schema::OneOf { values, .. } => {
                let mut seen: Vec<&str> = Vec::with_capacity(values.len());
                for v in values.iter().copied() {
                    if !seen.contains(&v) {
                        seen.push(v);
                    }
                }

                let rendered = seen
                    .iter()
                    .map(|v| format!("\"{v}\""))
                    .collect::<Vec<_>>()
                    .join(" | ");
                out.push_str(&rendered);
            }
            Schema::Array(item) => {
                out.push_str("Array<");
                item.render(out, depth);
                out.push('>');
            }
            Schema::Tuple(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out, depth);
                }
                out.push(']');
            }
            Schema::Object(fields) => render_fields(fields, out, depth),
            Schema::Partial(fields) => {
                out.push_str("Partial<");
                render_fields(fields, out, depth);
                out.push('>');
            }
            Schema::Or(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" | ");
                    }
                    alternative.render(out, depth);
                }
            }
            Schema::And(left, right) => {
                left.render(out, depth);
                out.push_str(" & ");
                right.render(out, depth);
            }
            Schema::Tagged { variants, .. } => {
                for (_, variant) in variants {
                    out.push('\n');
                    push_indent(out, depth + 1);
                    out.push_str("| ");
                    variant.render(out, depth + 1);
                }
                out.push('\n');
                push_indent(out, depth);
            }
        }
    }
}

fn render_fields(fields: &[Field], out: &mut String, depth: usize) {
    out.push_str("{\n");
    for f in fields {
        push_indent(out, depth + 1);
        out.push_str(f.name);
        if f.optional {
            out.push('?');
        }
        out.push_str(": ");
        f.schema.render(out, depth + 1);
        out.push_str(",\n");
    }
    push_indent(out, depth);
    out.push('}');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}
