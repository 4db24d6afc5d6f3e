//! Indented, field-labelled rendering of a tree for diagnostics.

use super::Value;

const INDENT: &str = "  ";

/// Render `value` as an indented tree, one field per line.
pub fn dump(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &Value, level: usize) {
    match value {
        Value::Node(node) => {
            out.push_str(node.kind().name());
            for (field, child) in node.fields() {
                newline(out, level + 1);
                out.push_str(field);
                out.push_str(": ");
                write_value(out, child, level + 1);
            }
        }
        Value::List(items) if items.is_empty() => out.push_str("[]"),
        Value::List(items) => {
            out.push('[');
            for item in items {
                newline(out, level + 1);
                write_value(out, item, level + 1);
            }
            newline(out, level);
            out.push(']');
        }
        Value::Map(entries) if entries.is_empty() => out.push_str("{}"),
        Value::Map(entries) => {
            out.push('{');
            for (key, item) in entries {
                newline(out, level + 1);
                out.push_str(&format!("{key:?}: "));
                write_value(out, item, level + 1);
            }
            newline(out, level);
            out.push('}');
        }
        Value::Str(s) => out.push_str(&format!("{s:?}")),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) => out.push_str(&format!("{f:?}")),
        Value::Bool(b) => out.push_str(&b.to_string()),
        Value::None => out.push_str("None"),
    }
}

fn newline(out: &mut String, level: usize) {
    out.push('\n');
    out.push_str(&INDENT.repeat(level));
}
