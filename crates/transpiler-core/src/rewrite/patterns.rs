/*!
# Pattern Language

Structural patterns over [`Value`] trees. A pattern is checked top-down
against a target whose position is already known; it never searches for a
match location, that is the rewriter's job.
*/

use std::fmt;

use indexmap::IndexMap;

use crate::ast::{Kind, Node, SchemaError, Value};

use super::errors::{DuplicateCaptureError, MissingBindingError};
use super::TransformResult;

/// Restriction on what a capture accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Str,
    Int,
    Float,
    /// Int or Float.
    Number,
    Bool,
    None,
    List,
    Map,
    AnyNode,
    Kind(Kind),
}

impl Constraint {
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Constraint::Str, Value::Str(_))
            | (Constraint::Int, Value::Int(_))
            | (Constraint::Float, Value::Float(_))
            | (Constraint::Number, Value::Int(_) | Value::Float(_))
            | (Constraint::Bool, Value::Bool(_))
            | (Constraint::None, Value::None)
            | (Constraint::List, Value::List(_))
            | (Constraint::Map, Value::Map(_))
            | (Constraint::AnyNode, Value::Node(_)) => true,
            (Constraint::Kind(kind), Value::Node(node)) => node.kind() == *kind,
            _ => false,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Str => f.write_str("str"),
            Constraint::Int => f.write_str("int"),
            Constraint::Float => f.write_str("float"),
            Constraint::Number => f.write_str("number"),
            Constraint::Bool => f.write_str("bool"),
            Constraint::None => f.write_str("none"),
            Constraint::List => f.write_str("list"),
            Constraint::Map => f.write_str("dict"),
            Constraint::AnyNode => f.write_str("node"),
            Constraint::Kind(kind) => write!(f, "{kind}"),
        }
    }
}

/// A structural pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// Same kind, every field matching in schema order.
    Node { kind: Kind, fields: Vec<Pattern> },
    /// Any value accepted by one of `accepts` (or anything, if empty),
    /// bound under `name`.
    Capture { name: String, accepts: Vec<Constraint> },
    /// A sequence of exactly this length, matched pairwise.
    Seq(Vec<Pattern>),
    /// A mapping with exactly these keys.
    Map(IndexMap<String, Pattern>),
    /// A scalar compared by value. Integers and floats compare numerically.
    Literal(Value),
}

impl Pattern {
    /// Node pattern with field patterns in schema order.
    pub fn node<I>(kind: Kind, fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = Pattern>,
    {
        let fields: Vec<Pattern> = fields.into_iter().collect();
        if fields.len() != kind.arity() {
            return Err(SchemaError::Arity {
                kind,
                expected: kind.arity(),
                found: fields.len(),
            });
        }
        Ok(Pattern::Node { kind, fields })
    }

    /// Pattern for a field-less kind such as an operator or context.
    pub fn leaf(kind: Kind) -> Self {
        debug_assert_eq!(kind.arity(), 0, "{kind} is not a leaf kind");
        Pattern::Node {
            kind,
            fields: Vec::new(),
        }
    }

    pub fn capture(name: impl Into<String>) -> Self {
        Pattern::Capture {
            name: name.into(),
            accepts: Vec::new(),
        }
    }

    pub fn capture_as<I>(name: impl Into<String>, accepts: I) -> Self
    where
        I: IntoIterator<Item = Constraint>,
    {
        Pattern::Capture {
            name: name.into(),
            accepts: accepts.into_iter().collect(),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Pattern::Literal(value.into())
    }

    pub fn seq<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Pattern>,
    {
        Pattern::Seq(items.into_iter().collect())
    }

    /// Capture names in first-occurrence order.
    pub fn capture_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Pattern::Capture { name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Pattern::Node { fields, .. } | Pattern::Seq(fields) => {
                for field in fields {
                    field.collect_names(names);
                }
            }
            Pattern::Map(entries) => {
                for pattern in entries.values() {
                    pattern.collect_names(names);
                }
            }
            Pattern::Literal(_) => {}
        }
    }
}

/// Exact-shape pattern for a concrete value.
impl From<Value> for Pattern {
    fn from(value: Value) -> Self {
        match value {
            Value::Node(node) => node.into(),
            Value::List(items) => Pattern::Seq(items.into_iter().map(Pattern::from).collect()),
            Value::Map(entries) => Pattern::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Pattern::from(value)))
                    .collect(),
            ),
            scalar => Pattern::Literal(scalar),
        }
    }
}

impl From<Node> for Pattern {
    fn from(node: Node) -> Self {
        let kind = node.kind();
        Pattern::Node {
            kind,
            fields: node.into_fields().into_iter().map(Pattern::from).collect(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Node { kind, fields } if fields.is_empty() => write!(f, "{kind}"),
            Pattern::Node { kind, fields } => {
                write!(f, "{kind}(")?;
                write_joined(f, fields)?;
                f.write_str(")")
            }
            Pattern::Capture { name, accepts } if accepts.is_empty() => write!(f, "?{name}"),
            Pattern::Capture { name, accepts } => {
                write!(f, "?{name}:")?;
                for (i, constraint) in accepts.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{constraint}")?;
                }
                Ok(())
            }
            Pattern::Seq(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Pattern::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, pattern)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{key}': {pattern}")?;
                }
                f.write_str("}")
            }
            Pattern::Literal(Value::Str(s)) => write!(f, "{s:?}"),
            Pattern::Literal(Value::Float(x)) => write!(f, "{x:?}"),
            Pattern::Literal(Value::Int(n)) => write!(f, "{n}"),
            Pattern::Literal(Value::Bool(b)) => write!(f, "{b}"),
            Pattern::Literal(Value::None) => f.write_str("None"),
            Pattern::Literal(other) => write!(f, "{}", other.type_name()),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// What to do when one pattern captures the same name twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapturePolicy {
    /// Re-capturing an equal value is fine, a different value is an error.
    #[default]
    Strict,
    /// The later capture replaces the earlier one.
    Overwrite,
}

/// Name to value environment handed to a transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: IndexMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Result<&Value, MissingBindingError> {
        self.values.get(name).ok_or_else(|| MissingBindingError {
            name: name.to_string(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// The binding as a string.
    pub fn str(&self, name: &str) -> TransformResult<&str> {
        let value = self.get(name)?;
        value
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("binding `{name}` is a {}, expected a string", value.type_name()))
    }

    /// The binding as a node.
    pub fn node(&self, name: &str) -> TransformResult<&Node> {
        let value = self.get(name)?;
        value
            .as_node()
            .ok_or_else(|| anyhow::anyhow!("binding `{name}` is a {}, expected a node", value.type_name()))
    }

    /// The binding as a sequence.
    pub fn list(&self, name: &str) -> TransformResult<&[Value]> {
        let value = self.get(name)?;
        value
            .as_list()
            .ok_or_else(|| anyhow::anyhow!("binding `{name}` is a {}, expected a list", value.type_name()))
    }

    /// Captures plus external variables; external variables win on collision.
    pub fn merged(&self, external: &Bindings) -> Bindings {
        let mut values = self.values.clone();
        for (name, value) in &external.values {
            values.insert(name.clone(), value.clone());
        }
        Bindings { values }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Bindings
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Bindings {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Match `pattern` against `target`, recording captures in `bindings`.
///
/// Bindings made before a failure are left in place; callers discard the
/// whole map when the overall match fails.
pub fn matches(
    pattern: &Pattern,
    target: &Value,
    bindings: &mut Bindings,
    policy: CapturePolicy,
) -> Result<bool, DuplicateCaptureError> {
    match (pattern, target) {
        (Pattern::Node { kind, fields }, Value::Node(node)) => {
            if *kind != node.kind() || fields.len() != node.values().len() {
                return Ok(false);
            }
            for (field, value) in fields.iter().zip(node.values()) {
                if !matches(field, value, bindings, policy)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Pattern::Capture { name, accepts }, value) => {
            if !accepts.is_empty() && !accepts.iter().any(|c| c.accepts(value)) {
                return Ok(false);
            }
            bind(name, value, bindings, policy)?;
            Ok(true)
        }
        (Pattern::Seq(items), Value::List(targets)) => {
            if items.len() != targets.len() {
                return Ok(false);
            }
            for (item, value) in items.iter().zip(targets) {
                if !matches(item, value, bindings, policy)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Pattern::Map(entries), Value::Map(targets)) => {
            if entries.len() != targets.len() {
                return Ok(false);
            }
            for (key, entry) in entries {
                let Some(value) = targets.get(key) else {
                    return Ok(false);
                };
                if !matches(entry, value, bindings, policy)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Pattern::Literal(expected), value) => Ok(expected.scalar_eq(value)),
        _ => Ok(false),
    }
}

fn bind(
    name: &str,
    value: &Value,
    bindings: &mut Bindings,
    policy: CapturePolicy,
) -> Result<(), DuplicateCaptureError> {
    if policy == CapturePolicy::Strict {
        if let Some(previous) = bindings.lookup(name) {
            if previous != value {
                return Err(DuplicateCaptureError {
                    name: name.to_string(),
                });
            }
            return Ok(());
        }
    }
    bindings.insert(name, value.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;

    fn pow_pattern() -> Pattern {
        Pattern::node(
            Kind::BinOp,
            [
                Pattern::capture("base"),
                Pattern::leaf(Kind::Pow),
                Pattern::capture_as("exponent", [Constraint::Kind(Kind::Num)]),
            ],
        )
        .unwrap()
    }

    fn run(pattern: &Pattern, target: impl Into<Value>) -> (bool, Bindings) {
        let mut bindings = Bindings::new();
        let ok = matches(pattern, &target.into(), &mut bindings, CapturePolicy::Strict).unwrap();
        (ok, bindings)
    }

    #[test]
    fn test_node_pattern_captures() {
        let target = build::bin_op(build::load("x"), Kind::Pow, build::num(3));
        let (ok, bindings) = run(&pow_pattern(), target);
        assert!(ok);
        assert_eq!(bindings.node("base").unwrap(), &build::load("x"));
        assert_eq!(bindings.get("exponent").unwrap(), &Value::Node(build::num(3)));
        assert_eq!(bindings.names().collect::<Vec<_>>(), ["base", "exponent"]);
    }

    #[test]
    fn test_kind_mismatch_fails() {
        let target = build::bin_op(build::load("x"), Kind::Mult, build::num(3));
        assert!(!run(&pow_pattern(), target).0);
        assert!(!run(&pow_pattern(), Value::from("x")).0);
    }

    #[test]
    fn test_partial_bindings_survive_failure() {
        // base binds before the operator comparison fails
        let target = build::bin_op(build::load("x"), Kind::Mult, build::num(3));
        let (ok, bindings) = run(&pow_pattern(), target);
        assert!(!ok);
        assert!(bindings.contains("base"));
        assert!(!bindings.contains("exponent"));
    }

    #[test]
    fn test_capture_constraints() {
        let text = Pattern::capture_as("s", [Constraint::Str]);
        assert!(run(&text, "hello").0);
        assert!(!run(&text, 3).0);

        let number = Pattern::capture_as("n", [Constraint::Number]);
        assert!(run(&number, 3).0);
        assert!(run(&number, 2.5).0);
        assert!(!run(&number, true).0);

        let either = Pattern::capture_as("e", [Constraint::Kind(Kind::Name), Constraint::None]);
        assert!(run(&either, build::load("x")).0);
        assert!(run(&either, Value::None).0);
        assert!(!run(&either, build::num(1)).0);
    }

    #[test]
    fn test_sequence_length_is_exact() {
        let pattern = Pattern::seq([Pattern::capture("a"), Pattern::capture("b")]);
        assert!(run(&pattern, vec![Value::Int(1), Value::Int(2)]).0);
        assert!(!run(&pattern, vec![Value::Int(1)]).0);
        assert!(!run(&pattern, vec![Value::Int(1), Value::Int(2), Value::Int(3)]).0);
        assert!(run(&Pattern::seq([]), Vec::<Value>::new()).0);
        assert!(!run(&Pattern::seq([]), vec![Value::Int(1)]).0);
    }

    #[test]
    fn test_map_keys_must_match_exactly() {
        let pattern = Pattern::Map(
            [
                ("a".to_string(), Pattern::capture("first")),
                ("b".to_string(), Pattern::literal(2)),
            ]
            .into_iter()
            .collect(),
        );
        let mut target = IndexMap::new();
        target.insert("b".to_string(), Value::Int(2));
        target.insert("a".to_string(), Value::from("x"));
        let (ok, bindings) = run(&pattern, target.clone());
        assert!(ok);
        assert_eq!(bindings.str("first").unwrap(), "x");

        target.insert("c".to_string(), Value::Int(3));
        assert!(!run(&pattern, target).0);
    }

    #[test]
    fn test_literal_is_numeric() {
        assert!(run(&Pattern::literal(2), 2.0).0);
        assert!(run(&Pattern::literal(2.0), 2).0);
        assert!(!run(&Pattern::literal(2), 3).0);
        assert!(!run(&Pattern::literal("2"), 2).0);
    }

    #[test]
    fn test_from_value_is_exact_shape() {
        let square = Pattern::from(build::num(2));
        assert!(run(&square, build::num(2)).0);
        assert!(run(&square, build::num(2.0)).0);
        assert!(!run(&square, build::num(3)).0);
    }

    #[test]
    fn test_duplicate_capture_policy() {
        let pattern = Pattern::node(
            Kind::BinOp,
            [
                Pattern::capture("x"),
                Pattern::leaf(Kind::Add),
                Pattern::capture("x"),
            ],
        )
        .unwrap();
        let same = Value::Node(build::bin_op(build::load("a"), Kind::Add, build::load("a")));
        let differ = Value::Node(build::bin_op(build::load("a"), Kind::Add, build::load("b")));

        let mut bindings = Bindings::new();
        assert!(matches(&pattern, &same, &mut bindings, CapturePolicy::Strict).unwrap());

        let mut bindings = Bindings::new();
        let err = matches(&pattern, &differ, &mut bindings, CapturePolicy::Strict).unwrap_err();
        assert_eq!(err.name, "x");

        let mut bindings = Bindings::new();
        assert!(matches(&pattern, &differ, &mut bindings, CapturePolicy::Overwrite).unwrap());
        assert_eq!(bindings.node("x").unwrap(), &build::load("b"));
    }

    #[test]
    fn test_node_arity_checked() {
        let err = Pattern::node(Kind::Name, [Pattern::capture("id")]).unwrap_err();
        assert!(matches!(err, SchemaError::Arity { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_bindings_merge_external_wins() {
        let captures: Bindings = [("x", Value::Int(1)), ("y", Value::Int(2))].into_iter().collect();
        let external: Bindings = [("y", Value::Int(20)), ("z", Value::Int(30))].into_iter().collect();
        let merged = captures.merged(&external);
        assert_eq!(merged.get("x").unwrap(), &Value::Int(1));
        assert_eq!(merged.get("y").unwrap(), &Value::Int(20));
        assert_eq!(merged.get("z").unwrap(), &Value::Int(30));
        assert_eq!(merged.get("w").unwrap_err().name, "w");
    }

    #[test]
    fn test_typed_accessor_errors() {
        let bindings: Bindings = [("n", Value::Int(1))].into_iter().collect();
        let err = bindings.str("n").unwrap_err();
        assert!(err.to_string().contains("is a (int), expected a string"));
        let missing = bindings.node("gone").unwrap_err();
        assert!(missing.downcast_ref::<MissingBindingError>().is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(pow_pattern().to_string(), "BinOp(?base, Pow, ?exponent:Num)");
        assert_eq!(
            Pattern::from(build::load("x")).to_string(),
            "Name(\"x\", Load)"
        );
        assert_eq!(pow_pattern().capture_names(), ["base", "exponent"]);
    }
}
