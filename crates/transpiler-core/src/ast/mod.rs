// Generic tagged tree shared by the parser, the rewrite engine and the printer.
// Every node kind carries a fixed, ordered field schema known at compile time,
// so rebuilding a node from rewritten children is a checked table lookup.

pub mod build;
pub mod dump;
pub mod source_gen;
pub mod synthetic;
pub mod template;

pub use source_gen::{Printer, PrinterConfig, RenderError, ToSource};
pub use synthetic::{template, Group};

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

macro_rules! node_kinds {
    ($( $(#[$doc:meta])* $kind:ident => [$($field:literal),*] ),* $(,)?) => {
        /// Tag of a [`Node`]. The schema table below is the single source of
        /// truth for which fields each kind carries, in order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum Kind {
            $( $(#[$doc])* $kind, )*
        }

        impl Kind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [Kind] = &[$(Kind::$kind),*];

            /// Textual tag used in traces, dumps and JSON.
            pub fn name(self) -> &'static str {
                match self {
                    $(Kind::$kind => stringify!($kind),)*
                }
            }

            /// Ordered field names for this kind.
            pub fn fields(self) -> &'static [&'static str] {
                match self {
                    $(Kind::$kind => &[$($field),*],)*
                }
            }
        }

        impl FromStr for Kind {
            type Err = SchemaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($kind) => Ok(Kind::$kind),)*
                    other => Err(SchemaError::UnknownKind(other.to_string())),
                }
            }
        }
    };
}

node_kinds! {
    // Statements
    Module => ["body"],
    FunctionDef => ["name", "args", "body", "decorator_list"],
    Return => ["value"],
    Assign => ["targets", "value"],
    Expr => ["value"],
    If => ["test", "body", "orelse"],
    While => ["test", "body", "orelse"],
    Pass => [],

    // Expressions
    Lambda => ["args", "body"],
    Arguments => ["args", "vararg", "kwarg", "defaults"],
    BinOp => ["left", "op", "right"],
    UnaryOp => ["op", "operand"],
    BoolOp => ["op", "values"],
    Compare => ["left", "ops", "comparators"],
    /// `keywords` is a mapping field: keyword name to argument value.
    Call => ["func", "args", "keywords"],
    Attribute => ["value", "attr", "ctx"],
    Name => ["id", "ctx"],
    Num => ["n"],
    Str => ["s"],
    NameConstant => ["value"],

    // Operators
    Add => [],
    Sub => [],
    Mult => [],
    Div => [],
    Mod => [],
    Pow => [],
    UAdd => [],
    USub => [],
    Not => [],
    And => [],
    Or => [],
    Eq => [],
    NotEq => [],
    Lt => [],
    LtE => [],
    Gt => [],
    GtE => [],

    // Expression contexts
    Load => [],
    Store => [],
    Param => [],

    // Synthetic output nodes, interpreted by the printer
    /// Text fragment before, indented body, text fragment after.
    Group => ["before", "body", "after", "indent"],
    /// Format string with positional placeholders and its arguments.
    Template => ["template", "args"],
}

impl Kind {
    pub fn arity(self) -> usize {
        self.fields().len()
    }

    /// Group and Template exist only in rewrite output.
    pub fn is_synthetic(self) -> bool {
        matches!(self, Kind::Group | Kind::Template)
    }

    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Kind::Add
                | Kind::Sub
                | Kind::Mult
                | Kind::Div
                | Kind::Mod
                | Kind::Pow
                | Kind::UAdd
                | Kind::USub
                | Kind::Not
                | Kind::And
                | Kind::Or
                | Kind::Eq
                | Kind::NotEq
                | Kind::Lt
                | Kind::LtE
                | Kind::Gt
                | Kind::GtE
        )
    }

    pub fn is_context(self) -> bool {
        matches!(self, Kind::Load | Kind::Store | Kind::Param)
    }

    fn position(self, field: &str) -> Option<usize> {
        self.fields().iter().position(|f| *f == field)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Node construction errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("{kind} takes {expected} field(s), got {found}")]
    Arity {
        kind: Kind,
        expected: usize,
        found: usize,
    },

    #[error("{kind} is missing field `{field}`")]
    MissingField { kind: Kind, field: &'static str },

    #[error("{kind} has no field `{field}`")]
    UnknownField { kind: Kind, field: String },

    #[error("field `{field}` supplied twice for {kind}")]
    DuplicateField { kind: Kind, field: String },

    #[error("unknown node kind `{0}`")]
    UnknownKind(String),
}

/// A field value: scalar, nested node, ordered sequence or keyed mapping.
///
/// Mappings keep insertion order for deterministic traversal, but compare
/// equal regardless of key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Node(Node),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::None | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// The node's kind, if this value is a node.
    pub fn kind(&self) -> Option<Kind> {
        self.as_node().map(Node::kind)
    }

    /// Short description of the value's shape: the node kind for nodes,
    /// a parenthesised type name otherwise.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "(none)",
            Value::Bool(_) => "(bool)",
            Value::Int(_) => "(int)",
            Value::Float(_) => "(float)",
            Value::Str(_) => "(str)",
            Value::List(_) => "(list)",
            Value::Map(_) => "(dict)",
            Value::Node(node) => node.kind().name(),
        }
    }

    /// Equality used by scalar literal patterns: integers and floats compare
    /// numerically, everything else structurally.
    pub fn scalar_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

/// A tagged composite value whose fields follow its kind's schema.
///
/// Nodes are immutable once built; rewriting constructs new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RawNode", try_from = "RawNode")]
pub struct Node {
    kind: Kind,
    fields: Vec<Value>,
}

impl Node {
    /// Build a node from field values given in schema order.
    pub fn new(kind: Kind, fields: Vec<Value>) -> Result<Self, SchemaError> {
        if fields.len() != kind.arity() {
            return Err(SchemaError::Arity {
                kind,
                expected: kind.arity(),
                found: fields.len(),
            });
        }
        Ok(Self { kind, fields })
    }

    /// Reconstruct a node from named fields. The supplied names must be
    /// exactly the kind's schema; order does not matter.
    pub fn from_fields<I, K>(kind: Kind, fields: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut slots: Vec<Option<Value>> = vec![None; kind.arity()];
        for (name, value) in fields {
            let name = name.as_ref();
            let index = kind.position(name).ok_or_else(|| SchemaError::UnknownField {
                kind,
                field: name.to_string(),
            })?;
            if slots[index].replace(value).is_some() {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: name.to_string(),
                });
            }
        }

        let fields = slots
            .into_iter()
            .zip(kind.fields().iter().copied())
            .map(|(slot, field)| slot.ok_or(SchemaError::MissingField { kind, field }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { kind, fields })
    }

    /// Infallible construction for callers that build from the schema
    /// table directly.
    pub(crate) fn from_parts(kind: Kind, fields: Vec<Value>) -> Self {
        debug_assert_eq!(fields.len(), kind.arity(), "bad arity for {kind}");
        Self { kind, fields }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.kind.position(name).map(|index| &self.fields[index])
    }

    /// Fields paired with their names, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.kind.fields().iter().copied().zip(self.fields.iter())
    }

    /// Field values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }
}

#[derive(Serialize, Deserialize)]
struct RawNode {
    kind: Kind,
    #[serde(default)]
    fields: IndexMap<String, Value>,
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let kind = node.kind;
        let fields = kind
            .fields()
            .iter()
            .map(|f| f.to_string())
            .zip(node.fields)
            .collect();
        RawNode { kind, fields }
    }
}

impl TryFrom<RawNode> for Node {
    type Error = SchemaError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        Node::from_fields(raw.kind, raw.fields)
    }
}
