//! Builders for the synthetic `Group` and `Template` output nodes.

use super::{Kind, Node, Value};

/// Builder for a `Group` node: an optional leading fragment, a body of
/// statements (indented one level by default) and an optional trailing
/// fragment.
///
/// ```
/// use transpiler_core::ast::{template, Group, ToSource, Value};
///
/// let block = Group::new()
///     .before("while (1) {")
///     .body([Value::from(template("tick();", Vec::new()))])
///     .after("}")
///     .build();
/// assert_eq!(block.to_source().unwrap(), "while (1) {\n    tick();\n}");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    before: Value,
    body: Vec<Value>,
    after: Value,
    indent: bool,
}

impl Group {
    pub fn new() -> Self {
        Self {
            before: Value::None,
            body: Vec::new(),
            after: Value::None,
            indent: true,
        }
    }

    /// Fragment emitted before the body. Strings are emitted verbatim.
    pub fn before(mut self, fragment: impl Into<Value>) -> Self {
        self.before = fragment.into();
        self
    }

    pub fn body<I, V>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.body.extend(items.into_iter().map(Into::into));
        self
    }

    /// Fragment emitted after the body. Strings are emitted verbatim.
    pub fn after(mut self, fragment: impl Into<Value>) -> Self {
        self.after = fragment.into();
        self
    }

    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    pub fn build(self) -> Node {
        Node::from_parts(
            Kind::Group,
            vec![
                self.before,
                Value::List(self.body),
                self.after,
                Value::Bool(self.indent),
            ],
        )
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Group> for Value {
    fn from(group: Group) -> Self {
        Value::Node(group.build())
    }
}

/// A `Template` node: `template` with `{N}` / `{N:node}` placeholders
/// filled from `args` at print time.
pub fn template(template: impl Into<String>, args: Vec<Value>) -> Node {
    Node::from_parts(
        Kind::Template,
        vec![Value::Str(template.into()), Value::List(args)],
    )
}
