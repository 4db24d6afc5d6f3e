//! Constructors for well-formed nodes.
//!
//! Each helper fills the kind's schema in order, so none of them can fail.

use indexmap::IndexMap;

use super::{Kind, Node, Value};

/// A field-less node: operators and expression contexts.
pub fn leaf(kind: Kind) -> Node {
    Node::from_parts(kind, Vec::new())
}

pub fn module(body: Vec<Value>) -> Node {
    Node::from_parts(Kind::Module, vec![Value::List(body)])
}

pub fn name(id: impl Into<String>, ctx: Kind) -> Node {
    Node::from_parts(
        Kind::Name,
        vec![Value::Str(id.into()), Value::Node(leaf(ctx))],
    )
}

/// A name read in expression position.
pub fn load(id: impl Into<String>) -> Node {
    name(id, Kind::Load)
}

/// A name bound as a function parameter.
pub fn param(id: impl Into<String>) -> Node {
    name(id, Kind::Param)
}

pub fn num(n: impl Into<Value>) -> Node {
    Node::from_parts(Kind::Num, vec![n.into()])
}

pub fn string(s: impl Into<String>) -> Node {
    Node::from_parts(Kind::Str, vec![Value::Str(s.into())])
}

/// `True`, `False` or `None`.
pub fn name_constant(value: Value) -> Node {
    Node::from_parts(Kind::NameConstant, vec![value])
}

pub fn bin_op(left: impl Into<Value>, op: Kind, right: impl Into<Value>) -> Node {
    Node::from_parts(
        Kind::BinOp,
        vec![left.into(), Value::Node(leaf(op)), right.into()],
    )
}

pub fn unary_op(op: Kind, operand: impl Into<Value>) -> Node {
    Node::from_parts(Kind::UnaryOp, vec![Value::Node(leaf(op)), operand.into()])
}

pub fn bool_op(op: Kind, values: Vec<Value>) -> Node {
    Node::from_parts(Kind::BoolOp, vec![Value::Node(leaf(op)), Value::List(values)])
}

pub fn compare(left: impl Into<Value>, ops: Vec<Kind>, comparators: Vec<Value>) -> Node {
    let ops = ops.into_iter().map(|op| Value::Node(leaf(op))).collect();
    Node::from_parts(
        Kind::Compare,
        vec![left.into(), Value::List(ops), Value::List(comparators)],
    )
}

pub fn call(func: impl Into<Value>, args: Vec<Value>, keywords: IndexMap<String, Value>) -> Node {
    Node::from_parts(
        Kind::Call,
        vec![func.into(), Value::List(args), Value::Map(keywords)],
    )
}

pub fn attribute(value: impl Into<Value>, attr: impl Into<String>, ctx: Kind) -> Node {
    Node::from_parts(
        Kind::Attribute,
        vec![value.into(), Value::Str(attr.into()), Value::Node(leaf(ctx))],
    )
}

/// `return value`; pass [`Value::None`] for a bare `return`.
pub fn ret(value: impl Into<Value>) -> Node {
    Node::from_parts(Kind::Return, vec![value.into()])
}

pub fn assign(targets: Vec<Value>, value: impl Into<Value>) -> Node {
    Node::from_parts(Kind::Assign, vec![Value::List(targets), value.into()])
}

pub fn expr(value: impl Into<Value>) -> Node {
    Node::from_parts(Kind::Expr, vec![value.into()])
}

pub fn if_stmt(test: impl Into<Value>, body: Vec<Value>, orelse: Vec<Value>) -> Node {
    Node::from_parts(
        Kind::If,
        vec![test.into(), Value::List(body), Value::List(orelse)],
    )
}

pub fn while_stmt(test: impl Into<Value>, body: Vec<Value>, orelse: Vec<Value>) -> Node {
    Node::from_parts(
        Kind::While,
        vec![test.into(), Value::List(body), Value::List(orelse)],
    )
}

pub fn pass() -> Node {
    leaf(Kind::Pass)
}

/// Parameter list; `args` are `Name(_, Param)` nodes and `defaults` align
/// with the last `defaults.len()` of them.
pub fn arguments(
    args: Vec<Value>,
    vararg: Option<String>,
    kwarg: Option<String>,
    defaults: Vec<Value>,
) -> Node {
    Node::from_parts(
        Kind::Arguments,
        vec![
            Value::List(args),
            Value::from(vararg),
            Value::from(kwarg),
            Value::List(defaults),
        ],
    )
}

/// Plain positional parameters, no defaults.
pub fn params<I, S>(names: I) -> Node
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args = names.into_iter().map(|n| Value::Node(param(n))).collect();
    arguments(args, None, None, Vec::new())
}

pub fn function_def(
    name: impl Into<String>,
    args: Node,
    body: Vec<Value>,
    decorator_list: Vec<Value>,
) -> Node {
    Node::from_parts(
        Kind::FunctionDef,
        vec![
            Value::Str(name.into()),
            Value::Node(args),
            Value::List(body),
            Value::List(decorator_list),
        ],
    )
}

pub fn lambda(args: Node, body: impl Into<Value>) -> Node {
    Node::from_parts(Kind::Lambda, vec![Value::Node(args), body.into()])
}
