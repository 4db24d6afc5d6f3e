// Source text generation from a (possibly rewritten) tree.
// Ordinary kinds print as Python-like source; Group and Template nodes
// splice their literal fragments around rendered sub-trees.

use super::template::{parse_template, RenderMode, Segment};
use super::*;

/// Trait for values that can render themselves with the default printer
pub trait ToSource {
    fn to_source(&self) -> Result<String, RenderError>;
}

impl ToSource for Value {
    fn to_source(&self) -> Result<String, RenderError> {
        Printer::default().render(self)
    }
}

impl ToSource for Node {
    fn to_source(&self) -> Result<String, RenderError> {
        Printer::default().render_node(self)
    }
}

/// Printer errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("template {template:?} refers to argument {index} but only {available} supplied")]
    MissingArgument {
        template: String,
        index: usize,
        available: usize,
    },

    #[error("template {template:?} splices argument {index} literally but it is a {found}")]
    ExpectedScalar {
        template: String,
        index: usize,
        found: String,
    },

    #[error("malformed placeholder in template {template:?}: {message}")]
    BadPlaceholder { template: String, message: String },

    #[error("cannot render {kind}: {message}")]
    Malformed { kind: Kind, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// One level of indentation.
    pub indent: String,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
        }
    }
}

// Binding strength, loosest first. Anything that is not an operator
// expression (names, calls, templates) binds as an atom.
const PREC_LAMBDA: u8 = 1;
const PREC_OR: u8 = 2;
const PREC_AND: u8 = 3;
const PREC_NOT: u8 = 4;
const PREC_COMPARE: u8 = 5;
const PREC_ADD: u8 = 6;
const PREC_MUL: u8 = 7;
const PREC_UNARY: u8 = 8;
const PREC_POW: u8 = 9;
const PREC_ATOM: u8 = 10;

/// Renders trees as indented text.
#[derive(Debug, Clone, Default)]
pub struct Printer {
    config: PrinterConfig,
}

impl Printer {
    pub fn new(config: PrinterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Render a value at statement level, one line per statement.
    pub fn render(&self, value: &Value) -> Result<String, RenderError> {
        let mut lines = Vec::new();
        self.statement(value, 0, &mut lines)?;
        Ok(lines.join("\n"))
    }

    pub fn render_node(&self, node: &Node) -> Result<String, RenderError> {
        let mut lines = Vec::new();
        self.node_statement(node, 0, &mut lines)?;
        Ok(lines.join("\n"))
    }

    /// Render a value in expression position.
    pub fn inline(&self, value: &Value) -> Result<String, RenderError> {
        Ok(match value {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Str(s) => quote(s),
            Value::List(items) => self.join(items, ", ")?,
            Value::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", quote(k), self.inline(v)?)))
                    .collect::<Result<Vec<_>, RenderError>>()?;
                format!("{{{}}}", entries.join(", "))
            }
            Value::Node(node) => self.expression(node)?,
        })
    }

    fn push(&self, text: &str, level: usize, lines: &mut Vec<String>) {
        let prefix = self.config.indent.repeat(level);
        for line in text.split('\n') {
            if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{prefix}{line}"));
            }
        }
    }

    fn statement(&self, value: &Value, level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        match value {
            Value::List(items) => {
                for item in items {
                    self.statement(item, level, lines)?;
                }
                Ok(())
            }
            Value::Node(node) => self.node_statement(node, level, lines),
            other => {
                let text = self.inline(other)?;
                self.push(&text, level, lines);
                Ok(())
            }
        }
    }

    fn node_statement(&self, node: &Node, level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        match node.kind() {
            Kind::Module => self.statement(field(node, "body")?, level, lines),
            Kind::Group => self.group(node, level, lines),
            Kind::FunctionDef => {
                for decorator in list(node, "decorator_list")? {
                    let text = format!("@{}", self.inline(decorator)?);
                    self.push(&text, level, lines);
                }
                let header = format!(
                    "def {}({}):",
                    text_field(node, "name")?,
                    self.inline(field(node, "args")?)?
                );
                self.push(&header, level, lines);
                self.suite(list(node, "body")?, level + 1, lines)
            }
            Kind::If => {
                let header = format!("if {}:", self.inline(field(node, "test")?)?);
                self.push(&header, level, lines);
                self.suite(list(node, "body")?, level + 1, lines)?;
                self.orelse(list(node, "orelse")?, level, lines)
            }
            Kind::While => {
                let header = format!("while {}:", self.inline(field(node, "test")?)?);
                self.push(&header, level, lines);
                self.suite(list(node, "body")?, level + 1, lines)?;
                self.orelse(list(node, "orelse")?, level, lines)
            }
            _ => {
                let text = self.expression(node)?;
                self.push(&text, level, lines);
                Ok(())
            }
        }
    }

    fn suite(&self, body: &[Value], level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        if body.is_empty() {
            self.push("pass", level, lines);
            return Ok(());
        }
        for stmt in body {
            self.statement(stmt, level, lines)?;
        }
        Ok(())
    }

    fn orelse(&self, orelse: &[Value], level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        match orelse {
            [] => Ok(()),
            [Value::Node(nested)] if nested.kind() == Kind::If => {
                let mut nested_lines = Vec::new();
                self.node_statement(nested, level, &mut nested_lines)?;
                if let Some(first) = nested_lines.first_mut() {
                    let prefix = self.config.indent.repeat(level);
                    *first = format!("{prefix}el{}", first.trim_start());
                }
                lines.extend(nested_lines);
                Ok(())
            }
            _ => {
                self.push("else:", level, lines);
                self.suite(orelse, level + 1, lines)
            }
        }
    }

    fn group(&self, node: &Node, level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        let indent = field(node, "indent")?.as_bool().unwrap_or(true);
        self.fragment(field(node, "before")?, level, lines)?;
        let body_level = if indent { level + 1 } else { level };
        match field(node, "body")? {
            Value::List(items) => {
                for item in items {
                    self.fragment(item, body_level, lines)?;
                }
            }
            other => self.fragment(other, body_level, lines)?,
        }
        self.fragment(field(node, "after")?, level, lines)
    }

    fn fragment(&self, fragment: &Value, level: usize, lines: &mut Vec<String>) -> Result<(), RenderError> {
        match fragment {
            Value::None => Ok(()),
            Value::Str(text) => {
                self.push(text, level, lines);
                Ok(())
            }
            other => self.statement(other, level, lines),
        }
    }

    fn template(&self, node: &Node) -> Result<String, RenderError> {
        let template = text_field(node, "template")?;
        let args = list(node, "args")?;
        let mut out = String::new();

        for segment in parse_template(template)? {
            match segment {
                Segment::Text(text) => out.push_str(&text),
                Segment::Arg { index, mode } => {
                    let arg = args.get(index).ok_or_else(|| RenderError::MissingArgument {
                        template: template.to_string(),
                        index,
                        available: args.len(),
                    })?;
                    match mode {
                        RenderMode::Node => out.push_str(&self.inline(arg)?),
                        RenderMode::Literal => out.push_str(&literal(template, index, arg)?),
                    }
                }
            }
        }

        Ok(out)
    }

    fn expression(&self, node: &Node) -> Result<String, RenderError> {
        let kind = node.kind();
        Ok(match kind {
            Kind::Template => self.template(node)?,
            Kind::Name => text_field(node, "id")?.to_string(),
            Kind::Num => self.inline(field(node, "n")?)?,
            Kind::Str => quote(text_field(node, "s")?),
            Kind::NameConstant => self.inline(field(node, "value")?)?,
            Kind::Attribute => format!(
                "{}.{}",
                self.operand(field(node, "value")?, PREC_ATOM)?,
                text_field(node, "attr")?
            ),
            Kind::Call => {
                let mut args = list(node, "args")?
                    .iter()
                    .map(|arg| self.inline(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let keywords = field(node, "keywords")?
                    .as_map()
                    .ok_or_else(|| malformed(node, "keywords is not a mapping"))?;
                for (name, arg) in keywords {
                    args.push(format!("{name}={}", self.inline(arg)?));
                }
                format!(
                    "{}({})",
                    self.operand(field(node, "func")?, PREC_ATOM)?,
                    args.join(", ")
                )
            }
            Kind::BinOp => {
                let op = operator_kind(field(node, "op")?)
                    .ok_or_else(|| malformed(node, "op is not an operator"))?;
                let prec = node_precedence(node);
                // ** groups to the right, everything else to the left
                let (left_min, right_min) = if op == Kind::Pow {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                format!(
                    "{} {} {}",
                    self.operand(field(node, "left")?, left_min)?,
                    symbol(op),
                    self.operand(field(node, "right")?, right_min)?
                )
            }
            Kind::UnaryOp => {
                let op = operator_kind(field(node, "op")?)
                    .ok_or_else(|| malformed(node, "op is not an operator"))?;
                let prec = if op == Kind::Not { PREC_NOT } else { PREC_UNARY };
                let operand = self.operand(field(node, "operand")?, prec)?;
                if op == Kind::Not {
                    format!("not {operand}")
                } else {
                    format!("{}{operand}", symbol(op))
                }
            }
            Kind::BoolOp => {
                let op = operator_kind(field(node, "op")?)
                    .ok_or_else(|| malformed(node, "op is not an operator"))?;
                let prec = if op == Kind::And { PREC_AND } else { PREC_OR };
                list(node, "values")?
                    .iter()
                    .map(|v| self.operand(v, prec + 1))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(&format!(" {} ", symbol(op)))
            }
            Kind::Compare => {
                let ops = list(node, "ops")?;
                let comparators = list(node, "comparators")?;
                if ops.len() != comparators.len() {
                    return Err(malformed(node, "ops and comparators differ in length"));
                }
                let mut out = self.operand(field(node, "left")?, PREC_COMPARE + 1)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    let op = operator_kind(op)
                        .ok_or_else(|| malformed(node, "comparison op is not an operator"))?;
                    out.push_str(&format!(
                        " {} {}",
                        symbol(op),
                        self.operand(comparator, PREC_COMPARE + 1)?
                    ));
                }
                out
            }
            Kind::Lambda => {
                let args = self.inline(field(node, "args")?)?;
                let body = self.inline(field(node, "body")?)?;
                if args.is_empty() {
                    format!("lambda: {body}")
                } else {
                    format!("lambda {args}: {body}")
                }
            }
            Kind::Arguments => self.arguments(node)?,
            Kind::Return => match field(node, "value")? {
                Value::None => "return".to_string(),
                value => format!("return {}", self.inline(value)?),
            },
            Kind::Assign => {
                let mut parts = list(node, "targets")?
                    .iter()
                    .map(|t| self.inline(t))
                    .collect::<Result<Vec<_>, _>>()?;
                parts.push(self.inline(field(node, "value")?)?);
                parts.join(" = ")
            }
            Kind::Expr => self.inline(field(node, "value")?)?,
            Kind::Pass => "pass".to_string(),
            Kind::Load | Kind::Store | Kind::Param => String::new(),
            op if op.is_operator() => symbol(op).to_string(),
            // Block kinds in expression position render as a text block
            _ => {
                let mut lines = Vec::new();
                self.node_statement(node, 0, &mut lines)?;
                lines.join("\n")
            }
        })
    }

    fn arguments(&self, node: &Node) -> Result<String, RenderError> {
        let args = list(node, "args")?;
        let defaults = list(node, "defaults")?;
        if defaults.len() > args.len() {
            return Err(malformed(node, "more defaults than parameters"));
        }
        let first_default = args.len() - defaults.len();

        let mut parts = Vec::with_capacity(args.len() + 2);
        for (i, arg) in args.iter().enumerate() {
            let mut part = self.inline(arg)?;
            if i >= first_default {
                part.push('=');
                part.push_str(&self.inline(&defaults[i - first_default])?);
            }
            parts.push(part);
        }
        if let Value::Str(vararg) = field(node, "vararg")? {
            parts.push(format!("*{vararg}"));
        }
        if let Value::Str(kwarg) = field(node, "kwarg")? {
            parts.push(format!("**{kwarg}"));
        }
        Ok(parts.join(", "))
    }

    fn join(&self, items: &[Value], separator: &str) -> Result<String, RenderError> {
        Ok(items
            .iter()
            .map(|item| self.inline(item))
            .collect::<Result<Vec<_>, _>>()?
            .join(separator))
    }

    /// Render a sub-expression, parenthesised if it binds looser than `min`.
    fn operand(&self, value: &Value, min: u8) -> Result<String, RenderError> {
        let text = self.inline(value)?;
        if precedence(value) < min {
            Ok(format!("({text})"))
        } else {
            Ok(text)
        }
    }
}

fn precedence(value: &Value) -> u8 {
    value.as_node().map_or(PREC_ATOM, node_precedence)
}

fn node_precedence(node: &Node) -> u8 {
    let op = node.field("op").and_then(operator_kind);
    match (node.kind(), op) {
        (Kind::Lambda, _) => PREC_LAMBDA,
        (Kind::BoolOp, Some(Kind::Or)) => PREC_OR,
        (Kind::BoolOp, _) => PREC_AND,
        (Kind::UnaryOp, Some(Kind::Not)) => PREC_NOT,
        (Kind::UnaryOp, _) => PREC_UNARY,
        (Kind::Compare, _) => PREC_COMPARE,
        (Kind::BinOp, Some(Kind::Add | Kind::Sub)) => PREC_ADD,
        (Kind::BinOp, Some(Kind::Pow)) => PREC_POW,
        (Kind::BinOp, _) => PREC_MUL,
        // A negative literal prints with a leading minus
        (Kind::Num, _) if is_negative(node.field("n")) => PREC_UNARY,
        _ => PREC_ATOM,
    }
}

fn is_negative(n: Option<&Value>) -> bool {
    match n {
        Some(Value::Int(n)) => *n < 0,
        Some(Value::Float(f)) => f.is_sign_negative(),
        _ => false,
    }
}

fn operator_kind(value: &Value) -> Option<Kind> {
    value.kind().filter(|kind| kind.is_operator())
}

fn symbol(op: Kind) -> &'static str {
    match op {
        Kind::Add | Kind::UAdd => "+",
        Kind::Sub | Kind::USub => "-",
        Kind::Mult => "*",
        Kind::Div => "/",
        Kind::Mod => "%",
        Kind::Pow => "**",
        Kind::Not => "not",
        Kind::And => "and",
        Kind::Or => "or",
        Kind::Eq => "==",
        Kind::NotEq => "!=",
        Kind::Lt => "<",
        Kind::LtE => "<=",
        Kind::Gt => ">",
        Kind::GtE => ">=",
        _ => "?",
    }
}

/// Literal splice: strings verbatim, other scalars as printed.
fn literal(template: &str, index: usize, arg: &Value) -> Result<String, RenderError> {
    match arg {
        Value::Str(s) => Ok(s.clone()),
        Value::Int(n) => Ok(n.to_string()),
        Value::Float(f) => Ok(format!("{f:?}")),
        Value::Bool(b) => Ok(b.to_string()),
        Value::None => Ok(String::new()),
        other => Err(RenderError::ExpectedScalar {
            template: template.to_string(),
            index,
            found: other.type_name().to_string(),
        }),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
}

fn malformed(node: &Node, message: &str) -> RenderError {
    RenderError::Malformed {
        kind: node.kind(),
        message: message.to_string(),
    }
}

fn field<'a>(node: &'a Node, name: &str) -> Result<&'a Value, RenderError> {
    node.field(name)
        .ok_or_else(|| malformed(node, &format!("missing field `{name}`")))
}

fn list<'a>(node: &'a Node, name: &str) -> Result<&'a [Value], RenderError> {
    field(node, name)?
        .as_list()
        .ok_or_else(|| malformed(node, &format!("`{name}` is not a sequence")))
}

fn text_field<'a>(node: &'a Node, name: &str) -> Result<&'a str, RenderError> {
    field(node, name)?
        .as_str()
        .ok_or_else(|| malformed(node, &format!("`{name}` is not a string")))
}
