//! Indentation-structured statements over logical lines.

use nom::{character::complete::char, sequence::preceded};

use super::expr::{
    clause_header, complete, def_header, else_header, expression, simple_statement, unexpected,
    SimpleStmt,
};
use super::lines::Line;
use super::AcquisitionError;
use crate::ast::{build, Kind, Node, Value};

pub(crate) struct BlockParser {
    lines: Vec<Line>,
    pos: usize,
}

impl BlockParser {
    pub(crate) fn new(lines: Vec<Line>) -> Self {
        Self { lines, pos: 0 }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    /// Statements at exactly `indent`, stopping at the first shallower line.
    pub(crate) fn block(&mut self, indent: usize) -> Result<Vec<Value>, AcquisitionError> {
        let mut body = Vec::new();
        while let Some(line) = self.peek() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(AcquisitionError::Indentation { line: line.number });
            }
            body.extend(self.statement()?);
        }
        Ok(body)
    }

    /// One statement, consuming the suites of compound statements.
    fn statement(&mut self) -> Result<Option<Value>, AcquisitionError> {
        let Some(line) = self.lines.get(self.pos).cloned() else {
            return Ok(None);
        };
        let text = line.text.as_str();

        if text.starts_with('@') {
            return self.decorated(line.indent).map(Some);
        }
        if starts_with_keyword(text, "def") {
            return self.function(line.indent, Vec::new()).map(Some);
        }
        if starts_with_keyword(text, "if") {
            return self.if_statement(line.indent, "if").map(Some);
        }
        if starts_with_keyword(text, "while") {
            self.pos += 1;
            let test = syntax(&line, clause_header("while"))?;
            let body = self.suite(&line, test.rest)?;
            let orelse = self.else_clause(line.indent)?;
            return Ok(Some(build::while_stmt(test.value, body, orelse).into()));
        }
        if starts_with_keyword(text, "elif") || starts_with_keyword(text, "else") {
            return Err(syntax_error(&line, format!("unexpected `{}`", first_word(text))));
        }

        self.pos += 1;
        simple(&line, text).map(Some)
    }

    fn decorated(&mut self, indent: usize) -> Result<Value, AcquisitionError> {
        let mut decorators = Vec::new();
        while let Some(line) = self.peek().cloned() {
            if line.indent != indent || !line.text.starts_with('@') {
                break;
            }
            self.pos += 1;
            let decorator = complete(preceded(char('@'), expression), &line.text)
                .map_err(|message| syntax_error(&line, message))?;
            decorators.push(Value::Node(decorator));
        }

        match self.peek() {
            Some(line) if line.indent == indent && starts_with_keyword(&line.text, "def") => {
                self.function(indent, decorators)
            }
            Some(line) => Err(syntax_error(line, "decorator must precede a function definition")),
            None => Err(AcquisitionError::Syntax {
                line: self.lines.last().map_or(1, |l| l.number),
                message: "decorator must precede a function definition".to_string(),
            }),
        }
    }

    fn function(&mut self, indent: usize, decorators: Vec<Value>) -> Result<Value, AcquisitionError> {
        let line = self.lines[self.pos].clone();
        debug_assert_eq!(line.indent, indent);
        self.pos += 1;

        let (rest, (name, args)) =
            def_header(&line.text).map_err(|_| syntax_error(&line, header_error(&line.text, "def")))?;
        let body = self.suite(&line, rest)?;
        Ok(build::function_def(name, args, body, decorators).into())
    }

    /// `if`/`elif` chains nest as `If` nodes in the `orelse` of their parent.
    fn if_statement(&mut self, indent: usize, word: &'static str) -> Result<Value, AcquisitionError> {
        let line = self.lines[self.pos].clone();
        self.pos += 1;

        let test = syntax(&line, clause_header(word))?;
        let body = self.suite(&line, test.rest)?;

        let orelse = match self.clause_keyword(indent) {
            Some("elif") => vec![self.if_statement(indent, "elif")?],
            Some("else") => self.else_clause(indent)?,
            _ => Vec::new(),
        };
        Ok(build::if_stmt(test.value, body, orelse).into())
    }

    fn else_clause(&mut self, indent: usize) -> Result<Vec<Value>, AcquisitionError> {
        if self.clause_keyword(indent) != Some("else") {
            return Ok(Vec::new());
        }
        let line = self.lines[self.pos].clone();
        self.pos += 1;

        let rest = match else_header(&line.text) {
            Ok((rest, _)) => rest,
            Err(_) => return Err(syntax_error(&line, header_error(&line.text, "else"))),
        };
        self.suite(&line, rest)
    }

    /// The `elif`/`else` keyword opening the next line, if it continues
    /// a compound statement at `indent`.
    fn clause_keyword(&self, indent: usize) -> Option<&'static str> {
        let line = self.peek().filter(|line| line.indent == indent)?;
        ["elif", "else"]
            .into_iter()
            .find(|word| starts_with_keyword(&line.text, word))
    }

    /// The body after a header: inline after the colon, or an indented block.
    fn suite(&mut self, header: &Line, inline: &str) -> Result<Vec<Value>, AcquisitionError> {
        let inline = inline.trim();
        if !inline.is_empty() {
            return Ok(vec![simple(header, inline)?]);
        }

        match self.peek() {
            Some(next) if next.indent > header.indent => {
                let indent = next.indent;
                self.block(indent)
            }
            _ => Err(syntax_error(header, "expected an indented block")),
        }
    }
}

struct Header<'a> {
    value: Node,
    rest: &'a str,
}

fn syntax<'a, F>(line: &'a Line, mut parser: F) -> Result<Header<'a>, AcquisitionError>
where
    F: FnMut(&'a str) -> nom::IResult<&'a str, Node>,
{
    match parser(&line.text) {
        Ok((rest, value)) => Ok(Header { value, rest }),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(syntax_error(line, unexpected(e.input))),
        Err(nom::Err::Incomplete(_)) => Err(syntax_error(line, "unexpected end of line")),
    }
}

fn simple(line: &Line, text: &str) -> Result<Value, AcquisitionError> {
    let stmt = complete(simple_statement, text).map_err(|message| syntax_error(line, message))?;
    let node = match stmt {
        SimpleStmt::Return(value) => build::ret(value),
        SimpleStmt::Pass => build::pass(),
        SimpleStmt::Chain(mut parts) => {
            // The last element is the value, the rest are targets
            let value = parts.pop().ok_or_else(|| syntax_error(line, "empty statement"))?;
            if parts.is_empty() {
                build::expr(value)
            } else {
                let targets = parts
                    .into_iter()
                    .map(|target| store(target).map(Value::Node))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|message| syntax_error(line, message))?;
                build::assign(targets, value)
            }
        }
    };
    Ok(node.into())
}

/// Rewrite a parsed `Load` target into a `Store`.
fn store(target: Node) -> Result<Node, String> {
    match target.kind() {
        Kind::Name => {
            let id = target.field("id").and_then(Value::as_str).unwrap_or_default();
            Ok(build::name(id, Kind::Store))
        }
        Kind::Attribute => {
            let mut fields = target.into_fields().into_iter();
            let value = fields.next().unwrap_or(Value::None);
            let attr = fields.next().unwrap_or(Value::None);
            let attr = attr.as_str().unwrap_or_default().to_string();
            Ok(build::attribute(value, attr, Kind::Store))
        }
        other => Err(format!("cannot assign to {other}")),
    }
}

fn starts_with_keyword(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .map_or(false, |rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

fn first_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or(text)
}

fn header_error(text: &str, word: &str) -> String {
    if text.trim_end().ends_with(':') {
        format!("invalid `{word}` header")
    } else {
        format!("expected `:` after `{word}` header")
    }
}

fn syntax_error(line: &Line, message: impl Into<String>) -> AcquisitionError {
    AcquisitionError::Syntax {
        line: line.number,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSource;
    use crate::parser::lines::logical_lines;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Vec<Value>, AcquisitionError> {
        let mut parser = BlockParser::new(logical_lines(source));
        let body = parser.block(0)?;
        assert!(parser.is_done());
        Ok(body)
    }

    fn render(source: &str) -> String {
        let body = parse(source).unwrap();
        build::module(body).to_source().unwrap()
    }

    #[test]
    fn test_function_with_nested_blocks() {
        let source = "\
def clamp(x, lo=0, hi=10):
    if x < lo:
        return lo
    elif x > hi:
        return hi
    else:
        return x
";
        assert_eq!(render(source), source.trim_end());
    }

    #[test]
    fn test_while_else_and_assignments() {
        let source = "\
def count(n):
    total = i = 0
    while i < n:
        i = i + 1
        total = total + i
    else:
        pass
    return total
";
        assert_eq!(render(source), source.trim_end());
    }

    #[test]
    fn test_inline_suite() {
        let body = parse("def f(x): return x * 2").unwrap();
        assert_eq!(
            body,
            vec![Value::Node(build::function_def(
                "f",
                build::params(["x"]),
                vec![build::ret(build::bin_op(build::load("x"), Kind::Mult, build::num(2))).into()],
                Vec::new(),
            ))]
        );
    }

    #[test]
    fn test_decorators() {
        let body = parse("@cache\n@trace(level=2)\ndef f():\n    pass").unwrap();
        let def = body[0].as_node().unwrap();
        assert_eq!(def.field("decorator_list").unwrap().as_list().unwrap().len(), 2);
        assert_eq!(
            build::module(body).to_source().unwrap(),
            "@cache\n@trace(level=2)\ndef f():\n    pass"
        );
    }

    #[test]
    fn test_attribute_store() {
        let body = parse("self.x = 1").unwrap();
        let assign = body[0].as_node().unwrap();
        let target = &assign.field("targets").unwrap().as_list().unwrap()[0];
        let ctx = target.as_node().unwrap().field("ctx").unwrap();
        assert_eq!(ctx.kind(), Some(Kind::Store));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("def f(x):\nreturn x"),
            Err(AcquisitionError::Syntax {
                line: 1,
                message: "expected an indented block".to_string()
            })
        );
        assert_eq!(
            parse("x = 1\n    y = 2"),
            Err(AcquisitionError::Indentation { line: 2 })
        );
        assert_eq!(
            parse("f(x) = 1"),
            Err(AcquisitionError::Syntax {
                line: 1,
                message: "cannot assign to Call".to_string()
            })
        );
        assert_eq!(
            parse("else:\n    pass"),
            Err(AcquisitionError::Syntax {
                line: 1,
                message: "unexpected `else`".to_string()
            })
        );
        assert_eq!(
            parse("def f(x)\n    return x"),
            Err(AcquisitionError::Syntax {
                line: 1,
                message: "expected `:` after `def` header".to_string()
            })
        );
    }
}
