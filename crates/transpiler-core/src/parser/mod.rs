/*!
# Tree Acquisition

Parses a small indentation-structured, Python-like language into a
[`Node`] tree ready for rewriting.

## Overview

Source text is first folded into logical lines (comments and blank lines
dropped, bracketed and backslash continuations joined). Compound
statements are then assembled from indentation, and each line's
expression grammar is parsed with `nom`.

```ebnf
module     = {statement};
statement  = decorated | funcdef | if_stmt | while_stmt | simple_stmt;
decorated  = {"@", expression, NEWLINE}-, funcdef;
funcdef    = "def", name, "(", parameters, ")", ":", suite;
if_stmt    = "if", expression, ":", suite, {"elif", expression, ":", suite}, ["else", ":", suite];
while_stmt = "while", expression, ":", suite, ["else", ":", suite];
suite      = simple_stmt | NEWLINE, INDENT, {statement}-, DEDENT;
```

The expression grammar is documented in `expr`.

## Example Usage

```rust
use transpiler_core::ast::{Kind, ToSource};
use transpiler_core::parser;

let def = parser::parse_function("def area(r):\n    return 3.14 * r**2\n")?;
assert_eq!(def.kind(), Kind::FunctionDef);
assert_eq!(def.to_source()?, "def area(r):\n    return 3.14 * r ** 2");

let lambda = parser::parse_function("lambda a, b=1: a + b")?;
assert_eq!(lambda.kind(), Kind::Lambda);
# Ok::<(), anyhow::Error>(())
```
*/

mod block;
mod expr;
mod lines;

use thiserror::Error;
use tracing::debug;

use crate::ast::{build, Kind, Node, Value};
use block::BlockParser;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("no source to parse")]
    Empty,

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: unexpected indentation")]
    Indentation { line: usize },

    #[error("expected a single function definition or lambda, found {found}")]
    NotAFunction { found: String },
}

/// Parse a whole source text into a `Module`.
pub fn parse_module(text: &str) -> Result<Node, AcquisitionError> {
    let lines = lines::logical_lines(text);
    let first = lines.first().ok_or(AcquisitionError::Empty)?;
    if first.indent > 0 {
        return Err(AcquisitionError::Indentation { line: first.number });
    }

    let mut parser = BlockParser::new(lines);
    let body = parser.block(0)?;
    debug_assert!(parser.is_done());
    debug!(statements = body.len(), "parsed module");
    Ok(build::module(body))
}

/// Parse source holding exactly one function definition or lambda.
pub fn parse_function(text: &str) -> Result<Node, AcquisitionError> {
    acquire(parse_module(text)?)
}

/// Reduce a tree to the single function it defines.
///
/// A `FunctionDef` or `Lambda` is returned as is. A `Module` must hold
/// exactly one statement, a definition or a lambda expression statement.
pub fn acquire(tree: Node) -> Result<Node, AcquisitionError> {
    match tree.kind() {
        Kind::FunctionDef | Kind::Lambda => Ok(tree),
        Kind::Module => {
            let body = match tree.into_fields().into_iter().next() {
                Some(Value::List(body)) => body,
                _ => {
                    return Err(AcquisitionError::NotAFunction {
                        found: "a malformed Module".to_string(),
                    })
                }
            };
            if body.len() != 1 {
                return Err(AcquisitionError::NotAFunction {
                    found: format!("{} top-level statements", body.len()),
                });
            }
            let Some(Value::Node(statement)) = body.into_iter().next() else {
                return Err(AcquisitionError::NotAFunction {
                    found: "a non-node statement".to_string(),
                });
            };
            match statement.kind() {
                Kind::FunctionDef => Ok(statement),
                Kind::Expr => match statement.into_fields().into_iter().next() {
                    Some(Value::Node(value)) if value.kind() == Kind::Lambda => Ok(value),
                    Some(Value::Node(value)) => Err(AcquisitionError::NotAFunction {
                        found: format!("an expression ({})", value.kind()),
                    }),
                    _ => Err(AcquisitionError::NotAFunction {
                        found: "an expression".to_string(),
                    }),
                },
                other => Err(AcquisitionError::NotAFunction {
                    found: other.to_string(),
                }),
            }
        }
        other => Err(AcquisitionError::NotAFunction {
            found: other.to_string(),
        }),
    }
}
