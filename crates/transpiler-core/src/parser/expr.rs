//! Expression and single-line statement grammar.
//!
//! ```ebnf
//! simple_stmt = "return", [expression] | "pass" | expression, {"=", expression};
//! expression  = lambda | disjunction;
//! lambda      = "lambda", parameters, ":", expression;
//! disjunction = conjunction, {"or", conjunction};
//! conjunction = inversion, {"and", inversion};
//! inversion   = "not", inversion | comparison;
//! comparison  = sum, {comp_op, sum};
//! comp_op     = "==" | "!=" | "<=" | ">=" | "<" | ">";
//! sum         = term, {("+" | "-"), term};
//! term        = factor, {("*" | "/" | "%"), factor};
//! factor      = ("+" | "-"), factor | power;
//! power       = primary, ["**", factor];
//! primary     = atom, {"(", [arguments], ")" | ".", name};
//! arguments   = argument, {",", argument}, [","];
//! argument    = name, "=", expression | expression;
//! atom        = "(", expression, ")" | number | string | "True" | "False" | "None" | name;
//! parameters  = [parameter, {",", parameter}, [","]];
//! parameter   = "**", name | "*", name | name, ["=", expression];
//! ```

use std::iter;

use indexmap::IndexMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, one_of, satisfy},
    combinator::{map, map_res, not, opt, recognize, value, verify},
    error::{Error, ErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::{build, Kind, Node, Value};

pub(crate) const KEYWORDS: &[&str] = &[
    "and", "def", "elif", "else", "False", "if", "lambda", "None", "not", "or", "pass",
    "return", "True", "while",
];

/// A statement that fits on one line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SimpleStmt {
    Return(Option<Node>),
    Pass,
    /// `a = b = value` as `[a, b, value]`; a lone expression has one element.
    Chain(Vec<Node>),
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `word` not followed by an identifier character.
pub(crate) fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(word), not(satisfy(is_name_char)))
}

pub(crate) fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        recognize(pair(
            satisfy(|c: char| c.is_alphabetic() || c == '_'),
            take_while(is_name_char),
        )),
        |name: &str| !KEYWORDS.contains(&name),
    )(input)
}

/// `=` that is not the start of `==`.
fn assign_eq(input: &str) -> IResult<&str, char> {
    terminated(char('='), not(char('=')))(input)
}

fn number(input: &str) -> IResult<&str, Node> {
    map_res(
        recognize(tuple((
            digit1,
            opt(pair(char('.'), digit0)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |text: &str| {
            if text.contains(|c| matches!(c, '.' | 'e' | 'E')) {
                text.parse::<f64>().map(build::num).map_err(|e| e.to_string())
            } else {
                text.parse::<i64>().map(build::num).map_err(|e| e.to_string())
            }
        },
    )(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('"' | '\''))) => q,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, c @ ('\\' | '\'' | '"'))) => out.push(c),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            c if c == quote => return Ok((&input[i + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }

    // Unterminated: no other alternative can succeed here either
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn atom(input: &str) -> IResult<&str, Node> {
    alt((
        delimited(ws(char('(')), expression, ws(char(')'))),
        ws(number),
        map(ws(string_literal), build::string),
        value(build::name_constant(Value::Bool(true)), ws(keyword("True"))),
        value(build::name_constant(Value::Bool(false)), ws(keyword("False"))),
        value(build::name_constant(Value::None), ws(keyword("None"))),
        map(ws(identifier), build::load),
    ))(input)
}

enum Argument {
    Positional(Node),
    Keyword(String, Node),
}

fn argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(
            pair(ws(identifier), preceded(ws(assign_eq), expression)),
            |(name, value)| Argument::Keyword(name.to_string(), value),
        ),
        map(expression, Argument::Positional),
    ))(input)
}

type CallArguments = (Vec<Value>, IndexMap<String, Value>);

fn call_arguments(input: &str) -> IResult<&str, CallArguments> {
    map_res(
        terminated(separated_list0(ws(char(',')), argument), opt(ws(char(',')))),
        |arguments| {
            let mut args = Vec::new();
            let mut keywords = IndexMap::new();
            for argument in arguments {
                match argument {
                    Argument::Positional(_) if !keywords.is_empty() => {
                        return Err("positional argument follows keyword argument");
                    }
                    Argument::Positional(node) => args.push(Value::Node(node)),
                    Argument::Keyword(name, node) => {
                        if keywords.insert(name, Value::Node(node)).is_some() {
                            return Err("keyword argument repeated");
                        }
                    }
                }
            }
            Ok((args, keywords))
        },
    )(input)
}

enum Trailer {
    Call(CallArguments),
    Attribute(String),
}

fn trailer(input: &str) -> IResult<&str, Trailer> {
    alt((
        map(
            delimited(ws(char('(')), call_arguments, ws(char(')'))),
            Trailer::Call,
        ),
        map(preceded(ws(char('.')), ws(identifier)), |name| {
            Trailer::Attribute(name.to_string())
        }),
    ))(input)
}

fn primary(input: &str) -> IResult<&str, Node> {
    let (input, (base, trailers)) = pair(atom, many0(trailer))(input)?;
    let node = trailers
        .into_iter()
        .fold(base, |node, trailer| match trailer {
            Trailer::Call((args, keywords)) => build::call(node, args, keywords),
            Trailer::Attribute(attr) => build::attribute(node, attr, Kind::Load),
        });
    Ok((input, node))
}

fn power(input: &str) -> IResult<&str, Node> {
    map(
        pair(primary, opt(preceded(ws(tag("**")), factor))),
        |(base, exponent)| match exponent {
            Some(exponent) => build::bin_op(base, Kind::Pow, exponent),
            None => base,
        },
    )(input)
}

fn factor(input: &str) -> IResult<&str, Node> {
    let unary = alt((value(Kind::USub, char('-')), value(Kind::UAdd, char('+'))));
    alt((
        map(pair(ws(unary), factor), |(op, operand)| build::unary_op(op, operand)),
        power,
    ))(input)
}

/// Left-associative chain of binary operators.
fn fold_binary(first: Node, rest: Vec<(Kind, Node)>) -> Node {
    rest.into_iter()
        .fold(first, |left, (op, right)| build::bin_op(left, op, right))
}

fn term(input: &str) -> IResult<&str, Node> {
    let op = alt((
        value(Kind::Mult, terminated(char('*'), not(char('*')))),
        value(Kind::Div, char('/')),
        value(Kind::Mod, char('%')),
    ));
    map(pair(factor, many0(pair(ws(op), factor))), |(first, rest)| {
        fold_binary(first, rest)
    })(input)
}

fn sum(input: &str) -> IResult<&str, Node> {
    let op = alt((value(Kind::Add, char('+')), value(Kind::Sub, char('-'))));
    map(pair(term, many0(pair(ws(op), term))), |(first, rest)| {
        fold_binary(first, rest)
    })(input)
}

fn comparison(input: &str) -> IResult<&str, Node> {
    let op = alt((
        value(Kind::Eq, tag("==")),
        value(Kind::NotEq, tag("!=")),
        value(Kind::LtE, tag("<=")),
        value(Kind::GtE, tag(">=")),
        value(Kind::Lt, char('<')),
        value(Kind::Gt, char('>')),
    ));
    map(pair(sum, many0(pair(ws(op), sum))), |(left, rest)| {
        if rest.is_empty() {
            return left;
        }
        let (ops, comparators): (Vec<Kind>, Vec<Value>) = rest
            .into_iter()
            .map(|(op, right)| (op, Value::Node(right)))
            .unzip();
        build::compare(left, ops, comparators)
    })(input)
}

fn inversion(input: &str) -> IResult<&str, Node> {
    alt((
        map(preceded(ws(keyword("not")), inversion), |operand| {
            build::unary_op(Kind::Not, operand)
        }),
        comparison,
    ))(input)
}

fn bool_chain(op: Kind, first: Node, rest: Vec<Node>) -> Node {
    if rest.is_empty() {
        return first;
    }
    build::bool_op(op, iter::once(first).chain(rest).map(Value::Node).collect())
}

fn conjunction(input: &str) -> IResult<&str, Node> {
    map(
        pair(inversion, many0(preceded(ws(keyword("and")), inversion))),
        |(first, rest)| bool_chain(Kind::And, first, rest),
    )(input)
}

fn disjunction(input: &str) -> IResult<&str, Node> {
    map(
        pair(conjunction, many0(preceded(ws(keyword("or")), conjunction))),
        |(first, rest)| bool_chain(Kind::Or, first, rest),
    )(input)
}

enum Parameter {
    Plain(String, Option<Node>),
    Star(String),
    DoubleStar(String),
}

fn parameter(input: &str) -> IResult<&str, Parameter> {
    alt((
        map(preceded(ws(tag("**")), ws(identifier)), |name| {
            Parameter::DoubleStar(name.to_string())
        }),
        map(preceded(ws(char('*')), ws(identifier)), |name| {
            Parameter::Star(name.to_string())
        }),
        map(
            pair(ws(identifier), opt(preceded(ws(assign_eq), expression))),
            |(name, default)| Parameter::Plain(name.to_string(), default),
        ),
    ))(input)
}

/// A parameter list as an `Arguments` node.
pub(crate) fn parameters(input: &str) -> IResult<&str, Node> {
    map_res(
        terminated(separated_list0(ws(char(',')), parameter), opt(ws(char(',')))),
        |params| {
            let mut args = Vec::new();
            let mut defaults = Vec::new();
            let mut vararg = None;
            let mut kwarg = None;
            for param in params {
                if kwarg.is_some() {
                    return Err("parameter after **kwargs");
                }
                match param {
                    Parameter::Plain(..) if vararg.is_some() => {
                        return Err("keyword-only parameters are not supported");
                    }
                    Parameter::Plain(name, Some(default)) => {
                        args.push(Value::Node(build::param(name)));
                        defaults.push(Value::Node(default));
                    }
                    Parameter::Plain(..) if !defaults.is_empty() => {
                        return Err("non-default parameter follows default parameter");
                    }
                    Parameter::Plain(name, None) => args.push(Value::Node(build::param(name))),
                    Parameter::Star(_) if vararg.is_some() => return Err("repeated *args"),
                    Parameter::Star(name) => vararg = Some(name),
                    Parameter::DoubleStar(name) => kwarg = Some(name),
                }
            }
            Ok(build::arguments(args, vararg, kwarg, defaults))
        },
    )(input)
}

fn lambda(input: &str) -> IResult<&str, Node> {
    map(
        tuple((ws(keyword("lambda")), parameters, ws(char(':')), expression)),
        |(_, args, _, body)| build::lambda(args, body),
    )(input)
}

pub(crate) fn expression(input: &str) -> IResult<&str, Node> {
    alt((lambda, disjunction))(input)
}

pub(crate) fn simple_statement(input: &str) -> IResult<&str, SimpleStmt> {
    alt((
        map(preceded(ws(keyword("return")), opt(expression)), SimpleStmt::Return),
        value(SimpleStmt::Pass, ws(keyword("pass"))),
        map(
            pair(expression, many0(preceded(ws(assign_eq), expression))),
            |(first, rest)| SimpleStmt::Chain(iter::once(first).chain(rest).collect()),
        ),
    ))(input)
}

/// `def name(parameters):`, leaving whatever follows the colon.
pub(crate) fn def_header(input: &str) -> IResult<&str, (&str, Node)> {
    map(
        tuple((
            ws(keyword("def")),
            ws(identifier),
            delimited(ws(char('(')), parameters, ws(char(')'))),
            ws(char(':')),
        )),
        |(_, name, args, _)| (name, args),
    )(input)
}

/// `<keyword> expression:`, leaving whatever follows the colon.
pub(crate) fn clause_header<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Node> {
    delimited(ws(keyword(word)), expression, ws(char(':')))
}

/// `else:`, leaving whatever follows the colon.
pub(crate) fn else_header(input: &str) -> IResult<&str, &str> {
    terminated(ws(keyword("else")), ws(char(':')))(input)
}

/// Run `parser` over all of `text`, describing any failure.
pub(crate) fn complete<'a, O, F>(mut parser: F, text: &'a str) -> Result<O, String>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    match parser(text) {
        Ok((rest, out)) if rest.trim().is_empty() => Ok(out),
        Ok((rest, _)) => Err(unexpected(rest)),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(unexpected(e.input)),
        Err(nom::Err::Incomplete(_)) => Err("unexpected end of line".to_string()),
    }
}

pub(crate) fn unexpected(rest: &str) -> String {
    let rest = rest.trim();
    if rest.is_empty() {
        return "unexpected end of line".to_string();
    }
    let snippet: String = rest.chars().take(20).collect();
    format!("unexpected `{snippet}`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSource;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Node {
        complete(expression, text).unwrap()
    }

    fn roundtrip(text: &str) -> String {
        parse(text).to_source().unwrap()
    }

    #[test]
    fn test_precedence_tree() {
        let tree = parse("x**2 + y");
        let expected = build::bin_op(
            build::bin_op(build::load("x"), Kind::Pow, build::num(2)),
            Kind::Add,
            build::load("y"),
        );
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_power_binds_right_and_tighter_than_unary() {
        assert_eq!(
            parse("-x ** 2"),
            build::unary_op(Kind::USub, build::bin_op(build::load("x"), Kind::Pow, build::num(2)))
        );
        assert_eq!(
            parse("a ** b ** c"),
            build::bin_op(
                build::load("a"),
                Kind::Pow,
                build::bin_op(build::load("b"), Kind::Pow, build::load("c"))
            )
        );
    }

    #[test]
    fn test_left_associative_chains() {
        assert_eq!(
            parse("a - b - c"),
            build::bin_op(
                build::bin_op(build::load("a"), Kind::Sub, build::load("b")),
                Kind::Sub,
                build::load("c")
            )
        );
    }

    #[test]
    fn test_roundtrips() {
        for text in [
            "(a + b) * c",
            "a * b % c / d",
            "f(x, y=1)",
            "math.sqrt(x * x + y * y)",
            "not a and b or c",
            "0 <= x < 10",
            "lambda x, y=2: x + y",
            "\"hi\\n\"",
            "x == None",
            "True != False",
            "1.5",
        ] {
            assert_eq!(roundtrip(text), text);
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("42"), build::num(42));
        assert_eq!(parse("2.0"), build::num(2.0));
        assert_eq!(parse("'it\\'s'"), build::string("it's"));
        assert_eq!(parse("None"), build::name_constant(Value::None));
    }

    #[test]
    fn test_keywords_are_not_names() {
        assert_eq!(parse("order"), build::load("order"));
        assert_eq!(parse("notable"), build::load("notable"));
        assert!(complete(expression, "lambda").is_err());
    }

    #[test]
    fn test_call_argument_order() {
        assert!(complete(expression, "f(a=1, b)").is_err());
        assert!(complete(expression, "f(a=1, a=2)").is_err());
        assert!(complete(expression, "f(a, b,)").is_ok());
    }

    #[test]
    fn test_parameters() {
        let (_, args) = parameters("a, b=1, *rest, **extra").unwrap();
        assert_eq!(args.to_source().unwrap(), "a, b=1, *rest, **extra");
        assert!(complete(parameters, "a=1, b").is_err());
    }

    #[test]
    fn test_simple_statements() {
        assert_eq!(
            complete(simple_statement, "return").unwrap(),
            SimpleStmt::Return(None)
        );
        assert_eq!(complete(simple_statement, "pass").unwrap(), SimpleStmt::Pass);
        match complete(simple_statement, "a = b = 1").unwrap() {
            SimpleStmt::Chain(parts) => assert_eq!(parts.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
        match complete(simple_statement, "x == 1").unwrap() {
            SimpleStmt::Chain(parts) => assert_eq!(parts.len(), 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(complete(expression, "a +").unwrap_err(), "unexpected `+`");
        assert_eq!(complete(expression, "'open").unwrap_err(), "unexpected `'open`");
        assert_eq!(complete(expression, "f(1").unwrap_err(), "unexpected `(1`");
    }

    #[test]
    fn test_headers() {
        let (rest, (name, args)) = def_header("def sqr(x, y): return x").unwrap();
        assert_eq!(name, "sqr");
        assert_eq!(args, build::params(["x", "y"]));
        assert_eq!(rest, "return x");

        let (rest, test) = clause_header("while")("while n > 0:").unwrap();
        assert_eq!(test.to_source().unwrap(), "n > 0");
        assert_eq!(rest, "");
        assert!(else_header("else :").is_ok());
    }
}
