//! Placeholder grammar for `Template` nodes.
//!
//! ```text
//! template    = { text | "{{" | "}}" | placeholder } ;
//! placeholder = "{", [ index ], [ ":", spec ], "}" ;
//! spec        = "node" ;
//! ```
//!
//! `{0}` splices argument 0 literally, `{0:node}` renders it as a sub-tree.
//! An omitted index takes the next automatic position; mixing automatic and
//! explicit indices in one template is rejected.

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use super::source_gen::RenderError;

/// How a placeholder's argument is spliced into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Use the scalar as-is.
    Literal,
    /// Render the argument through the printer.
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Arg { index: usize, mode: RenderMode },
}

#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    Field {
        index: Option<usize>,
        spec: Option<&'a str>,
    },
}

fn escaped(input: &str) -> IResult<&str, Piece<'_>> {
    alt((
        value(Piece::Text("{"), tag("{{")),
        value(Piece::Text("}"), tag("}}")),
    ))(input)
}

fn field(input: &str) -> IResult<&str, Piece<'_>> {
    map(
        delimited(
            char('{'),
            pair(
                opt(map_res(digit1, |s: &str| s.parse::<usize>())),
                opt(preceded(char(':'), take_while(|c: char| c != '{' && c != '}'))),
            ),
            char('}'),
        ),
        |(index, spec)| Piece::Field { index, spec },
    )(input)
}

fn text(input: &str) -> IResult<&str, Piece<'_>> {
    map(is_not("{}"), Piece::Text)(input)
}

fn pieces(input: &str) -> IResult<&str, Vec<Piece<'_>>> {
    many0(alt((escaped, field, text)))(input)
}

/// Split a template into text and argument segments.
pub fn parse_template(template: &str) -> Result<Vec<Segment>, RenderError> {
    let bad = |message: String| RenderError::BadPlaceholder {
        template: template.to_string(),
        message,
    };

    let (rest, pieces) =
        pieces(template).map_err(|e| bad(format!("unparseable template: {e}")))?;
    if !rest.is_empty() {
        let offset = template.len() - rest.len();
        return Err(bad(format!("unmatched brace at offset {offset}")));
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut next_auto = 0;
    let mut numbering: Option<bool> = None;

    for piece in pieces {
        match piece {
            Piece::Text(s) => match segments.last_mut() {
                Some(Segment::Text(prev)) => prev.push_str(s),
                _ => segments.push(Segment::Text(s.to_string())),
            },
            Piece::Field { index, spec } => {
                let automatic = index.is_none();
                if numbering.is_some_and(|auto| auto != automatic) {
                    return Err(bad(
                        "cannot mix automatic and explicit argument numbering".to_string(),
                    ));
                }
                numbering = Some(automatic);

                let index = index.unwrap_or_else(|| {
                    next_auto += 1;
                    next_auto - 1
                });
                let mode = match spec {
                    None | Some("") => RenderMode::Literal,
                    Some("node") => RenderMode::Node,
                    Some(other) => return Err(bad(format!("unknown format spec `{other}`"))),
                };
                segments.push(Segment::Arg { index, mode });
            }
        }
    }

    Ok(segments)
}
