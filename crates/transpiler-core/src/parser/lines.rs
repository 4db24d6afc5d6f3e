//! Physical lines to logical lines: comments stripped, blank lines dropped,
//! bracketed and backslash continuations joined.

/// One logical source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    /// 1-based number of the first physical line.
    pub number: usize,
    /// Columns of leading whitespace; a tab advances to the next multiple of 8.
    pub indent: usize,
    pub text: String,
}

struct Scan<'a> {
    code: &'a str,
    depth_change: i32,
}

/// Cut a trailing comment and measure bracket nesting, ignoring both
/// inside string literals.
fn scan(raw: &str) -> Scan<'_> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth_change = 0;

    for (i, c) in raw.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '#' => {
                return Scan {
                    code: &raw[..i],
                    depth_change,
                }
            }
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => depth_change += 1,
            ')' | ']' | '}' => depth_change -= 1,
            _ => {}
        }
    }

    Scan {
        code: raw,
        depth_change,
    }
}

fn indent_width(raw: &str) -> usize {
    let mut width = 0;
    for c in raw.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width = (width / 8 + 1) * 8,
            _ => break,
        }
    }
    width
}

pub(crate) fn logical_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pending: Option<Line> = None;
    let mut depth = 0;

    for (index, raw) in source.lines().enumerate() {
        let scanned = scan(raw);
        let mut code = scanned.code.trim();
        let continued = code.ends_with('\\');
        if continued {
            code = code[..code.len() - 1].trim_end();
        }

        match pending.as_mut() {
            Some(open) => {
                if !code.is_empty() {
                    open.text.push(' ');
                    open.text.push_str(code);
                }
            }
            None if code.is_empty() && !continued => continue,
            None => {
                pending = Some(Line {
                    number: index + 1,
                    indent: indent_width(raw),
                    text: code.to_string(),
                });
            }
        }

        depth = (depth + scanned.depth_change).max(0);
        if depth == 0 && !continued {
            lines.extend(pending.take());
        }
    }

    // An unclosed bracket runs to the end; the expression parser reports it
    lines.extend(pending);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(number: usize, indent: usize, text: &str) -> Line {
        Line {
            number,
            indent,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "def f(x):  # header\n\n    # only a comment\n    return '#' + x\n";
        assert_eq!(
            logical_lines(source),
            vec![line(1, 0, "def f(x):"), line(4, 4, "return '#' + x")]
        );
    }

    #[test]
    fn test_bracket_continuation() {
        let source = "x = f(1,\n      2)\ny = 3";
        assert_eq!(
            logical_lines(source),
            vec![line(1, 0, "x = f(1, 2)"), line(3, 0, "y = 3")]
        );
    }

    #[test]
    fn test_backslash_continuation() {
        let source = "return a + \\\n    b";
        assert_eq!(logical_lines(source), vec![line(1, 0, "return a + b")]);
    }

    #[test]
    fn test_tab_indent() {
        assert_eq!(indent_width("\tx"), 8);
        assert_eq!(indent_width("  \tx"), 8);
        assert_eq!(indent_width("\t  x"), 10);
    }
}
