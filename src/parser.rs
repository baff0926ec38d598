//! Recursive-descent parser for JSONPath queries.
//!
//! Grammar (whitespace between tokens is always allowed):
//!
//! ```text
//! Query       := [Identifier] Segment*
//! Identifier  := '$' | '@'
//! Segment     := '.'  Selector1
//!              | '..' Selector1
//!              | '..' '[' SelectorList ']'
//!              | '['  SelectorList ']'
//! Selector1   := '*' | QuotedName | UnquotedName
//! SelectorList:= Selector (',' Selector)*
//! Selector    := '*' | QuotedName | UnquotedName
//!              | Int | Slice | '?' FilterExpr
//! Slice       := [Int] ':' [Int] [':' [Int]]
//! ```
//!
//! Filter expressions bind `||` loosest, then `&&`, then unary `!`, then the
//! comparison operators; comparison is non-associative. The parser state is
//! threaded explicitly so the template parser can hand its cursor over for
//! embedded queries and keep a single pass over the whole template.

use crate::ast::{
    ArraySlice, CompareOp, FilterExpr, FilterQuery, LogicalOp, NodeIdentifier, Query, Segment,
    SegmentKind, Selector,
};
use crate::error::SyntaxError;
use crate::lexer::{is_alpha_numeric, Cursor};

/// Parses a standalone query. Without an explicit identifier the query is
/// anchored at the document root.
pub fn parse_query(name: &str, query: &str) -> Result<Query, SyntaxError> {
    if query.is_empty() {
        return Err(SyntaxError::new(name, "invalid query - empty", query, 0));
    }
    let mut cursor = Cursor::new(query);
    parse_inner_query(name.to_string(), true, &mut cursor)
}

/// Parses a query from an already running cursor. `abs_default` selects the
/// identifier assumed when none is written: root at the template top level,
/// current node inside filters and range bodies.
pub(crate) fn parse_inner_query(
    name: String,
    abs_default: bool,
    cursor: &mut Cursor,
) -> Result<Query, SyntaxError> {
    let root = parse_node_identifier(cursor, abs_default);
    let mut segments = Vec::new();
    parse_segments(&name, cursor, &mut segments)?;
    Ok(Query::new(name, root, segments))
}

fn syntax_err(name: &str, cursor: &Cursor, msg: impl Into<String>) -> SyntaxError {
    SyntaxError::new(name, msg, cursor.input(), cursor.pos())
}

fn parse_node_identifier(cursor: &mut Cursor, abs_default: bool) -> NodeIdentifier {
    match cursor.peek_skipping_ws() {
        Some('$') => {
            cursor.consume_next();
            NodeIdentifier::Root
        }
        Some('@') => {
            cursor.consume_next();
            NodeIdentifier::Current
        }
        _ => {
            if abs_default {
                NodeIdentifier::Root
            } else {
                NodeIdentifier::Current
            }
        }
    }
}

fn parse_segments(
    name: &str,
    cursor: &mut Cursor,
    segments: &mut Vec<Segment>,
) -> Result<(), SyntaxError> {
    loop {
        match cursor.peek_skipping_ws() {
            Some('[') => {
                let segment = parse_bracket_segment(name, cursor, SegmentKind::Child)?;
                segments.push(segment);
            }
            Some('.') => parse_dot(name, cursor, segments)?,
            // no valid segment start: the query ends here
            _ => return Ok(()),
        }
    }
}

fn parse_dot(
    name: &str,
    cursor: &mut Cursor,
    segments: &mut Vec<Segment>,
) -> Result<(), SyntaxError> {
    cursor.consume_next(); // the '.'
    let mut kind = SegmentKind::Child;
    if cursor.peek() == Some('.') {
        cursor.consume_next();
        kind = SegmentKind::Descendant;
    }
    match cursor.peek() {
        Some('[') => {
            // bracketed selectors only combine with '..', never a single '.'
            if kind != SegmentKind::Descendant {
                return Err(syntax_err(
                    name,
                    cursor,
                    "unexpected '[' (hint: use EITHER '.' or '[]' notation for child segments. only descendant segments may combine '..' with a '[]' selector list)",
                ));
            }
            let segment = parse_bracket_segment(name, cursor, kind)?;
            segments.push(segment);
            Ok(())
        }
        Some('*') => {
            cursor.consume_next();
            segments.push(Segment {
                kind,
                selectors: vec![Selector::Wildcard],
            });
            Ok(())
        }
        Some('"' | '\'') => {
            let s = cursor
                .parse_quoted()
                .map_err(|msg| syntax_err(name, cursor, msg))?;
            segments.push(Segment {
                kind,
                selectors: vec![Selector::Name(s)],
            });
            Ok(())
        }
        Some('.') => Err(syntax_err(
            name,
            cursor,
            "invalid chaining of '.'/'..' segment operators",
        )),
        Some(c) if is_alpha_numeric(c) => {
            let s = parse_alpha_numeric(name, cursor)?;
            segments.push(Segment {
                kind,
                selectors: vec![Selector::Name(s)],
            });
            Ok(())
        }
        _ => Err(syntax_err(name, cursor, "no valid selector found after '.'")),
    }
}

fn parse_bracket_segment(
    name: &str,
    cursor: &mut Cursor,
    kind: SegmentKind,
) -> Result<Segment, SyntaxError> {
    let mut segment = Segment {
        kind,
        selectors: Vec::new(),
    };
    cursor.unwrap_delimited(name, '[', ']', true, |c| {
        loop {
            parse_selector(name, c, &mut segment)?;
            match c.peek_skipping_ws() {
                Some(',') => {
                    c.consume_next();
                }
                _ => break,
            }
        }
        Ok(())
    })?;
    Ok(segment)
}

fn parse_selector(
    name: &str,
    cursor: &mut Cursor,
    segment: &mut Segment,
) -> Result<(), SyntaxError> {
    match cursor.peek_skipping_ws() {
        Some('"' | '\'') => {
            let s = cursor
                .parse_quoted()
                .map_err(|msg| syntax_err(name, cursor, msg))?;
            segment.selectors.push(Selector::Name(s));
            Ok(())
        }
        Some('*') => {
            cursor.consume_next();
            segment.selectors.push(Selector::Wildcard);
            Ok(())
        }
        Some(c) if c == '+' || c == '-' || c == ':' || c.is_ascii_digit() => {
            parse_index_or_slice(name, cursor, segment)
        }
        Some('?') => {
            cursor.consume_next();
            let expr = parse_filter_expressions(name, cursor)?;
            segment.selectors.push(Selector::filter(expr));
            Ok(())
        }
        Some(c) if is_alpha_numeric(c) => {
            let s = parse_alpha_numeric(name, cursor)?;
            segment.selectors.push(Selector::Name(s));
            Ok(())
        }
        _ => Err(syntax_err(name, cursor, "no valid selector detected")),
    }
}

fn parse_index_or_slice(
    name: &str,
    cursor: &mut Cursor,
    segment: &mut Segment,
) -> Result<(), SyntaxError> {
    match cursor.peek_skipping_ws() {
        Some(':') => {
            // slice with empty start
            cursor.consume_next();
            let slice = parse_slice_values(name, cursor, None)?;
            segment.selectors.push(Selector::Slice(slice));
            Ok(())
        }
        Some(c) if c == '+' || c == '-' || c.is_ascii_digit() => {
            let i = cursor
                .parse_integer()
                .map_err(|msg| syntax_err(name, cursor, msg))?;
            match cursor.peek_skipping_ws() {
                Some(':') => {
                    cursor.consume_next();
                    let slice = parse_slice_values(name, cursor, Some(i))?;
                    segment.selectors.push(Selector::Slice(slice));
                }
                _ => segment.selectors.push(Selector::Index(i)),
            }
            Ok(())
        }
        _ => Err(syntax_err(name, cursor, "invalid index/arraySlice selector")),
    }
}

fn parse_slice_values(
    name: &str,
    cursor: &mut Cursor,
    start: Option<i32>,
) -> Result<ArraySlice, SyntaxError> {
    let end = match cursor.peek_skipping_ws() {
        Some(c) if c == '+' || c == '-' || c.is_ascii_digit() => Some(
            cursor
                .parse_integer()
                .map_err(|msg| syntax_err(name, cursor, msg))?,
        ),
        Some(':') => None,
        // just '<start>:' without a second colon or an end value
        _ => {
            return Ok(ArraySlice {
                start,
                end: None,
                step: 1,
            })
        }
    };

    if cursor.peek_skipping_ws() != Some(':') {
        return Ok(ArraySlice { start, end, step: 1 });
    }
    cursor.consume_next();

    match cursor.peek_skipping_ws() {
        Some(c) if c == '+' || c == '-' || c.is_ascii_digit() => {
            let step = cursor
                .parse_integer()
                .map_err(|msg| syntax_err(name, cursor, msg))?;
            Ok(ArraySlice { start, end, step })
        }
        _ => Ok(ArraySlice { start, end, step: 1 }),
    }
}

/// Parses a chain of filter expressions combined with comparison and logical
/// operators.
fn parse_filter_expressions(name: &str, cursor: &mut Cursor) -> Result<FilterExpr, SyntaxError> {
    let expr = match cursor.peek_skipping_ws() {
        Some('!') => {
            cursor.consume_next();
            let operand = parse_filter_expr(name, cursor)?;
            FilterExpr::logical(operand, None, LogicalOp::Not)
        }
        _ => parse_filter_expr(name, cursor)?,
    };
    parse_op_and_right(name, cursor, expr)
}

/// Given an already parsed expression, parses any trailing operator and its
/// right-hand side, repeating until no operator follows.
///
/// A comparison takes exactly one atom on the right: it is sticky, binding
/// tighter than the logical operators. `&&`/`||` recurse into a full
/// right-hand side and are then rebalanced so `&&` binds tighter than `||`.
fn parse_op_and_right(
    name: &str,
    cursor: &mut Cursor,
    left: FilterExpr,
) -> Result<FilterExpr, SyntaxError> {
    let mut left = left;
    loop {
        let expr = match cursor.peek_skipping_ws() {
            Some(c @ ('<' | '=' | '>' | '!')) => {
                cursor.next();
                let has_eq = cursor.peek() == Some('=');
                if has_eq {
                    cursor.next();
                } else if c == '=' {
                    return Err(syntax_err(
                        name,
                        cursor,
                        "invalid compare-operator: '=' (hint: use '==' for equality. valid ops: ==, <=, <, >, >=, !=)",
                    ));
                } else if c == '!' {
                    return Err(syntax_err(
                        name,
                        cursor,
                        "invalid compare-operator: '!' (hint: use '!=' for inequality)",
                    ));
                }
                let op = match (c, has_eq) {
                    ('<', true) => CompareOp::Le,
                    ('<', false) => CompareOp::Lt,
                    ('>', true) => CompareOp::Ge,
                    ('>', false) => CompareOp::Gt,
                    ('=', _) => CompareOp::Eq,
                    ('!', _) => CompareOp::Ne,
                    _ => unreachable!(),
                };
                cursor.consume();
                // only ONE atom on the right: comparison has priority
                let right = parse_filter_expr(name, cursor)?;
                FilterExpr::compare(left, right, op)
                    .map_err(|msg| syntax_err(name, cursor, msg))?
            }

            Some(c @ ('&' | '|')) => {
                cursor.next();
                if cursor.peek() != Some(c) {
                    return Err(syntax_err(
                        name,
                        cursor,
                        format!("invalid logical operator (hint: did you mean '{}{}'?)", c, c),
                    ));
                }
                cursor.next();
                cursor.consume();
                let op = if c == '&' { LogicalOp::And } else { LogicalOp::Or };
                // the right-hand side is parsed in full first, as logical ops
                // bind loosest
                let right = parse_filter_expressions(name, cursor)?;
                rebalance_logical(left, right, op)
            }

            // end of the filter expression
            _ => return Ok(left),
        };
        left = expr;
    }
}

/// Restores `&&`-binds-tighter-than-`||` after the greedy right-hand parse:
/// `(L || R) && B` becomes `L || (R && B)`, and `A && (L || R)` becomes
/// `(A && L) || R`.
fn rebalance_logical(left: FilterExpr, right: FilterExpr, op: LogicalOp) -> FilterExpr {
    match (op, left, right) {
        (
            LogicalOp::And,
            FilterExpr::Logical {
                op: LogicalOp::Or,
                left: or_left,
                right: Some(or_right),
            },
            right,
        ) => FilterExpr::logical(
            *or_left,
            Some(FilterExpr::logical(*or_right, Some(right), LogicalOp::And)),
            LogicalOp::Or,
        ),
        (
            LogicalOp::And,
            left,
            FilterExpr::Logical {
                op: LogicalOp::Or,
                left: or_left,
                right: Some(or_right),
            },
        ) => FilterExpr::logical(
            FilterExpr::logical(left, Some(*or_left), LogicalOp::And),
            Some(*or_right),
            LogicalOp::Or,
        ),
        (op, left, right) => FilterExpr::logical(left, Some(right), op),
    }
}

/// Parses a single filter atom: a sub-query, a parenthesised expression, or
/// a literal/function-call text expression.
fn parse_filter_expr(name: &str, cursor: &mut Cursor) -> Result<FilterExpr, SyntaxError> {
    match cursor.peek_skipping_ws() {
        Some('@' | '$' | '.' | '[') => parse_filter_query_expr(cursor),
        Some('(') => {
            let mut exprs = parse_paren_expr(name, cursor, false)?;
            if exprs.len() != 1 {
                return Err(syntax_err(
                    name,
                    cursor,
                    "only a single expression can be contained within expression parentheses",
                ));
            }
            Ok(exprs.remove(0))
        }
        _ => parse_text_expr(name, cursor),
    }
}

fn parse_paren_expr(
    name: &str,
    cursor: &mut Cursor,
    allow_multiple: bool,
) -> Result<Vec<FilterExpr>, SyntaxError> {
    cursor.unwrap_delimited(name, '(', ')', true, |c| {
        let mut results = Vec::with_capacity(2);
        loop {
            let expr = parse_filter_expressions(name, c)?;
            if !allow_multiple {
                results.push(FilterExpr::paren(expr));
                return Ok(results);
            }
            results.push(expr);
            match c.peek_skipping_ws() {
                Some(',') => {
                    c.consume_next();
                }
                Some(')') => return Ok(results),
                _ => {
                    return Err(syntax_err(
                        name,
                        c,
                        "invalid syntax - ',' or ')' expected (hint: text literals in query filters must be quoted, otherwise they are interpreted as function names)",
                    ))
                }
            }
        }
    })
}

/// Parses a literal or a function-call expression.
fn parse_text_expr(name: &str, cursor: &mut Cursor) -> Result<FilterExpr, SyntaxError> {
    match cursor.peek_skipping_ws() {
        Some('"' | '\'') => {
            let s = cursor
                .parse_quoted()
                .map_err(|msg| syntax_err(name, cursor, msg))?;
            Ok(FilterExpr::StringLit(s))
        }
        Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
            parse_number_literal(name, cursor)
        }
        Some(c) if is_alpha_numeric(c) => {
            let word = parse_alpha_numeric(name, cursor)?;
            match word.as_str() {
                // only the lower case identifiers are valid literals
                "true" => Ok(FilterExpr::BoolLit(true)),
                "false" => Ok(FilterExpr::BoolLit(false)),
                "null" => Ok(FilterExpr::NullLit),
                _ => {
                    let args = parse_paren_expr(name, cursor, true)?;
                    Ok(FilterExpr::function(word, args))
                }
            }
        }
        _ => Err(syntax_err(name, cursor, "unexpected char in filter expression")),
    }
}

/// Numbers are integers unless a '.' or exponent appears.
fn parse_number_literal(name: &str, cursor: &mut Cursor) -> Result<FilterExpr, SyntaxError> {
    if let Some('-' | '+') = cursor.peek() {
        cursor.next();
    }
    let mut decimal_sep = false;
    let mut exp_sep = false;
    loop {
        match cursor.peek() {
            Some('.') if !decimal_sep => {
                cursor.next();
                decimal_sep = true;
            }
            Some('e') if !exp_sep => {
                cursor.next();
                exp_sep = true;
                if let Some('-' | '+') = cursor.peek() {
                    cursor.next();
                }
            }
            Some(c) if c.is_ascii_digit() => {
                cursor.next();
            }
            _ => break,
        }
    }
    let s = cursor.consume();
    if decimal_sep || exp_sep {
        match s.parse::<f64>() {
            Ok(v) => Ok(FilterExpr::FloatLit(v)),
            Err(e) => Err(syntax_err(name, cursor, format!("invalid float: {}", e))),
        }
    } else {
        match s.parse::<i64>() {
            Ok(v) => Ok(FilterExpr::IntLit(v)),
            Err(e) => Err(syntax_err(name, cursor, format!("invalid integer: {}", e))),
        }
    }
}

/// Parses a sub-query used inside a filter; it shares the outer cursor and
/// defaults to the current node when no identifier is written.
fn parse_filter_query_expr(cursor: &mut Cursor) -> Result<FilterExpr, SyntaxError> {
    let id = cursor.next_filter_query_id();
    let query = parse_inner_query(format!("filterQry-{}", id), false, cursor)?;
    Ok(FilterExpr::Query(FilterQuery {
        query,
        existence_only: false,
    }))
}

/// Parses an unquoted name: alphanumerics plus '_', no escapes.
fn parse_alpha_numeric(name: &str, cursor: &mut Cursor) -> Result<String, SyntaxError> {
    loop {
        match cursor.peek() {
            Some('\\') => {
                return Err(syntax_err(
                    name,
                    cursor,
                    "escaping not allowed in unquoted name-selectors",
                ))
            }
            Some(c) if is_alpha_numeric(c) => {
                cursor.next();
            }
            _ => break,
        }
    }
    Ok(cursor.consume().to_string())
}
