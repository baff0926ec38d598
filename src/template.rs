//! Parser for JSONPath templates.
//!
//! A template is scanned byte by byte: text outside `{…}` accumulates into
//! literal elements, while a `{` dispatches on the trimmed tail to one of
//! the curly element forms - a range opener (`{range Q}`), a range closer
//! (`{end}`), a quoted text element (`{"…"}`/`{'…'}`), or an embedded
//! JSONPath query (`{$…}`, `{@…}`, `{.…}`, `{[…]}`).
//!
//! Range bodies are parsed with the relative default context, so an
//! identifier-less query inside a range is anchored at the iterated node
//! rather than the document root.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::TemplateElement;
use crate::error::SyntaxError;
use crate::lexer::Cursor;
use crate::parser::parse_inner_query;

static RANGE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\s*range").expect("hardcoded regex"));
static RANGE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\s*end\s*\}").expect("hardcoded regex"));
static QUOTED_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\{\s*["']"#).expect("hardcoded regex"));
static QUERY_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\s*[$.@\[]").expect("hardcoded regex"));

/// A compiled template: an ordered list of elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    name: String,
    elements: Vec<TemplateElement>,
}

impl Template {
    /// Parses a template. Queries at the top level default to the document
    /// root when no identifier is written.
    pub fn parse(name: &str, template: &str) -> Result<Template, SyntaxError> {
        let mut cursor = Cursor::new(template);
        let elements = parse_template_elements(name, &mut cursor)?;
        Ok(Template {
            name: name.to_string(),
            elements,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> &[TemplateElement] {
        &self.elements
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for elem in &self.elements {
            write!(f, "{}", elem)?;
        }
        Ok(())
    }
}

fn syntax_err(name: &str, cursor: &Cursor, msg: impl Into<String>) -> SyntaxError {
    SyntaxError::new(name, msg, cursor.input(), cursor.pos())
}

fn parse_template_elements(
    name: &str,
    cursor: &mut Cursor,
) -> Result<Vec<TemplateElement>, SyntaxError> {
    let mut elements = Vec::new();
    loop {
        match cursor.peek() {
            Some('"' | '\'') => {
                if !cursor.consume().is_empty() {
                    return Err(syntax_err(
                        name,
                        cursor,
                        "unexpected quote (hint: quotes may only begin a template element or must be escaped within a quoted text element)",
                    ));
                }
                if let Some(elem) = parse_quoted_text_elem(name, cursor)? {
                    elements.push(elem);
                }
            }
            Some('{') => {
                let text = cursor.consume();
                if !text.is_empty() {
                    elements.push(TemplateElement::Text(text.to_string()));
                }
                if let Some(elem) = parse_curly_elem(name, cursor, true)? {
                    elements.push(elem);
                }
            }
            None => {
                let text = cursor.consume();
                if !text.is_empty() {
                    elements.push(TemplateElement::Text(text.to_string()));
                }
                return Ok(elements);
            }
            _ => {
                cursor.next();
            }
        }
    }
}

/// Dispatches a `{…}` element by regex lookahead on the tail.
fn parse_curly_elem(
    name: &str,
    cursor: &mut Cursor,
    abs_default: bool,
) -> Result<Option<TemplateElement>, SyntaxError> {
    if cursor.look_ahead(&RANGE_END_RE) {
        return Err(syntax_err(name, cursor, "not in range, nothing to end"));
    }
    if cursor.look_ahead(&RANGE_START_RE) {
        return parse_range_elem(name, cursor, abs_default).map(Some);
    }
    if cursor.look_ahead(&QUOTED_START_RE) {
        return cursor.unwrap_delimited(name, '{', '}', true, |c| parse_quoted_text_elem(name, c));
    }
    if cursor.look_ahead(&QUERY_START_RE) {
        return cursor
            .unwrap_delimited(name, '{', '}', true, |c| {
                parse_query_elem(c, abs_default)
            })
            .map(Some);
    }
    Err(syntax_err(
        name,
        cursor,
        "invalid template element (hint: '{' as part of a text requires quotes; static text elements within curly brackets need quotes as well)",
    ))
}

fn parse_quoted_text_elem(
    name: &str,
    cursor: &mut Cursor,
) -> Result<Option<TemplateElement>, SyntaxError> {
    let text = cursor
        .parse_quoted()
        .map_err(|msg| syntax_err(name, cursor, msg))?;
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(TemplateElement::Text(text)))
    }
}

fn parse_query_elem(cursor: &mut Cursor, abs_default: bool) -> Result<TemplateElement, SyntaxError> {
    let id = cursor.next_template_query_id();
    let query = parse_inner_query(format!("tmplQry-{}", id), abs_default, cursor)?;
    Ok(TemplateElement::Query(query))
}

/// Parses `{range Q}body{end}`. The header query keeps the enclosing default
/// context; the body queries default to the currently iterated node.
fn parse_range_elem(
    name: &str,
    cursor: &mut Cursor,
    abs_default: bool,
) -> Result<TemplateElement, SyntaxError> {
    let query = cursor.unwrap_delimited(name, '{', '}', true, |c| {
        expect_keyword(name, c, "range")?;
        match parse_query_elem(c, abs_default)? {
            TemplateElement::Query(q) => Ok(q),
            _ => unreachable!("range header parses as a query element"),
        }
    })?;

    let mut body = Vec::new();
    loop {
        match cursor.peek() {
            Some('"' | '\'') => {
                if !cursor.consume().is_empty() {
                    return Err(syntax_err(
                        name,
                        cursor,
                        "unescaped quotes can only be at the beginning of a quoted text element",
                    ));
                }
                if let Some(elem) = parse_quoted_text_elem(name, cursor)? {
                    body.push(elem);
                }
            }
            Some('{') => {
                let text = cursor.consume();
                if !text.is_empty() {
                    body.push(TemplateElement::Text(text.to_string()));
                }
                if cursor.look_ahead(&RANGE_END_RE) {
                    cursor.unwrap_delimited(name, '{', '}', true, |c| {
                        expect_keyword(name, c, "end")
                    })?;
                    break;
                }
                if let Some(elem) = parse_curly_elem(name, cursor, false)? {
                    body.push(elem);
                }
            }
            None => {
                return Err(syntax_err(
                    name,
                    cursor,
                    "unexpected end of input - range element not closed with {end}",
                ))
            }
            _ => {
                cursor.next();
            }
        }
    }
    Ok(TemplateElement::Range { query, body })
}

fn expect_keyword(name: &str, cursor: &mut Cursor, keyword: &str) -> Result<(), SyntaxError> {
    for _ in 0..keyword.chars().count() {
        cursor.next();
    }
    if cursor.consume() != keyword {
        return Err(syntax_err(name, cursor, format!("expected '{}'", keyword)));
    }
    Ok(())
}
