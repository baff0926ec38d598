use regex::Regex;

use crate::error::SyntaxError;

/// Stateful byte-position cursor over a UTF-8 string.
///
/// Both parsers drive the same cursor: the template parser hands it to the
/// query parser for embedded queries so a single pass can parse the whole
/// template with correct positions. The cursor also carries the monotonic
/// counters used to name inner queries (`filterQry-N`, `tmplQry-N`).
pub struct Cursor<'a> {
    input: &'a str,
    start: usize,
    pos: usize,

    sub_qry_cnt: usize,
    tmpl_qry_cnt: usize,
}

fn is_ws(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Alphabetic, digit, or underscore - the characters allowed in unquoted names.
pub fn is_alpha_numeric(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Cursor {
            input,
            start: 0,
            pos: 0,
            sub_qry_cnt: 0,
            tmpl_qry_cnt: 0,
        }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns the next code point and advances, or `None` at end of input.
    pub fn next(&mut self) -> Option<char> {
        let c = self.input[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Returns the next code point without advancing.
    pub fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the text between the last mark and the current position and
    /// advances the mark.
    pub fn consume(&mut self) -> &'a str {
        let value = &self.input[self.start..self.pos];
        self.start = self.pos;
        value
    }

    /// Advances one code point and discards everything up to it.
    pub fn consume_next(&mut self) -> Option<char> {
        let c = self.next();
        self.consume();
        c
    }

    /// Advances past whitespace, returning the first non-whitespace code
    /// point (consumed).
    pub fn next_skipping_ws(&mut self) -> Option<char> {
        loop {
            match self.next() {
                Some(c) if is_ws(c) => {
                    self.consume();
                }
                other => return other,
            }
        }
    }

    /// Discards leading whitespace and peeks at the first code point after it.
    pub fn peek_skipping_ws(&mut self) -> Option<char> {
        loop {
            match self.peek() {
                Some(c) if is_ws(c) => {
                    self.consume_next();
                }
                other => return other,
            }
        }
    }

    /// Regex match against the remaining tail of the input.
    pub fn look_ahead(&self, test: &Regex) -> bool {
        test.is_match(&self.input[self.pos..])
    }

    /// Fresh id for naming a filter sub-query.
    pub fn next_filter_query_id(&mut self) -> usize {
        let id = self.sub_qry_cnt;
        self.sub_qry_cnt += 1;
        id
    }

    /// Fresh id for naming a template query element.
    pub fn next_template_query_id(&mut self) -> usize {
        let id = self.tmpl_qry_cnt;
        self.tmpl_qry_cnt += 1;
        id
    }

    fn scan_hex(&mut self, digits: usize) -> Result<u32, String> {
        let mut result = 0u32;
        for _ in 0..digits {
            match self.next() {
                Some(c) if c.is_ascii_hexdigit() => {
                    result = result * 16 + c.to_digit(16).unwrap_or(0);
                }
                _ => return Err("unexpected char/len of unicode hex value".to_string()),
            }
        }
        Ok(result)
    }

    /// Parses an integer with an optional `+`/`-` sign. Values outside the
    /// 32-bit range are rejected.
    pub fn parse_integer(&mut self) -> Result<i32, String> {
        match self.peek_skipping_ws() {
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => {
                self.next();
            }
            other => {
                return Err(format!(
                    "unexpected char {:?} in number",
                    other.map(String::from).unwrap_or_else(|| "EOF".to_string())
                ))
            }
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.next();
            } else {
                break;
            }
        }
        let s = self.consume();
        s.parse::<i32>()
            .map_err(|e| format!("invalid integer '{}' - {}", s, e))
    }

    /// Parses a quoted string delimited by `'` or `"` (the cursor must be on
    /// the opening quote) and unescapes it. Both quote forms honor the same
    /// escapes: `\\`, `\/`, `\'`, `\"`, `\b`, `\f`, `\n`, `\r`, `\t`,
    /// `\uXXXX` and `\U` with eight hex digits. A literal newline inside the
    /// string is rejected.
    pub fn parse_quoted(&mut self) -> Result<String, String> {
        let quote = match self.next() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err("expected single or double quotes".to_string()),
        };
        let mut result = String::new();
        loop {
            match self.next() {
                None => return Err("unterminated quoted string".to_string()),
                Some(c) if c == quote => break,
                Some('\n') => return Err("newline not supported in quoted strings".to_string()),
                Some('\\') => match self.next() {
                    None => return Err("unterminated quoted string".to_string()),
                    Some('\n') => {
                        return Err("escaping of newline not supported in quoted strings".to_string())
                    }
                    Some('\\') => result.push('\\'),
                    Some('/') => result.push('/'),
                    Some('\'') => result.push('\''),
                    Some('"') => result.push('"'),
                    Some('b') => result.push('\u{0008}'),
                    Some('f') => result.push('\u{000C}'),
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('u') => {
                        let cp = self.scan_hex(4)?;
                        result.push(
                            char::from_u32(cp).ok_or("invalid unicode escape".to_string())?,
                        );
                    }
                    Some('U') => {
                        let cp = self.scan_hex(8)?;
                        result.push(
                            char::from_u32(cp).ok_or("invalid unicode escape".to_string())?,
                        );
                    }
                    Some(c) => {
                        return Err(format!("unexpected escaping of char: {:?}", c));
                    }
                },
                Some(c) => result.push(c),
            }
        }
        self.consume();
        Ok(result)
    }

    /// Asserts `left`, runs `inner`, asserts `right`. With `trim_ws` the
    /// whitespace adjacent to the delimiters is discarded.
    pub fn unwrap_delimited<T>(
        &mut self,
        parser_name: &str,
        left: char,
        right: char,
        trim_ws: bool,
        inner: impl FnOnce(&mut Cursor<'a>) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.consume_next() != Some(left) {
            return Err(SyntaxError::new(
                parser_name,
                format!("expected left delimiter '{}'", left),
                self.input,
                self.pos,
            ));
        }
        if trim_ws {
            self.peek_skipping_ws();
        }
        let content = inner(self)?;
        let r = if trim_ws {
            self.next_skipping_ws()
        } else {
            self.next()
        };
        if r != Some(right) {
            return Err(SyntaxError::new(
                parser_name,
                format!("expected right delimiter '{}'", right),
                self.input,
                self.pos,
            ));
        }
        self.consume();
        Ok(content)
    }
}

#[test]
fn test_peek_next_consume() {
    let mut c = Cursor::new("ab c");
    assert_eq!(c.peek(), Some('a'));
    assert_eq!(c.next(), Some('a'));
    assert_eq!(c.next(), Some('b'));
    assert_eq!(c.consume(), "ab");
    assert_eq!(c.next_skipping_ws(), Some('c'));
    assert_eq!(c.next(), None);
}

#[test]
fn test_parse_integer() {
    assert_eq!(Cursor::new("42").parse_integer(), Ok(42));
    assert_eq!(Cursor::new("  -7 ").parse_integer(), Ok(-7));
    assert_eq!(Cursor::new("+3").parse_integer(), Ok(3));
    assert!(Cursor::new("99999999999").parse_integer().is_err());
    assert!(Cursor::new("x").parse_integer().is_err());
}

#[test]
fn test_parse_quoted() {
    assert_eq!(Cursor::new("'abc'").parse_quoted(), Ok("abc".to_string()));
    assert_eq!(Cursor::new(r#""a\tb""#).parse_quoted(), Ok("a\tb".to_string()));
    assert_eq!(Cursor::new(r#""K is K""#).parse_quoted(), Ok("K is K".to_string()));
    assert_eq!(Cursor::new(r"'\''").parse_quoted(), Ok("'".to_string()));
    assert_eq!(Cursor::new(r"'\\'").parse_quoted(), Ok("\\".to_string()));
    assert!(Cursor::new("'abc").parse_quoted().is_err());
    assert!(Cursor::new("'a\nb'").parse_quoted().is_err());
    assert!(Cursor::new(r"'\q'").parse_quoted().is_err());
}

#[test]
fn test_unwrap_delimited() {
    let mut c = Cursor::new("[ abc ]");
    let inner = c
        .unwrap_delimited("test", '[', ']', true, |c| {
            let mut s = String::new();
            while let Some(ch) = c.peek() {
                if !ch.is_alphabetic() {
                    break;
                }
                c.next();
                s.push(ch);
            }
            c.consume();
            Ok(s)
        })
        .unwrap();
    assert_eq!(inner, "abc");
    assert_eq!(c.next(), None);
}

#[test]
fn test_look_ahead() {
    let re = regex::Regex::new(r"^\{\s*range").unwrap();
    let c = Cursor::new("{ range .x}");
    assert!(c.look_ahead(&re));
    let c = Cursor::new("{.x}");
    assert!(!c.look_ahead(&re));
}
