//! Output formatting for query results.
//!
//! Three renderings are supported:
//!
//! - **Legacy** - space-separated values. Scalars are unquoted; structured
//!   values inside the result set are rendered as condensed JSON. A result
//!   set holding a single scalar is written without surrounding brackets.
//! - **CondensedJson** - a single-line JSON array of the results.
//! - **HumanJson** - a pretty rendering of that array with two-space indent.
//!
//! Record field names prefer the field's rename when one is attached.
//! Floats are rendered through a printf-style format pattern (default `%g`).

use std::io::{self, Write};
use std::sync::LazyLock;

use regex::Regex;

use crate::value::{QueryResult, ResultSet, Singular, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty JSON array, two-space indent.
    HumanJson,
    /// Space-separated scalars, condensed JSON for structured values.
    Legacy,
    /// Single-line JSON array.
    CondensedJson,
}

/// A format selection plus the float pattern applied to every float written.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFormat {
    pub format: OutputFormat,
    pub float_format: String,
}

impl ResultFormat {
    pub fn new(format: OutputFormat, float_format: &str) -> Self {
        ResultFormat {
            format,
            float_format: float_format.to_string(),
        }
    }

    /// The backward-compatible default: legacy rendering with `%g` floats.
    pub fn legacy() -> Self {
        ResultFormat::new(OutputFormat::Legacy, "%g")
    }

    fn condensed(&self) -> ResultFormat {
        ResultFormat::new(OutputFormat::CondensedJson, &self.float_format)
    }
}

impl Default for ResultFormat {
    fn default() -> Self {
        ResultFormat::legacy()
    }
}

static FLOAT_FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%(e|E|g|G|(\d*\.\d*)?[fF])$").expect("hardcoded regex"));

/// Validates a printf-style float pattern (`%g`, `%e`, `%.2f`, ...).
pub fn is_valid_float_format(pattern: &str) -> bool {
    FLOAT_FORMAT_RE.is_match(pattern)
}

const INDENT: &str = "  ";

/// Writes a query result in the requested format. `prefix` seeds the
/// line-prefix used by the pretty rendering and is expected to begin with a
/// newline (one is prepended otherwise).
pub fn print_results<W: Write>(
    wr: &mut W,
    result: &QueryResult,
    format: &ResultFormat,
    prefix: &str,
) -> io::Result<()> {
    match result {
        QueryResult::Set(rs) => print_result_set(wr, rs, format, prefix),
        QueryResult::Singular(s) => print_singular(wr, s, format, prefix),
    }
}

pub fn print_result_set<W: Write>(
    wr: &mut W,
    result_set: &ResultSet,
    format: &ResultFormat,
    prefix: &str,
) -> io::Result<()> {
    let prefix = if prefix.starts_with('\n') {
        prefix.to_string()
    } else {
        format!("\n{}", prefix)
    };
    match format.format {
        OutputFormat::Legacy => {
            for (i, elem) in result_set.elems.iter().enumerate() {
                if i > 0 {
                    write!(wr, " ")?;
                }
                print_value(wr, elem, format, &prefix)?;
            }
            Ok(())
        }
        OutputFormat::CondensedJson => {
            write!(wr, "[")?;
            for (i, elem) in result_set.elems.iter().enumerate() {
                if i > 0 {
                    write!(wr, ",")?;
                }
                print_value(wr, elem, format, &prefix)?;
            }
            write!(wr, "]")
        }
        OutputFormat::HumanJson => {
            if result_set.is_empty() {
                return write!(wr, "[]");
            }
            let elem_prefix = format!("{}{}", prefix, INDENT);
            write!(wr, "[")?;
            for (i, elem) in result_set.elems.iter().enumerate() {
                if i > 0 {
                    write!(wr, ",")?;
                }
                write!(wr, "{}", elem_prefix)?;
                print_value(wr, elem, format, &elem_prefix)?;
            }
            write!(wr, "{}]", prefix)
        }
    }
}

pub fn print_singular<W: Write>(
    wr: &mut W,
    value: &Singular,
    format: &ResultFormat,
    prefix: &str,
) -> io::Result<()> {
    match value {
        Singular::Null => write!(wr, "null"),
        Singular::Bool(b) => write!(wr, "{}", b),
        Singular::Int(i) => write!(wr, "{}", i),
        Singular::Uint(u) => write!(wr, "{}", u),
        Singular::Float(v) => write!(wr, "{}", format_float(*v, &format.float_format)),
        Singular::String(s) => print_string(wr, s, format),
        Singular::Node(v) => print_value(wr, v, format, prefix),
    }
}

pub fn print_value<W: Write>(
    wr: &mut W,
    value: &Value,
    format: &ResultFormat,
    prefix: &str,
) -> io::Result<()> {
    match value {
        Value::Null => write!(wr, "null"),
        Value::Bool(b) => write!(wr, "{}", b),
        Value::Int(i) => write!(wr, "{}", i),
        Value::Uint(u) => write!(wr, "{}", u),
        Value::Float(v) => write!(wr, "{}", format_float(*v, &format.float_format)),
        Value::String(s) => print_string(wr, s, format),
        Value::Array(arr) => {
            // structured values inside legacy output render condensed
            let format = nested_format(format);
            print_container(wr, &format, prefix, '[', ']', arr.len(), |wr, i, p| {
                print_value(wr, &arr[i], &format, p)
            })
        }
        Value::Mapping(map) => {
            let format = nested_format(format);
            let entries: Vec<_> = map.iter().collect();
            print_container(wr, &format, prefix, '{', '}', entries.len(), |wr, i, p| {
                let (key, val) = entries[i];
                write!(wr, "\"{}\":", escape_string(key))?;
                print_value(wr, val, &format, p)
            })
        }
        Value::Record(rec) => {
            let format = nested_format(format);
            print_container(wr, &format, prefix, '{', '}', rec.len(), |wr, i, p| {
                let field = &rec.fields()[i];
                write!(wr, "\"{}\":", escape_string(field.output_name()))?;
                print_value(wr, &field.value, &format, p)
            })
        }
    }
}

fn nested_format(format: &ResultFormat) -> ResultFormat {
    if format.format == OutputFormat::Legacy {
        format.condensed()
    } else {
        format.clone()
    }
}

// format is CondensedJson or HumanJson here; Legacy never reaches containers.
fn print_container<W: Write>(
    wr: &mut W,
    format: &ResultFormat,
    prefix: &str,
    open: char,
    close: char,
    len: usize,
    mut print_entry: impl FnMut(&mut W, usize, &str) -> io::Result<()>,
) -> io::Result<()> {
    if len == 0 {
        return write!(wr, "{}{}", open, close);
    }
    match format.format {
        OutputFormat::HumanJson => {
            let entry_prefix = format!("{}{}", prefix, INDENT);
            write!(wr, "{}", open)?;
            for i in 0..len {
                if i > 0 {
                    write!(wr, ",")?;
                }
                write!(wr, "{}", entry_prefix)?;
                print_entry(wr, i, &entry_prefix)?;
            }
            write!(wr, "{}{}", prefix, close)
        }
        _ => {
            write!(wr, "{}", open)?;
            for i in 0..len {
                if i > 0 {
                    write!(wr, ",")?;
                }
                print_entry(wr, i, prefix)?;
            }
            write!(wr, "{}", close)
        }
    }
}

fn print_string<W: Write>(wr: &mut W, s: &str, format: &ResultFormat) -> io::Result<()> {
    let escaped = escape_string(s);
    match format.format {
        OutputFormat::Legacy => write!(wr, "{}", escaped),
        OutputFormat::HumanJson | OutputFormat::CondensedJson => write!(wr, "\"{}\"", escaped),
    }
}

/// Escapes the characters that cannot appear raw inside a JSON string. The
/// surrounding quotes are left to the caller so the legacy format can reuse
/// the escaped body unquoted.
pub fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
            c => vec![c],
        })
        .collect()
}

/// Renders a float through a printf-style pattern: `%e`/`%E` scientific,
/// `%g`/`%G` shortest, `%[width].[precision]f` (or `F`) fixed-point with the
/// printf default of six digits when no precision is given.
pub fn format_float(v: f64, pattern: &str) -> String {
    match pattern {
        "%e" => format!("{:e}", v),
        "%E" => format!("{:E}", v),
        "%g" | "%G" => format!("{}", v),
        _ => {
            let body = pattern.trim_start_matches('%').trim_end_matches(['f', 'F']);
            let (width, precision): (usize, usize) = match body.split_once('.') {
                Some((w, p)) => (w.parse().unwrap_or(0), p.parse().unwrap_or(0)),
                None => (body.parse().unwrap_or(0), 6),
            };
            format!("{:>width$.precision$}", v, width = width, precision = precision)
        }
    }
}
