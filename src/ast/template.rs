use std::fmt;

use super::query::Query;
use crate::output::escape_string;

/// One element of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateElement {
    /// Literal text, written to the output verbatim.
    Text(String),
    /// An embedded JSONPath query; its result set is formatted and written.
    Query(Query),
    /// `{range Q}body{end}`: the body is executed once per element of the
    /// header query's result set, with that element as the current node.
    Range {
        query: Query,
        body: Vec<TemplateElement>,
    },
}

impl fmt::Display for TemplateElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateElement::Text(text) => write!(f, "{{\"{}\"}}", escape_string(text)),
            TemplateElement::Query(q) => write!(f, "{{{}}}", q),
            TemplateElement::Range { query, body } => {
                write!(f, "{{range {}}}", query)?;
                for elem in body {
                    write!(f, "{}", elem)?;
                }
                write!(f, "{{end}}")
            }
        }
    }
}
