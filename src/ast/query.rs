use std::fmt;

use super::filter::FilterExpr;
use crate::output::escape_string;

/// The node a query is anchored at: the document root (`$`) or the current
/// node (`@`) when evaluated inside a filter or range body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdentifier {
    Root,
    Current,
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeIdentifier::Root => write!(f, "$"),
            NodeIdentifier::Current => write!(f, "@"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Applies selectors to direct children only.
    Child,
    /// Applies selectors to the node's children and recurses into every
    /// descendant with the same selectors (`..`).
    Descendant,
}

/// One level of path navigation: a union of selectors applied as child or
/// descendant step. Selector results are concatenated in selector order.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub selectors: Vec<Selector>,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == SegmentKind::Descendant {
            write!(f, "..")?;
        }
        write!(f, "[")?;
        for (i, sel) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", sel)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// All member values of a mapping/record, or all elements of an array.
    Wildcard,
    /// Member with the given key (mapping) or declared field name (record).
    Name(String),
    /// Array element; negative counts from the end.
    Index(i32),
    /// Python-style array slice.
    Slice(ArraySlice),
    /// Members/elements for which the predicate is truthy.
    Filter(FilterExpr),
}

impl Selector {
    /// Builds a filter selector: a redundant outer `Paren` is dropped and a
    /// bare query predicate is marked for existence-only evaluation.
    pub(crate) fn filter(expr: FilterExpr) -> Selector {
        let mut expr = match expr {
            FilterExpr::Paren(inner) => *inner,
            other => other,
        };
        if let FilterExpr::Query(fq) = &mut expr {
            fq.existence_only = true;
        }
        Selector::Filter(expr)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Wildcard => write!(f, "*"),
            Selector::Name(name) => write!(f, "\"{}\"", escape_string(name)),
            Selector::Index(i) => write!(f, "{}", i),
            Selector::Slice(s) => write!(f, "{}", s),
            Selector::Filter(expr) => write!(f, "?{}", expr),
        }
    }
}

/// `start:end:step` with undefined bounds tracked separately; `step`
/// defaults to 1 at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySlice {
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub step: i32,
}

impl fmt::Display for ArraySlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, ":")?;
        if let Some(end) = self.end {
            write!(f, "{}", end)?;
        }
        write!(f, ":{}", self.step)
    }
}

/// A compiled JSONPath query: a node identifier followed by segments.
///
/// The `singular` flag is true iff every segment is a child segment holding
/// exactly one name or index selector - such a query returns at most one
/// node by structure alone, which comparisons rely on.
#[derive(Debug, Clone)]
pub struct Query {
    name: String,
    pub root: NodeIdentifier,
    pub segments: Vec<Segment>,
    singular: bool,
}

impl Query {
    /// Builds a query, computing the singular flag from the segments.
    pub fn new(name: String, root: NodeIdentifier, segments: Vec<Segment>) -> Self {
        let singular = segments.iter().all(|s| {
            s.kind == SegmentKind::Child
                && s.selectors.len() == 1
                && matches!(s.selectors[0], Selector::Name(_) | Selector::Index(_))
        });
        Query {
            name,
            root,
            segments,
            singular,
        }
    }

    /// Diagnostic name (`tmplQry-N`, `filterQry-N`, or caller supplied).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }
}

// The diagnostic name never affects query semantics.
impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.segments == other.segments && self.singular == other.singular
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)?;
        for s in &self.segments {
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}
