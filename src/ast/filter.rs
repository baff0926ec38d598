use std::fmt;

use super::query::Query;
use crate::output::escape_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "&&"),
            LogicalOp::Or => write!(f, "||"),
            LogicalOp::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

/// A query embedded in a filter predicate.
///
/// `existence_only` is assigned while the AST is built: true when the query
/// is existence-tested (top level of a filter, operand of a logical
/// operator, or parenthesised in either position), false when its value is
/// compared. The executor uses it to stop traversal on the first hit.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery {
    pub query: Query,
    pub existence_only: bool,
}

/// A filter predicate expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `left && right`, `left || right`, or `!left` (no right operand).
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Option<Box<FilterExpr>>,
    },
    /// Non-associative comparison; operands must evaluate singular.
    Compare {
        op: CompareOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    Query(FilterQuery),
    Function { name: String, args: Vec<FilterExpr> },
    Paren(Box<FilterExpr>),
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    NullLit,
}

impl FilterExpr {
    /// Marks a query operand (also through one paren level) for
    /// existence-only evaluation.
    fn mark_existence_only(&mut self) {
        match self {
            FilterExpr::Query(fq) => fq.existence_only = true,
            FilterExpr::Paren(inner) => {
                if let FilterExpr::Query(fq) = inner.as_mut() {
                    fq.existence_only = true;
                }
            }
            _ => {}
        }
    }

    /// Builds a logical expression. Query operands of a logical operator are
    /// existence-tested, so they are marked for early-exit evaluation.
    pub fn logical(
        mut left: FilterExpr,
        mut right: Option<FilterExpr>,
        op: LogicalOp,
    ) -> FilterExpr {
        left.mark_existence_only();
        if let Some(r) = right.as_mut() {
            r.mark_existence_only();
        }
        FilterExpr::Logical {
            op,
            left: Box::new(left),
            right: right.map(Box::new),
        }
    }

    /// Builds a comparison. Bare query operands must be materialized (their
    /// values are compared), while a parenthesised query operand is an
    /// existence test delivering a singular bool. Chaining comparisons is
    /// rejected.
    pub fn compare(
        mut left: FilterExpr,
        mut right: FilterExpr,
        op: CompareOp,
    ) -> Result<FilterExpr, String> {
        for side in [&mut left, &mut right] {
            match side {
                FilterExpr::Compare { .. } => {
                    return Err("cascading comparisons not allowed".to_string())
                }
                FilterExpr::Logical { .. } => {
                    // comparison binds tighter than logical ops, so the
                    // parser can never hand one over as an operand
                    panic!("internal error - comparison applied to a logical expression")
                }
                FilterExpr::Query(fq) => fq.existence_only = false,
                FilterExpr::Paren(inner) => {
                    if let FilterExpr::Query(fq) = inner.as_mut() {
                        fq.existence_only = true;
                    }
                }
                _ => {}
            }
        }
        Ok(FilterExpr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Wraps an expression in parentheses, eliding the wrapper where it
    /// would be redundant (around atoms and function calls).
    pub fn paren(expr: FilterExpr) -> FilterExpr {
        match expr {
            FilterExpr::Paren(_)
            | FilterExpr::Function { .. }
            | FilterExpr::StringLit(_)
            | FilterExpr::IntLit(_)
            | FilterExpr::FloatLit(_)
            | FilterExpr::BoolLit(_)
            | FilterExpr::NullLit => expr,
            other => FilterExpr::Paren(Box::new(other)),
        }
    }

    /// Builds a function call, unwrapping redundant parens around arguments.
    pub fn function(name: String, args: Vec<FilterExpr>) -> FilterExpr {
        let args = args
            .into_iter()
            .map(|a| match a {
                FilterExpr::Paren(inner) => *inner,
                a => a,
            })
            .collect();
        FilterExpr::Function { name, args }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Logical { op, left, right } => match right {
                None => write!(f, "{}{}", op, left),
                Some(right) => write!(f, "{}{}{}", left, op, right),
            },
            FilterExpr::Compare { op, left, right } => write!(f, "{}{}{}", left, op, right),
            FilterExpr::Query(fq) => write!(f, "{}", fq.query),
            FilterExpr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            FilterExpr::Paren(inner) => write!(f, "({})", inner),
            FilterExpr::StringLit(s) => write!(f, "\"{}\"", escape_string(s)),
            FilterExpr::IntLit(i) => write!(f, "{}", i),
            FilterExpr::FloatLit(v) => write!(f, "{:e}", v),
            FilterExpr::BoolLit(b) => write!(f, "{}", b),
            FilterExpr::NullLit => write!(f, "null"),
        }
    }
}
