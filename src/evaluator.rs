//! Tree-walking executors for compiled queries and templates.
//!
//! The query executor walks the input tree under a [`Query`] AST, producing
//! a [`ResultSet`] of borrowed node references. It never allocates new tree
//! values and never mutates the input. The template executor iterates the
//! template elements, delegating queries to the query executor and range
//! blocks to itself over the result set.

use std::io::Write;

use tracing::debug;

use crate::ast::{
    ArraySlice, CompareOp, FilterExpr, FilterQuery, LogicalOp, NodeIdentifier, Query, Segment,
    SegmentKind, Selector, TemplateElement,
};
use crate::error::ExecutionError;
use crate::functions::FunctionRegistry;
use crate::output::{self, OutputFormat, ResultFormat};
use crate::template::Template;
use crate::value::{QueryResult, ResultSet, Singular, Value};

/// Per-invocation executor state. Copies are cheap: everything is a borrow
/// or a flag.
#[derive(Clone, Copy)]
struct QryCtx<'a, 'q> {
    name: &'q str,
    data_root: &'a Value,
    existence_only: bool,
    allow_missing_keys: bool,
    remaining_segments: &'q [Segment],
    functions: &'q FunctionRegistry,
    debug: bool,
    cur_segment: Option<&'q Segment>,
    cur_selector: Option<&'q Selector>,
}

impl<'a, 'q> QryCtx<'a, 'q> {
    /// Missing keys are always tolerated while a descendant segment is
    /// active: descendant walking would otherwise fail on any sibling node
    /// that happens to lack the key.
    fn missing_keys_allowed(&self) -> bool {
        self.allow_missing_keys
            || self
                .cur_segment
                .map_or(false, |s| s.kind != SegmentKind::Child)
    }

    fn is_descending(&self) -> bool {
        self.cur_segment
            .map_or(false, |s| s.kind == SegmentKind::Descendant)
    }

    fn without_first_segment(self) -> Self {
        QryCtx {
            remaining_segments: &self.remaining_segments[1..],
            ..self
        }
    }

    fn err(&self, msg: impl Into<String>) -> ExecutionError {
        ExecutionError::new(self.name, msg)
    }
}

/// Executes a query against `root`, with `current` as the node `@` refers
/// to. With `existence_only` the executor may return as soon as any result
/// is found.
pub fn execute_query<'a>(
    query: &Query,
    root: &'a Value,
    current: &'a Value,
    existence_only: bool,
    allow_missing_keys: bool,
    functions: &FunctionRegistry,
    debug_msgs: bool,
) -> Result<ResultSet<'a>, ExecutionError> {
    let query_root = match query.root {
        NodeIdentifier::Root => root,
        NodeIdentifier::Current => current,
    };
    let ctx = QryCtx {
        name: query.name(),
        data_root: root,
        existence_only,
        allow_missing_keys,
        remaining_segments: &query.segments,
        functions,
        debug: debug_msgs,
        cur_segment: None,
        cur_selector: None,
    };
    if ctx.debug {
        debug!(query = %query, "entering query");
    }
    let results = find_results(ctx, query_root)?;
    if ctx.debug {
        debug!(query = %query, results = results.len(), existence_only, "query finished");
    }
    Ok(results)
}

fn find_results<'a>(
    mut ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
) -> Result<ResultSet<'a>, ExecutionError> {
    // end of segments: the current node IS a result
    if ctx.remaining_segments.is_empty() {
        return Ok(ResultSet::single(cur_node));
    }
    if cur_node.is_null() {
        // no further segment can match anything
        return Ok(ResultSet::new());
    }

    let segment = &ctx.remaining_segments[0];
    ctx.cur_segment = Some(segment);
    let mut results = Vec::new();
    for selector in &segment.selectors {
        ctx.cur_selector = Some(selector);
        let node_results = select_children(ctx.without_first_segment(), cur_node)?;
        if !node_results.is_empty() {
            if ctx.existence_only {
                return Ok(node_results);
            }
            results.extend(node_results.elems);
        }
    }
    Ok(ResultSet { elems: results })
}

/// Applies the current selector to the children of `cur_node`, running the
/// remaining segments on everything it selects.
fn select_children<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
) -> Result<ResultSet<'a>, ExecutionError> {
    if cur_node.is_null() {
        return Ok(ResultSet::new());
    }
    match ctx.cur_selector {
        Some(Selector::Wildcard) => {
            walk_children(ctx, cur_node, false, &mut |_, _, _, _| Ok(true))
        }
        Some(Selector::Name(sel_name)) => select_by_name(ctx, cur_node, sel_name),
        Some(Selector::Index(index)) => select_by_index(ctx, cur_node, *index),
        Some(Selector::Slice(slice)) => select_by_slice(ctx, cur_node, slice),
        Some(Selector::Filter(expr)) => select_by_filter(ctx, cur_node, expr),
        None => unreachable!("selector not set while selecting children"),
    }
}

fn select_by_name<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    sel_name: &str,
) -> Result<ResultSet<'a>, ExecutionError> {
    if !ctx.missing_keys_allowed() {
        match cur_node {
            Value::Mapping(_) | Value::Record(_) => {}
            Value::Null => {
                return Err(ctx.err(format!("missing key (value is null): {}", sel_name)))
            }
            other => {
                return Err(ctx.err(format!(
                    "missing key (object not of named-values type - kind: {}): {}",
                    other.kind_name(),
                    sel_name
                )))
            }
        }
    }
    let mut missing_key = true;
    let results = walk_children(ctx, cur_node, false, &mut |parent, _, key, _| {
        match parent {
            Value::Mapping(_) | Value::Record(_) => {
                let selected = key == Some(sel_name);
                missing_key = missing_key && !selected;
                Ok(selected)
            }
            _ => Ok(false),
        }
    })?;
    if !ctx.missing_keys_allowed() && missing_key {
        return Err(ctx.err(format!("missing key (key does not exist): {}", sel_name)));
    }
    Ok(results)
}

fn select_by_index<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    index: i32,
) -> Result<ResultSet<'a>, ExecutionError> {
    let sel_index = match cur_node {
        Value::Array(arr) => {
            let len = arr.len() as i64;
            let idx = if index < 0 {
                len + index as i64
            } else {
                index as i64
            };
            if !ctx.missing_keys_allowed() && (idx < 0 || idx >= len) {
                return Err(ctx.err(format!(
                    "missing key: index-selector out of bounds. index: {}",
                    idx
                )));
            }
            idx
        }
        _ => {
            if !ctx.missing_keys_allowed() {
                return Err(ctx.err(format!(
                    "missing key: index-selector on non-array object. kind: {}",
                    cur_node.kind_name()
                )));
            }
            // walk anyway so a descendant segment keeps descending
            i64::MIN
        }
    };
    walk_children(ctx, cur_node, false, &mut |parent, _, _, i| {
        Ok(matches!(parent, Value::Array(_)) && i as i64 == sel_index)
    })
}

fn select_by_slice<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    slice: &ArraySlice,
) -> Result<ResultSet<'a>, ExecutionError> {
    let arr = match cur_node {
        Value::Array(arr) => arr,
        _ => {
            if !ctx.missing_keys_allowed() {
                return Err(ctx.err(format!(
                    "missing key: slice-selector on non-array object: {}",
                    slice
                )));
            }
            // not selectable, but a descendant segment keeps descending
            return walk_children(ctx, cur_node, false, &mut |_, _, _, _| Ok(false));
        }
    };

    let len = arr.len() as i64;
    let step = slice.step as i64;
    if step == 0 {
        // defined to select nothing
        return Ok(ResultSet::new());
    }

    let (mut start, mut end) = if step < 0 {
        ((len - 1).max(0), -1)
    } else {
        (0, len)
    };
    if let Some(s) = slice.start {
        let s = s as i64;
        start = if s < 0 { (len + s).max(0) } else { s };
    }
    if let Some(e) = slice.end {
        let e = e as i64;
        end = if e < 0 { len + e } else { e };
    }

    if ctx.debug && (step > 0 && end < start || step < 0 && end > start) {
        debug!(%slice, start, end, step, len, "slice selects nothing");
    }

    let mut next = start;
    walk_children(ctx, cur_node, step < 0, &mut |_, _, _, i| {
        let i = i as i64;
        if i == next && (step > 0 && next < end || step < 0 && next > end) {
            next += step;
            Ok(true)
        } else {
            Ok(false)
        }
    })
}

fn select_by_filter<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    expr: &FilterExpr,
) -> Result<ResultSet<'a>, ExecutionError> {
    walk_children(ctx, cur_node, false, &mut |_, child, _, _| {
        Ok(eval_bool_expr(ctx, child, expr)?.unwrap_or(false))
    })
}

/// Visits every child of `cur_node` in input order (reversed for negative
/// slice steps), feeding selected children into [`do_with_selected`] and the
/// rest into [`do_with_not_selected`], which keeps descendant segments
/// descending past non-matching nodes.
fn walk_children<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    reverse_order: bool,
    select: &mut dyn FnMut(&'a Value, &'a Value, Option<&'a str>, usize) -> Result<bool, ExecutionError>,
) -> Result<ResultSet<'a>, ExecutionError> {
    let mut results: Vec<&'a Value> = Vec::new();

    let mut visit = |results: &mut Vec<&'a Value>,
                     child: &'a Value,
                     key: Option<&'a str>,
                     index: usize|
     -> Result<bool, ExecutionError> {
        let selected = select(cur_node, child, key, index)?;
        let child_results = if selected {
            do_with_selected(ctx, child)?
        } else {
            do_with_not_selected(ctx, child)?
        };
        results.extend(child_results.elems);
        Ok(ctx.existence_only && !results.is_empty())
    };

    match cur_node {
        Value::Record(rec) => {
            for (i, field) in rec.fields().iter().enumerate() {
                if visit(&mut results, &field.value, Some(field.name.as_str()), i)? {
                    break;
                }
            }
        }
        Value::Mapping(map) => {
            for (key, child) in map {
                if visit(&mut results, child, Some(key.as_str()), 0)? {
                    break;
                }
            }
        }
        Value::Array(arr) => {
            if reverse_order {
                for i in (0..arr.len()).rev() {
                    if visit(&mut results, &arr[i], None, i)? {
                        break;
                    }
                }
            } else {
                for (i, child) in arr.iter().enumerate() {
                    if visit(&mut results, child, None, i)? {
                        break;
                    }
                }
            }
        }
        // leaves have no children to traverse
        _ => {}
    }
    Ok(ResultSet { elems: results })
}

/// Runs the remaining segments on a selected node. Under a descendant
/// segment the same selector is additionally re-run on the node's children,
/// implementing the descent; the two result paths concatenate in that order.
fn do_with_selected<'a>(
    ctx: QryCtx<'a, '_>,
    selected: &'a Value,
) -> Result<ResultSet<'a>, ExecutionError> {
    let mut results = Vec::new();
    if ctx.remaining_segments.is_empty() {
        if ctx.debug {
            debug!("found a result - selected child and no segments left");
        }
        if ctx.existence_only {
            return Ok(ResultSet::single(selected));
        }
        results.push(selected);
    } else {
        if selected.is_null() {
            return Ok(ResultSet::new());
        }
        let child_results = find_results(ctx, selected)?;
        if !child_results.is_empty() {
            if ctx.existence_only {
                return Ok(child_results);
            }
            results.extend(child_results.elems);
        }
    }

    if !selected.is_null() && ctx.is_descending() && selected.has_children() {
        let descendant_results = select_children(ctx, selected)?;
        if !descendant_results.is_empty() {
            if ctx.existence_only {
                return Ok(descendant_results);
            }
            results.extend(descendant_results.elems);
        }
    }
    Ok(ResultSet { elems: results })
}

/// Within a descendant segment, keeps descending the same selector into the
/// children of a node that was not itself selected. This is what makes
/// `..x` reach arbitrarily deep.
fn do_with_not_selected<'a>(
    ctx: QryCtx<'a, '_>,
    not_selected: &'a Value,
) -> Result<ResultSet<'a>, ExecutionError> {
    if not_selected.is_null() {
        return Ok(ResultSet::new());
    }
    if ctx.is_descending() && not_selected.has_children() {
        return select_children(ctx, not_selected);
    }
    Ok(ResultSet::new())
}

// ---------------------------------------------------------------------------
// filter expression evaluation

/// Evaluates a filter expression with `cur_node` as the current node.
/// `None` models an undefined result (e.g. from a builtin applied to a value
/// it is not defined for); it degrades to false/empty rather than erroring.
fn eval_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    expr: &FilterExpr,
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    match expr {
        FilterExpr::Logical { op, left, right } => {
            let b = eval_logical_expr(ctx, cur_node, *op, left, right.as_deref())?;
            Ok(Some(QueryResult::Singular(Singular::Bool(b))))
        }
        FilterExpr::Compare { op, left, right } => {
            let b = eval_compare_expr(ctx, cur_node, *op, left, right)?;
            Ok(Some(QueryResult::Singular(Singular::Bool(b))))
        }
        FilterExpr::Query(fq) => {
            let rs = eval_filter_query(ctx, cur_node, fq)?;
            Ok(Some(QueryResult::Set(rs)))
        }
        FilterExpr::Function { name, args } => eval_function_expr(ctx, cur_node, name, args),
        FilterExpr::Paren(inner) => eval_expr(ctx, cur_node, inner),
        FilterExpr::StringLit(s) => Ok(Some(QueryResult::Singular(Singular::String(s.clone())))),
        FilterExpr::IntLit(i) => Ok(Some(QueryResult::Singular(Singular::Int(*i)))),
        FilterExpr::FloatLit(v) => Ok(Some(QueryResult::Singular(Singular::Float(*v)))),
        FilterExpr::BoolLit(b) => Ok(Some(QueryResult::Singular(Singular::Bool(*b)))),
        FilterExpr::NullLit => Ok(Some(QueryResult::Singular(Singular::Null))),
    }
}

/// Boolean coercion: a result set is truthy iff non-empty; a singular must
/// be a bool. An undefined result coerces to `None` (treated as false).
fn eval_bool_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    expr: &FilterExpr,
) -> Result<Option<bool>, ExecutionError> {
    match eval_expr(ctx, cur_node, expr)? {
        None => Ok(None),
        Some(QueryResult::Set(rs)) => Ok(Some(!rs.is_empty())),
        Some(QueryResult::Singular(Singular::Bool(b))) => Ok(Some(b)),
        Some(QueryResult::Singular(s)) => Err(ctx.err(format!(
            "invalid result type to be used within logical expression: {:?}",
            s
        ))),
    }
}

fn eval_logical_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    op: LogicalOp,
    left: &FilterExpr,
    right: Option<&FilterExpr>,
) -> Result<bool, ExecutionError> {
    let left_val = eval_bool_expr(ctx, cur_node, left)?.unwrap_or(false);
    match op {
        LogicalOp::Not => Ok(!left_val),
        LogicalOp::And if !left_val => Ok(false),
        LogicalOp::Or if left_val => Ok(true),
        _ => {
            let right = right.expect("binary logical operator without right operand");
            Ok(eval_bool_expr(ctx, cur_node, right)?.unwrap_or(false))
        }
    }
}

/// Reduces an expression to a single value for comparison. An empty result
/// set reduces to `None` ("missing"); more than one element is an error.
fn eval_singular_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    expr: &FilterExpr,
) -> Result<Option<Singular<'a>>, ExecutionError> {
    match eval_expr(ctx, cur_node, expr)? {
        None => Ok(None),
        Some(QueryResult::Set(rs)) => {
            if rs.len() > 1 {
                return Err(ctx.err(format!(
                    "resultSet with multiple elements presented to comparison-expression: {}",
                    expr
                )));
            }
            match rs.elems.first() {
                None => Ok(None),
                Some(node) => Ok(Some(Singular::of_node(node))),
            }
        }
        Some(QueryResult::Singular(s)) => Ok(Some(s)),
    }
}

fn eval_compare_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    op: CompareOp,
    left: &FilterExpr,
    right: &FilterExpr,
) -> Result<bool, ExecutionError> {
    let l = eval_singular_expr(ctx, cur_node, left)?;
    let r = eval_singular_expr(ctx, cur_node, right)?;
    Ok(compare_values(l.as_ref(), r.as_ref(), op))
}

fn eval_function_expr<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    name: &str,
    args: &[FilterExpr],
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    let function = ctx
        .functions
        .get(name)
        .ok_or_else(|| ctx.err(format!("fct '{}' does not exist", name)))?;
    let mut arg_results = Vec::with_capacity(args.len());
    for arg in args {
        arg_results.push(eval_expr(ctx, cur_node, arg)?);
    }
    function(&arg_results)
}

/// Executes a filter sub-query. Relative sub-queries inherit the descendant
/// segment's missing-key tolerance: they always encounter nodes lacking the
/// queried fields.
fn eval_filter_query<'a>(
    ctx: QryCtx<'a, '_>,
    cur_node: &'a Value,
    fq: &FilterQuery,
) -> Result<ResultSet<'a>, ExecutionError> {
    let mut allow_missing_keys = ctx.allow_missing_keys;
    if !allow_missing_keys && fq.query.root == NodeIdentifier::Current {
        allow_missing_keys = ctx.missing_keys_allowed();
    }
    execute_query(
        &fq.query,
        ctx.data_root,
        cur_node,
        fq.existence_only,
        allow_missing_keys,
        ctx.functions,
        ctx.debug,
    )
}

// ---------------------------------------------------------------------------
// comparison matrix

/// Compares two reduced operands. `None` is "missing" (an empty result set),
/// distinct from JSON null: `==` holds only when both sides sit at the same
/// level, `!=` when exactly one side is missing or null, and the ordering
/// operators never hold for missing/null operands.
pub(crate) fn compare_values(l: Option<&Singular>, r: Option<&Singular>, op: CompareOp) -> bool {
    match (l, r) {
        (None, None) => matches!(op, CompareOp::Eq),
        (None, Some(_)) | (Some(_), None) => matches!(op, CompareOp::Ne),
        (Some(l), Some(r)) => match (l.is_null(), r.is_null()) {
            (true, true) => matches!(op, CompareOp::Eq),
            (true, false) | (false, true) => matches!(op, CompareOp::Ne),
            (false, false) => compare_non_null(l, r, op),
        },
    }
}

fn compare_non_null(l: &Singular, r: &Singular, op: CompareOp) -> bool {
    match l {
        Singular::Bool(b) => compare_bool_to(*b, r, op),
        Singular::Int(i) => compare_int_to(*i, r, op),
        Singular::Uint(u) => compare_uint_to(*u, r, op),
        Singular::Float(f) => compare_float_to(*f, r, op),
        Singular::String(s) => compare_string_to(s, r, op),
        Singular::Node(n) => match n {
            Value::Array(_) => compare_array_to(n, r, op),
            Value::Mapping(_) | Value::Record(_) => compare_named_to(n, r, op),
            _ => unreachable!("leaf wrapped as node singular"),
        },
        Singular::Null => unreachable!("null handled by compare_values"),
    }
}

fn compare_ord<T: PartialOrd>(l: T, r: T, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => l == r,
        CompareOp::Ne => l != r,
        CompareOp::Lt => l < r,
        CompareOp::Le => l <= r,
        CompareOp::Gt => l > r,
        CompareOp::Ge => l >= r,
    }
}

fn compare_eq_only(equal: bool, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        // ordering is not defined for these operands
        _ => false,
    }
}

fn compare_bool_to(l: bool, r: &Singular, op: CompareOp) -> bool {
    match r {
        Singular::Bool(rb) => compare_eq_only(l == *rb, op),
        Singular::String(s) => match s.parse::<bool>() {
            Ok(rb) => compare_eq_only(l == rb, op),
            Err(_) => false,
        },
        _ => false,
    }
}

fn compare_int_to(l: i64, r: &Singular, op: CompareOp) -> bool {
    match r {
        Singular::Int(ri) => compare_ord(l, *ri, op),
        Singular::Uint(ru) => {
            if l < 0 {
                // a negative int is always below any uint
                match op {
                    CompareOp::Eq => false,
                    CompareOp::Ne => true,
                    CompareOp::Lt | CompareOp::Le => true,
                    CompareOp::Gt | CompareOp::Ge => false,
                }
            } else {
                compare_ord(l as u64, *ru, op)
            }
        }
        Singular::Float(rf) => compare_ord(l as f64, *rf, op),
        Singular::String(s) => match s.parse::<i64>() {
            Ok(ri) => compare_ord(l, ri, op),
            Err(_) => false,
        },
        _ => false,
    }
}

fn compare_uint_to(l: u64, r: &Singular, op: CompareOp) -> bool {
    match r {
        Singular::Int(ri) => {
            if *ri < 0 {
                match op {
                    CompareOp::Eq => false,
                    CompareOp::Ne => true,
                    CompareOp::Lt | CompareOp::Le => false,
                    CompareOp::Gt | CompareOp::Ge => true,
                }
            } else {
                compare_ord(l, *ri as u64, op)
            }
        }
        Singular::Uint(ru) => compare_ord(l, *ru, op),
        Singular::Float(rf) => compare_ord(l as f64, *rf, op),
        Singular::String(s) => match s.parse::<u64>() {
            Ok(ru) => compare_ord(l, ru, op),
            Err(_) => false,
        },
        _ => false,
    }
}

fn compare_float_to(l: f64, r: &Singular, op: CompareOp) -> bool {
    match r {
        Singular::Int(ri) => compare_ord(l, *ri as f64, op),
        Singular::Uint(ru) => compare_ord(l, *ru as f64, op),
        Singular::Float(rf) => compare_ord(l, *rf, op),
        Singular::String(s) => match s.parse::<f64>() {
            Ok(rf) => compare_ord(l, rf, op),
            Err(_) => false,
        },
        _ => false,
    }
}

/// A string compared against a number or bool is parsed as that type; a
/// parse failure makes the comparison false, never an error.
fn compare_string_to(l: &str, r: &Singular, op: CompareOp) -> bool {
    match r {
        Singular::String(rs) => compare_ord(l, rs.as_str(), op),
        Singular::Int(ri) => match l.parse::<i64>() {
            Ok(li) => compare_ord(li, *ri, op),
            Err(_) => false,
        },
        Singular::Uint(ru) => match l.parse::<u64>() {
            Ok(lu) => compare_ord(lu, *ru, op),
            Err(_) => false,
        },
        Singular::Float(rf) => match l.parse::<f64>() {
            Ok(lf) => compare_ord(lf, *rf, op),
            Err(_) => false,
        },
        Singular::Bool(rb) => match l.parse::<bool>() {
            Ok(lb) => compare_eq_only(lb == *rb, op),
            Err(_) => false,
        },
        _ => false,
    }
}

fn nodes_equal(l: &Value, r: &Value) -> bool {
    compare_values(
        Some(&Singular::of_node(l)),
        Some(&Singular::of_node(r)),
        CompareOp::Eq,
    )
}

fn compare_array_to(l: &Value, r: &Singular, op: CompareOp) -> bool {
    let (l_arr, r_arr) = match (l, r) {
        (Value::Array(l_arr), Singular::Node(Value::Array(r_arr))) => (l_arr, r_arr),
        _ => return false,
    };
    let equal = l_arr.len() == r_arr.len()
        && l_arr.iter().zip(r_arr.iter()).all(|(a, b)| nodes_equal(a, b));
    compare_eq_only(equal, op)
}

/// Mapping/record equality by matched-name pointwise comparison; a missing
/// field on either side makes them unequal. Mapping vs record is compared by
/// key name.
fn compare_named_to(l: &Value, r: &Singular, op: CompareOp) -> bool {
    let r: &Value = match r {
        Singular::Node(n) if matches!(n, Value::Mapping(_) | Value::Record(_)) => n,
        _ => return false,
    };
    if l.child_count() != r.child_count() {
        return compare_eq_only(false, op);
    }
    let equal = match l {
        Value::Mapping(map) => map.iter().all(|(name, lv)| {
            r.named_child(name)
                .map_or(false, |rv| nodes_equal(lv, rv))
        }),
        Value::Record(rec) => rec.fields().iter().all(|f| {
            r.named_child(&f.name)
                .map_or(false, |rv| nodes_equal(&f.value, rv))
        }),
        _ => unreachable!("named comparison on non-named value"),
    };
    compare_eq_only(equal, op)
}

// ---------------------------------------------------------------------------
// template execution

struct TmplCtx<'a, 'q, W: Write> {
    out: &'q mut W,
    format: &'q ResultFormat,
    root: &'a Value,
    allow_missing_keys: bool,
    functions: &'q FunctionRegistry,
    debug: bool,
    name: &'q str,
}

/// Executes a compiled template against `root`, writing the rendering to
/// `wr`.
pub fn execute_template<W: Write>(
    wr: &mut W,
    format: &ResultFormat,
    template: &Template,
    root: &Value,
    allow_missing_keys: bool,
    functions: &FunctionRegistry,
    debug_msgs: bool,
) -> Result<(), ExecutionError> {
    let mut ctx = TmplCtx {
        out: wr,
        format,
        root,
        allow_missing_keys,
        functions,
        debug: debug_msgs,
        name: template.name(),
    };
    for elem in template.elements() {
        exec_template_elem(&mut ctx, elem, root)?;
    }
    Ok(())
}

fn exec_template_elem<W: Write>(
    ctx: &mut TmplCtx<'_, '_, W>,
    elem: &TemplateElement,
    cur_node: &Value,
) -> Result<(), ExecutionError> {
    match elem {
        TemplateElement::Text(text) => write!(ctx.out, "{}", text)
            .map_err(|e| ExecutionError::new(ctx.name, format!("cannot write to output: {}", e))),
        TemplateElement::Query(query) => {
            let results = execute_query(
                query,
                ctx.root,
                cur_node,
                false,
                ctx.allow_missing_keys,
                ctx.functions,
                ctx.debug,
            )?;
            let prefix = match ctx.format.format {
                OutputFormat::HumanJson => "\n",
                OutputFormat::Legacy | OutputFormat::CondensedJson => "",
            };
            output::print_results(ctx.out, &QueryResult::Set(results), ctx.format, prefix)
                .map_err(|e| ExecutionError::new(ctx.name, format!("cannot write to output: {}", e)))
        }
        TemplateElement::Range { query, body } => {
            let results = execute_query(
                query,
                ctx.root,
                cur_node,
                false,
                ctx.allow_missing_keys,
                ctx.functions,
                ctx.debug,
            )?;
            for elem_node in &results.elems {
                for body_elem in body {
                    exec_template_elem(ctx, body_elem, elem_node)?;
                }
            }
            Ok(())
        }
    }
}
