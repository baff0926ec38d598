//! Filter functions callable from query predicates.
//!
//! The registry always contains the builtins `count`, `length`, `match` and
//! `search`; callers may register additional functions by name, duplicate
//! names are rejected.
//!
//! A function receives its evaluated arguments - each either a result set,
//! a singular value, or undefined (`None`) - and returns a result of the
//! same shape. An undefined return degrades to false/empty at the call site
//! rather than erroring.

use std::collections::HashMap;

use regex::Regex;

use crate::error::ExecutionError;
use crate::value::{QueryResult, Singular, Value};

/// A filter function: evaluated argument results in, one result out.
pub type QueryFunction = Box<
    dyn for<'a> Fn(&[Option<QueryResult<'a>>]) -> Result<Option<QueryResult<'a>>, ExecutionError>
        + Send
        + Sync,
>;

/// Named filter functions available during query execution.
pub struct FunctionRegistry {
    functions: HashMap<String, QueryFunction>,
}

impl FunctionRegistry {
    /// A registry holding the builtin functions.
    pub fn new() -> Self {
        let mut functions: HashMap<String, QueryFunction> = HashMap::new();
        functions.insert("count".to_string(), Box::new(count));
        functions.insert("length".to_string(), Box::new(length));
        functions.insert("match".to_string(), Box::new(regex_match));
        functions.insert("search".to_string(), Box::new(regex_search));
        FunctionRegistry { functions }
    }

    /// Registers a function under `name`; a name already taken (including
    /// the builtins) is rejected.
    pub fn register(&mut self, name: &str, f: QueryFunction) -> Result<(), ExecutionError> {
        if self.functions.contains_key(name) {
            return Err(ExecutionError::new(
                "functionRegistry",
                format!("function '{}' already defined", name),
            ));
        }
        self.functions.insert(name.to_string(), f);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&QueryFunction> {
        self.functions.get(name)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        FunctionRegistry::new()
    }
}

/// Extracts a singular string from an argument: a string singular, or a
/// single-element result set holding a string node. Undefined for anything
/// else; more than one element is an error.
fn singular_string(arg: &Option<QueryResult>) -> Result<Option<String>, ExecutionError> {
    match arg {
        None => Ok(None),
        Some(QueryResult::Set(rs)) => {
            if rs.is_empty() {
                return Ok(None);
            }
            if rs.len() > 1 {
                return Err(ExecutionError::new(
                    "fct",
                    "cannot extract singular string from resultSet with multiple results",
                ));
            }
            match rs.elems[0] {
                Value::String(s) => Ok(Some(s.clone())),
                _ => Ok(None),
            }
        }
        Some(QueryResult::Singular(Singular::String(s))) => Ok(Some(s.clone())),
        Some(QueryResult::Singular(Singular::Node(Value::String(s)))) => Ok(Some(s.clone())),
        Some(QueryResult::Singular(_)) => Ok(None),
    }
}

/// `count(arg)`: the element count of a result set as a singular integer.
/// Undefined for any other argument shape.
fn count<'a>(
    args: &[Option<QueryResult<'a>>],
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    if args.len() != 1 {
        return Err(ExecutionError::new(
            "fct",
            "invalid nr of args to function 'count' - requires exactly ONE argument",
        ));
    }
    match &args[0] {
        Some(QueryResult::Set(rs)) => Ok(Some(QueryResult::Singular(Singular::Int(
            rs.len() as i64
        )))),
        _ => Ok(None),
    }
}

fn node_length(v: &Value) -> Option<i64> {
    match v {
        // string length counts bytes
        Value::String(s) => Some(s.len() as i64),
        Value::Array(arr) => Some(arr.len() as i64),
        Value::Mapping(map) => Some(map.len() as i64),
        Value::Record(rec) => Some(rec.len() as i64),
        _ => None,
    }
}

/// `length(arg)`: the length of a singular (or single-result) string, array,
/// mapping or record. Strings count bytes. Undefined for anything else.
fn length<'a>(
    args: &[Option<QueryResult<'a>>],
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    if args.len() != 1 {
        return Err(ExecutionError::new(
            "fct",
            "invalid nr of args to function 'length' - requires exactly ONE argument",
        ));
    }
    let len = match &args[0] {
        None => None,
        Some(QueryResult::Set(rs)) => {
            if rs.is_empty() {
                None
            } else if rs.len() > 1 {
                return Err(ExecutionError::new(
                    "fct",
                    "cannot extract a singular value from a resultSet with multiple results",
                ));
            } else {
                node_length(rs.elems[0])
            }
        }
        Some(QueryResult::Singular(Singular::String(s))) => Some(s.len() as i64),
        Some(QueryResult::Singular(Singular::Node(v))) => node_length(v),
        Some(QueryResult::Singular(_)) => None,
    };
    Ok(len.map(|l| QueryResult::Singular(Singular::Int(l))))
}

fn regex_args(
    fct: &str,
    args: &[Option<QueryResult>],
) -> Result<Option<(String, String)>, ExecutionError> {
    if args.len() != 2 {
        return Err(ExecutionError::new(
            "fct",
            format!(
                "invalid nr of args to function '{}' - requires exactly TWO arguments",
                fct
            ),
        ));
    }
    let target = singular_string(&args[0])?;
    let pattern = singular_string(&args[1])?;
    match (target, pattern) {
        (Some(t), Some(p)) => Ok(Some((t, p))),
        _ => Ok(None),
    }
}

/// `match(s, pattern)`: true iff the pattern matches the entire string (the
/// pattern is anchored with `\A…\z`).
fn regex_match<'a>(
    args: &[Option<QueryResult<'a>>],
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    let (target, pattern) = match regex_args("match", args)? {
        Some(pair) => pair,
        None => return Ok(None),
    };
    let re = Regex::new(&format!(r"\A(?:{})\z", pattern))
        .map_err(|e| ExecutionError::new("fct", format!("invalid regexp: {}", e)))?;
    Ok(Some(QueryResult::Singular(Singular::Bool(
        re.is_match(&target),
    ))))
}

/// `search(s, pattern)`: like `match` but unanchored (substring match).
fn regex_search<'a>(
    args: &[Option<QueryResult<'a>>],
) -> Result<Option<QueryResult<'a>>, ExecutionError> {
    let (target, pattern) = match regex_args("search", args)? {
        Some(pair) => pair,
        None => return Ok(None),
    };
    let re = Regex::new(&pattern)
        .map_err(|e| ExecutionError::new("fct", format!("invalid regexp: {}", e)))?;
    Ok(Some(QueryResult::Singular(Singular::Bool(
        re.is_match(&target),
    ))))
}
