//! A JSONPath template engine.
//!
//! A template interleaves literal text, JSONPath queries and `{range}…{end}`
//! blocks. Compiling a template yields an immutable AST which can then be
//! executed against any number of in-memory JSON-like documents, writing the
//! rendered output to a writer.
//!
//! ```
//! use jetpath::{JsonPath, Value};
//!
//! let data: Value = serde_json::json!({"items": [{"name": "a"}, {"name": "b"}]}).into();
//! let jp = JsonPath::compile("demo", "{range .items[*]}{.name} {end}").unwrap();
//! let mut out = Vec::new();
//! jp.execute(&mut out, &data).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "a b ");
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod jsonpath;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod template;
pub mod value;

pub use error::{ExecutionError, SyntaxError};
pub use evaluator::{execute_query, execute_template};
pub use functions::{FunctionRegistry, QueryFunction};
pub use jsonpath::JsonPath;
pub use output::{OutputFormat, ResultFormat};
pub use parser::parse_query;
pub use template::Template;
pub use value::{QueryResult, Record, ResultSet, Singular, Value};
