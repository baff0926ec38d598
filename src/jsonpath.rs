//! Public configuration façade around the parsers and executors.

use std::io::Write;

use crate::error::{ExecutionError, SyntaxError};
use crate::evaluator::execute_template;
use crate::functions::{FunctionRegistry, QueryFunction};
use crate::output::{self, OutputFormat, ResultFormat};
use crate::template::Template;
use crate::value::Value;

/// A named JSONPath template engine.
///
/// Holds a compiled template together with the execution options: missing-key
/// tolerance, output format, float format, registered filter functions and
/// the debug toggle. The compiled template is immutable; one engine may be
/// executed any number of times against different inputs.
///
/// # Examples
///
/// ```
/// use jetpath::{JsonPath, Value};
///
/// let data: Value = serde_json::json!({"kind": "List"}).into();
/// let mut jp = JsonPath::new("kind");
/// jp.parse("{.kind}").unwrap();
/// let mut out = Vec::new();
/// jp.execute(&mut out, &data).unwrap();
/// assert_eq!(out, b"List");
/// ```
pub struct JsonPath {
    name: String,
    template: Option<Template>,
    allow_missing_keys: bool,
    format: ResultFormat,
    functions: FunctionRegistry,
    debug: bool,
}

impl JsonPath {
    /// Creates an engine without a template; call [`parse`](Self::parse)
    /// before executing. Missing keys error by default.
    pub fn new(name: &str) -> Self {
        JsonPath {
            name: name.to_string(),
            template: None,
            allow_missing_keys: false,
            format: ResultFormat::legacy(),
            functions: FunctionRegistry::new(),
            debug: false,
        }
    }

    /// Creates an engine and parses the template in one step. This
    /// convenience constructor tolerates missing keys.
    pub fn compile(name: &str, template: &str) -> Result<Self, SyntaxError> {
        let mut jp = JsonPath::new(name);
        jp.allow_missing_keys = true;
        jp.parse(template)?;
        Ok(jp)
    }

    /// Parses (or re-parses, overwriting) the template.
    pub fn parse(&mut self, template: &str) -> Result<&mut Self, SyntaxError> {
        self.template = Some(Template::parse(&self.name, template)?);
        Ok(self)
    }

    /// Whether a field or map key that cannot be located is an error or
    /// simply yields an empty result.
    pub fn allow_missing_keys(&mut self, allow: bool) -> &mut Self {
        self.allow_missing_keys = allow;
        self
    }

    /// Selects the output format (default: legacy).
    pub fn output_format(&mut self, format: OutputFormat) -> &mut Self {
        self.format.format = format;
        self
    }

    /// Sets the printf-style pattern used to render floats (default `%g`).
    pub fn float_format(&mut self, pattern: &str) -> Result<&mut Self, ExecutionError> {
        if !output::is_valid_float_format(pattern) {
            return Err(ExecutionError::new(
                &self.name,
                format!("illegal float format '{}' - use printf style", pattern),
            ));
        }
        self.format.float_format = pattern.to_string();
        Ok(self)
    }

    /// Registers an additional filter function; duplicate names are
    /// rejected.
    pub fn register_function(
        &mut self,
        name: &str,
        f: QueryFunction,
    ) -> Result<&mut Self, ExecutionError> {
        self.functions.register(name, f)?;
        Ok(self)
    }

    /// Enables tracing of parser and executor steps through `tracing`.
    pub fn enable_debug(&mut self) -> &mut Self {
        self.debug = true;
        self
    }

    /// Executes the compiled template against `data`, writing the rendering
    /// to `wr`.
    pub fn execute<W: Write>(&self, wr: &mut W, data: &Value) -> Result<(), ExecutionError> {
        let template = self.template.as_ref().ok_or_else(|| {
            ExecutionError::new(
                &self.name,
                "is an incomplete JSONPath template - needs to be parsed first",
            )
        })?;
        execute_template(
            wr,
            &self.format,
            template,
            data,
            self.allow_missing_keys,
            &self.functions,
            self.debug,
        )
    }
}
