use std::fmt;

/// Error produced by the query and template parsers.
///
/// Carries the parser name, the offending input and the byte offset at which
/// parsing stopped; `Display` renders the input with a caret marker under the
/// offending position.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub parser_name: String,
    pub msg: String,
    pub input: String,
    pub pos: usize,
}

impl SyntaxError {
    pub fn new(parser_name: &str, msg: impl Into<String>, input: &str, pos: usize) -> Self {
        SyntaxError {
            parser_name: parser_name.to_string(),
            msg: msg.into(),
            input: input.to_string(),
            pos,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = " ".repeat(self.pos) + "^";
        write!(
            f,
            "parser '{}' - syntax error (at pos {}): {}\n{:?}\n{}",
            self.parser_name, self.pos, self.msg, self.input, marker
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Error produced while executing a compiled query or template.
#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub name: String,
    pub msg: String,
}

impl ExecutionError {
    pub fn new(name: &str, msg: impl Into<String>) -> Self {
        ExecutionError {
            name: name.to_string(),
            msg: msg.into(),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution of '{}' - execution error: {}", self.name, self.msg)
    }
}

impl std::error::Error for ExecutionError {}
