use crate::graph::DataType;
use thiserror::Error;

/// Non-fatal findings reported by the compiler next to the generated code.
///
/// Only [`CompileDiagnostic::MissingEntry`] stops a compile; every other entry
/// describes a spot where the compiler degraded gracefully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileDiagnostic {
    #[error("No start node found")]
    MissingEntry,

    #[error("Function '{function}' has no entry node")]
    MissingFunctionEntry { function: String },

    #[error("Node '{node_id}' calls function '{function_id}', which does not exist")]
    UnknownFunction { node_id: String, function_id: String },

    #[error(
        "Socket '{socket_id}' on node '{node_id}' has more than one incoming data edge; the last one wins"
    )]
    DuplicateDataEdge { node_id: String, socket_id: String },

    #[error("Circular data dependency through socket '{socket_id}' of node '{node_id}'")]
    CircularDependency { node_id: String, socket_id: String },

    #[error("Data inputs of node '{node_id}' are nested too deeply; the rest reads as undefined")]
    ExpressionTooDeep { node_id: String },

    #[error("Control flow after node '{node_id}' is nested too deeply and was left out")]
    NestingTooDeep { node_id: String },
}

/// Errors that can occur when converting a foreign format into a [`crate::graph::Graph`].
#[derive(Error, Debug, Clone)]
pub enum GraphConversionError {
    #[error("Failed to parse graph JSON: {0}")]
    JsonParseError(String),

    #[error("Invalid graph data: {0}")]
    ValidationError(String),
}

/// Errors raised while validating a proposed connection between two sockets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PinError {
    #[error("Socket '{socket_id}' does not exist on the {side} side of the node")]
    UnknownSocket { socket_id: String, side: &'static str },

    #[error("Cannot connect a control socket to a data socket")]
    KindMismatch,

    #[error("Cannot connect a {source_type} output to a {target_type} input")]
    TypeMismatch {
        source_type: DataType,
        target_type: DataType,
    },
}

/// Syntax errors in generated source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected character '{found}' on line {line}")]
    UnexpectedCharacter { found: char, line: usize },

    #[error("Unterminated string literal on line {line}")]
    UnterminatedString { line: usize },

    #[error("Unterminated comment on line {line}")]
    UnterminatedComment { line: usize },

    #[error("Unexpected token '{found}' on line {line}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: String,
        line: usize,
    },

    #[error("Invalid assignment target on line {line}")]
    InvalidAssignmentTarget { line: usize },

    #[error("Program is nested too deeply on line {line}")]
    TooDeeplyNested { line: usize },
}

/// Errors raised while a program runs inside the sandbox.
///
/// The `Display` form mirrors the error names the output language uses, since it
/// is forwarded verbatim to the host as an `error` event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("RangeError: {0}")]
    Range(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),

    /// The host side of the channel went away. The run is being torn down, so
    /// nothing is reported for it.
    #[error("execution context disconnected")]
    Disconnected,
}

impl From<ParseError> for RuntimeError {
    fn from(error: ParseError) -> Self {
        RuntimeError::Syntax(error.to_string())
    }
}

/// Errors raised by the host side of the execution engine.
#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("Executor::start must be called from within a Tokio runtime")]
    NoRuntime,

    #[error("Failed to start the sandbox runtime: {0}")]
    SandboxRuntime(String),
}
