//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and traits from the flowscript crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use flowscript::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/graph.json")?;
//! let graph = Graph::from_json(&json)?;
//!
//! let result = Compiler::new(&graph, CompileOptions::default()).compile();
//! println!("{}", result.code);
//! # Ok(())
//! # }
//! ```

// Graph model and loading
pub use crate::graph::{
    DataType, Edge, EdgeKind, EditorFlow, FunctionDef, FunctionPort, Graph, IntoGraph, Node,
    NodeData, NodeKind,
};

// Pin compatibility
pub use crate::pins::{NodeSockets, Socket, SocketKind, SocketProvider, SocketRole};

// Compilation
pub use crate::compiler::{CompileOptions, CompileResult, Compiler, CompilerBuilder};

// Execution
pub use crate::ast::Value;
pub use crate::engine::{
    EventRecorder, ExecutionCallbacks, Executor, RunEvent, RunHandle, RunOptions, RunOutcome,
    RunState, StepMode,
};

// Error types
pub use crate::error::{
    CompileDiagnostic, ExecutionError, GraphConversionError, ParseError, PinError, RuntimeError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
