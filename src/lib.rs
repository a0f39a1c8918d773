//! # flowscript - Visual Flow Compiler and Sandboxed Runner
//!
//! **flowscript** turns node-based programs (the kind drawn in a blueprint style
//! editor) into source text of a small JavaScript subset, and runs that text in a
//! sandboxed, steppable async interpreter.
//!
//! ## Core Workflow
//!
//! The compiler is format-agnostic. It operates on a canonical [`graph::Graph`]:
//!
//! 1.  **Load Your Graph**: Read the canonical JSON with [`graph::Graph::from_json`], the editor's
//!     export with [`graph::EditorFlow`], or implement [`graph::IntoGraph`] for your own format.
//! 2.  **Compile**: Use [`compiler::Compiler::builder`] to configure a compiler and call `compile`.
//!     Compiling never fails; anomalies come back as diagnostics next to best-effort code.
//! 3.  **Run**: Hand the code to an [`engine::Executor`] together with an
//!     [`engine::ExecutionCallbacks`] implementation. Output, prompts, node visits and variable
//!     changes arrive as callbacks; stepping can be instant, timed or manual.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowscript::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run_example() -> Result<()> {
//! let mut graph = Graph::default();
//! graph.nodes.push(Node::new("start", NodeKind::Start));
//! graph.nodes.push(Node::new("set", NodeKind::Set).with_variable("x").with_inline("value", "5"));
//! graph.nodes.push(Node::new("get", NodeKind::Get).with_variable("x"));
//! graph.nodes.push(Node::new("out", NodeKind::Output));
//! graph.edges.push(Edge::control("start", "exec-out", "set"));
//! graph.edges.push(Edge::control("set", "exec-out", "out"));
//! graph.edges.push(Edge::data("get", "value", "out", "value"));
//!
//! let result = Compiler::builder(&graph).with_instrumentation(true).build().compile();
//! for error in &result.errors {
//!     eprintln!("warning: {error}");
//! }
//!
//! let recorder = Arc::new(EventRecorder::new());
//! let mut executor = Executor::new();
//! let handle = executor.start(result.code, Arc::clone(&recorder), RunOptions::default())?;
//! let outcome = handle.finished().await;
//!
//! println!("{outcome:?}: {:?}", recorder.logs());
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod graph;
pub mod interpreter;
pub mod parser;
pub mod pins;
pub mod prelude;
