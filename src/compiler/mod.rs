//! Graph to source compiler.
//!
//! Compilation is split into the usual phases: an index over each graph, an
//! expression resolver for data nodes, a statement emitter that walks control
//! edges, a function table that names every callable, and the assembler in
//! [`Compiler::compile`] that stitches the units together.

use crate::error::CompileDiagnostic;
use crate::graph::{Edge, Graph, Node, NodeKind};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

mod emitter;
mod functions;
mod index;
mod resolver;
mod unit;

pub use functions::{CallableSignature, FunctionTable, binding_names, sanitize_identifier};
pub use index::{DataSource, GraphIndex};
pub use emitter::MAX_NESTING_DEPTH;
pub use resolver::{CIRCULAR_MARKER, DEPTH_MARKER, MAX_EXPRESSION_DEPTH};

use emitter::Visited;
use unit::{CompiledUnit, Scope, UnitCompiler};

/// Code-generation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Inject `__onNode` / `__onVar` notifications for stepping and inspection.
    pub instrument: bool,
}

/// The outcome of a compile. Compilation never fails outright; problems are
/// reported in `errors` next to a best-effort `code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileResult {
    pub code: String,
    pub errors: Vec<String>,
    #[serde(skip)]
    pub diagnostics: Vec<CompileDiagnostic>,
}

impl CompileResult {
    fn from_parts(code: String, diagnostics: Vec<CompileDiagnostic>) -> Self {
        Self {
            code,
            errors: diagnostics.iter().map(ToString::to_string).collect(),
            diagnostics,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Compiles one graph. Holds no state between compiles, so one instance can be
/// reused and several can run concurrently.
#[derive(Debug, Clone)]
pub struct Compiler<'g> {
    graph: &'g Graph,
    options: CompileOptions,
    aliases: AHashMap<String, NodeKind>,
}

pub struct CompilerBuilder<'g> {
    graph: &'g Graph,
    options: CompileOptions,
    aliases: AHashMap<String, NodeKind>,
}

impl<'g> CompilerBuilder<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            options: CompileOptions::default(),
            aliases: AHashMap::new(),
        }
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_instrumentation(mut self, instrument: bool) -> Self {
        self.options.instrument = instrument;
        self
    }

    /// Compiles nodes tagged `tag` as if they were `kind`.
    pub fn with_kind_alias(mut self, tag: &str, kind: NodeKind) -> Self {
        self.aliases.insert(tag.to_string(), kind);
        self
    }

    pub fn build(self) -> Compiler<'g> {
        Compiler {
            graph: self.graph,
            options: self.options,
            aliases: self.aliases,
        }
    }
}

impl<'g> Compiler<'g> {
    pub fn builder(graph: &'g Graph) -> CompilerBuilder<'g> {
        CompilerBuilder::new(graph)
    }

    pub fn new(graph: &'g Graph, options: CompileOptions) -> Self {
        CompilerBuilder::new(graph).with_options(options).build()
    }

    #[instrument(skip_all, fields(nodes = self.graph.nodes.len(), functions = self.graph.functions.len()))]
    pub fn compile(&self) -> CompileResult {
        let table = FunctionTable::new(self.graph);

        let main = self.compile_main(&table);
        let Some(main) = main else {
            info!("graph has no start node");
            return CompileResult::from_parts(
                "// Error: No start node found".to_string(),
                vec![CompileDiagnostic::MissingEntry],
            );
        };

        let mut blocks = Vec::new();
        let mut diagnostics = Vec::new();
        for signature in table.iter() {
            let unit = self.compile_function(&table, signature);
            let header = format!(
                "async function {}({}) {{",
                signature.name,
                signature.params.join(", ")
            );
            let block = std::iter::once(header)
                .chain(unit.lines)
                .chain(std::iter::once("}".to_string()))
                .collect::<Vec<_>>()
                .join("\n");
            blocks.push(block);
            diagnostics.extend(unit.diagnostics);
        }

        if !main.lines.is_empty() || blocks.is_empty() {
            blocks.push(main.lines.join("\n"));
        }
        diagnostics.extend(main.diagnostics);

        let code = blocks.join("\n\n");
        info!(
            lines = code.lines().count(),
            diagnostics = diagnostics.len(),
            "compiled graph"
        );
        CompileResult::from_parts(code, diagnostics)
    }

    fn unit<'a>(
        &'a self,
        table: &'a FunctionTable<'a>,
        nodes: &'a [Node],
        edges: &'a [Edge],
        scope: Scope<'a>,
    ) -> UnitCompiler<'a> {
        UnitCompiler::new(
            GraphIndex::build(nodes, edges),
            table,
            &self.aliases,
            scope,
            self.options.instrument,
        )
    }

    fn compile_main<'a>(&'a self, table: &'a FunctionTable<'a>) -> Option<CompiledUnit> {
        let mut unit = self.unit(table, &self.graph.nodes, &self.graph.edges, Scope::Main);
        let entry = unit.find_entry(&NodeKind::Start)?;
        debug!(entry = %entry.id, "compiling main unit");
        unit.walk(&entry.id, 0, &mut Visited::new());
        Some(unit.finish())
    }

    fn compile_function<'a>(
        &'a self,
        table: &'a FunctionTable<'a>,
        signature: &'a CallableSignature<'a>,
    ) -> CompiledUnit {
        let def = signature.def;
        let mut unit = self.unit(table, &def.nodes, &def.edges, Scope::Function(signature));
        match unit.find_entry(&NodeKind::FunctionEntry) {
            Some(entry) => {
                debug!(function = %def.id, entry = %entry.id, "compiling function unit");
                unit.walk(&entry.id, 1, &mut Visited::new());
            }
            None => {
                unit.diagnostics.push(CompileDiagnostic::MissingFunctionEntry {
                    function: def.name.clone(),
                });
            }
        }
        unit.finish()
    }
}
