use super::functions::{CallableSignature, FunctionTable, sanitize_identifier};
use super::index::GraphIndex;
use crate::error::CompileDiagnostic;
use crate::graph::{Node, NodeKind};
use ahash::{AHashMap, AHashSet};

const INDENT: &str = "  ";

/// Which graph a unit compiles: the main program or one function body.
#[derive(Debug, Clone, Copy)]
pub(super) enum Scope<'a> {
    Main,
    Function(&'a CallableSignature<'a>),
}

/// State for compiling one unit. Each unit starts from a clean slate: its own
/// declared-variable set, temporaries, memo and diagnostics.
pub(super) struct UnitCompiler<'a> {
    pub(super) index: GraphIndex<'a>,
    pub(super) functions: &'a FunctionTable<'a>,
    aliases: &'a AHashMap<String, NodeKind>,
    pub(super) scope: Scope<'a>,
    pub(super) instrument: bool,
    declared: AHashSet<String>,
    pub(super) temporaries: AHashMap<(&'a str, &'a str), String>,
    pub(super) memo: AHashMap<(&'a str, &'a str), String>,
    pub(super) reported_cycles: AHashSet<(&'a str, &'a str)>,
    pub(super) depth_reported: bool,
    next_temp: usize,
    lines: Vec<String>,
    pub(super) diagnostics: Vec<CompileDiagnostic>,
}

/// The finished output of one unit.
#[derive(Debug, Default)]
pub(super) struct CompiledUnit {
    pub lines: Vec<String>,
    pub diagnostics: Vec<CompileDiagnostic>,
}

impl<'a> UnitCompiler<'a> {
    pub(super) fn new(
        index: GraphIndex<'a>,
        functions: &'a FunctionTable<'a>,
        aliases: &'a AHashMap<String, NodeKind>,
        scope: Scope<'a>,
        instrument: bool,
    ) -> Self {
        let diagnostics = index.duplicates().to_vec();
        let mut declared = AHashSet::new();
        if let Scope::Function(signature) = scope {
            declared.extend(signature.params.iter().cloned());
        }
        Self {
            index,
            functions,
            aliases,
            scope,
            instrument,
            declared,
            temporaries: AHashMap::new(),
            memo: AHashMap::new(),
            reported_cycles: AHashSet::new(),
            depth_reported: false,
            next_temp: 0,
            lines: Vec::new(),
            diagnostics,
        }
    }

    pub(super) fn finish(self) -> CompiledUnit {
        CompiledUnit {
            lines: self.lines,
            diagnostics: self.diagnostics,
        }
    }

    /// The effective kind of `node`, after applying user kind aliases.
    pub(super) fn kind_of<'n>(&self, node: &'n Node) -> &'n NodeKind
    where
        'a: 'n,
    {
        match &node.kind {
            NodeKind::Unknown(tag) => self.aliases.get(tag).unwrap_or(&node.kind),
            kind => kind,
        }
    }

    /// The first node of `kind`, in declaration order.
    pub(super) fn find_entry(&self, kind: &NodeKind) -> Option<&'a Node> {
        self.index.nodes().find(|node| self.kind_of(node) == kind)
    }

    /// The sanitized variable a node is bound to, or `default` when unset.
    pub(super) fn variable_of(&self, node: &Node, default: &str) -> String {
        sanitize_identifier(node.data.variable().unwrap_or(default))
    }

    pub(super) fn emit(&mut self, line: impl AsRef<str>, indent: usize) {
        self.lines
            .push(format!("{}{}", INDENT.repeat(indent), line.as_ref()));
    }

    /// `let ` the first time `name` is written in this unit, nothing afterwards.
    pub(super) fn declare(&mut self, name: &str) -> &'static str {
        if self.declared.insert(name.to_string()) {
            "let "
        } else {
            ""
        }
    }

    pub(super) fn mark_declared(&mut self, name: &str) {
        self.declared.insert(name.to_string());
    }

    /// Emits the per-node progress notification when instrumenting.
    pub(super) fn enter(&mut self, node: &Node, indent: usize) {
        if self.instrument {
            let line = format!("await __onNode({});", quote(&node.id));
            self.emit(line, indent);
        }
    }

    /// Emits a variable-inspector notification after a write when instrumenting.
    pub(super) fn var_update(&mut self, name: &str, indent: usize) {
        if self.instrument {
            let line = format!("__onVar({}, {name});", quote(name));
            self.emit(line, indent);
        }
    }

    /// Allocates a fresh temporary named `{prefix}_{n}`, skipping names the
    /// graph already binds.
    pub(super) fn fresh_temporary(&mut self, prefix: &str) -> String {
        loop {
            let name = format!("{prefix}_{}", self.next_temp);
            self.next_temp += 1;
            if !self.functions.is_reserved(&name) {
                return name;
            }
        }
    }

    /// Records that `(node, socket)` now reads from `expression`.
    ///
    /// Memoized expressions may have been resolved before this binding existed, so
    /// the memo is dropped.
    pub(super) fn bind_temporary(&mut self, node: &'a str, socket: &'a str, expression: String) {
        self.temporaries.insert((node, socket), expression);
        self.memo.clear();
    }
}

/// Renders `text` as a double-quoted string literal.
pub(super) fn quote(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '"' => literal.push_str("\\\""),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
