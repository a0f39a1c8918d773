use super::unit::{Scope, UnitCompiler, quote};
use crate::error::CompileDiagnostic;
use crate::graph::{Node, NodeKind};
use ahash::AHashSet;
use tracing::trace;

/// Expression substituted for a data dependency that loops back on itself. It
/// evaluates to `undefined`, so the surrounding code stays runnable.
pub const CIRCULAR_MARKER: &str = "undefined /* circular */";

/// Expression substituted for a data input nested deeper than
/// [`MAX_EXPRESSION_DEPTH`].
pub const DEPTH_MARKER: &str = "undefined /* too deep */";

/// Longest chain of data nodes folded into one expression.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

/// The `(node, output socket)` pairs on the current resolution path.
pub(super) type Visiting<'a> = AHashSet<(&'a str, &'a str)>;

impl<'a> UnitCompiler<'a> {
    /// Turns output `socket` of `node_id` into expression text.
    pub(super) fn resolve(
        &mut self,
        node_id: &'a str,
        socket: &'a str,
        visiting: &mut Visiting<'a>,
    ) -> String {
        let key = (node_id, socket);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }
        if !visiting.insert(key) {
            if self.reported_cycles.insert(key) {
                trace!(node = node_id, socket, "circular data dependency");
                self.diagnostics.push(CompileDiagnostic::CircularDependency {
                    node_id: node_id.to_string(),
                    socket_id: socket.to_string(),
                });
            }
            return CIRCULAR_MARKER.to_string();
        }
        if visiting.len() > MAX_EXPRESSION_DEPTH {
            visiting.remove(&key);
            if !self.depth_reported {
                self.depth_reported = true;
                trace!(node = node_id, socket, "data dependency chain too deep");
                self.diagnostics.push(CompileDiagnostic::ExpressionTooDeep {
                    node_id: node_id.to_string(),
                });
            }
            return DEPTH_MARKER.to_string();
        }

        let expression = self.resolve_node(node_id, socket, visiting);
        visiting.remove(&key);

        if !expression.contains(CIRCULAR_MARKER) && !expression.contains(DEPTH_MARKER) {
            self.memo.insert(key, expression.clone());
        }
        expression
    }

    fn resolve_node(
        &mut self,
        node_id: &'a str,
        socket: &'a str,
        visiting: &mut Visiting<'a>,
    ) -> String {
        let Some(node) = self.index.node(node_id) else {
            return "0".to_string();
        };

        let kind = self.kind_of(node);
        if let Some(operator) = kind.binary_operator() {
            let a = self.operand(node, "a", "0", visiting);
            let b = self.operand(node, "b", "0", visiting);
            return format!("({a} {operator} {b})");
        }

        match kind {
            NodeKind::Get => self.variable_of(node, "_var"),
            NodeKind::Concat => {
                let a = self.string_operand(node, "a", visiting);
                let b = self.string_operand(node, "b", visiting);
                format!("({a} + {b})")
            }
            NodeKind::Random => {
                let min = self.operand(node, "min", "0", visiting);
                let max = self.operand(node, "max", "100", visiting);
                format!("(Math.floor(Math.random() * ({max} - {min} + 1)) + {min})")
            }
            NodeKind::Not => {
                let value = self.operand(node, "value", "false", visiting);
                format!("(!{value})")
            }
            NodeKind::Set if socket == "out-value" => self.variable_of(node, "_var"),
            NodeKind::Input if socket == "out-value" => self.variable_of(node, "_input"),
            NodeKind::For if socket == "i" => self.variable_of(node, "i"),
            NodeKind::ArrayLength => format!("{}.length", self.variable_of(node, "_arr")),
            NodeKind::ArrayGet => {
                let array = self.variable_of(node, "_arr");
                let index = self.operand(node, "index", "0", visiting);
                format!("{array}[{index}]")
            }
            // Bound by the emitter at the pop or call statement.
            NodeKind::ArrayPop | NodeKind::CallFunction => self
                .temporaries
                .get(&(node_id, socket))
                .cloned()
                .unwrap_or_else(|| "undefined".to_string()),
            NodeKind::FunctionEntry => match self.scope {
                Scope::Function(signature) => signature
                    .param_name(socket)
                    .map(str::to_string)
                    .unwrap_or_else(|| "undefined".to_string()),
                Scope::Main => "undefined".to_string(),
            },
            _ => "0".to_string(),
        }
    }

    /// Resolves input `socket` of `node`: the connected producer, else the inline
    /// literal, else `fallback`.
    pub(super) fn operand(
        &mut self,
        node: &'a Node,
        socket: &str,
        fallback: &str,
        visiting: &mut Visiting<'a>,
    ) -> String {
        if let Some(source) = self.index.source(&node.id, socket) {
            return self.resolve(source.node, source.socket, visiting);
        }
        node.data
            .inline_value(socket)
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Like [`Self::operand`], but an inline literal is quoted as a string and the
    /// fallback is the empty string.
    fn string_operand(&mut self, node: &'a Node, socket: &str, visiting: &mut Visiting<'a>) -> String {
        if let Some(source) = self.index.source(&node.id, socket) {
            return self.resolve(source.node, source.socket, visiting);
        }
        node.data
            .inline_value(socket)
            .map(quote)
            .unwrap_or_else(|| "\"\"".to_string())
    }

    /// Resolves an input read by a statement, starting a fresh resolution path.
    pub(super) fn input(&mut self, node: &'a Node, socket: &str, fallback: &str) -> String {
        let mut visiting = Visiting::new();
        self.operand(node, socket, fallback, &mut visiting)
    }
}
