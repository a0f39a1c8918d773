use super::unit::{Scope, UnitCompiler, quote};
use crate::error::CompileDiagnostic;
use crate::graph::{Node, NodeKind};
use ahash::AHashSet;
use tracing::warn;

/// Deepest nesting of branch arms and loop bodies the emitter descends into.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Node ids already emitted along the current control path.
pub(super) type Visited<'a> = AHashSet<&'a str>;

impl<'a> UnitCompiler<'a> {
    /// Emits the statements for `node_id` and everything reachable after it.
    ///
    /// Straight-line successors are walked in a loop; only branch arms and loop
    /// bodies recurse, each with its own copy of `visited`. The path after a
    /// loop keeps using the caller's set.
    pub(super) fn walk(&mut self, node_id: &'a str, indent: usize, visited: &mut Visited<'a>) {
        let mut current = Some(node_id);
        while let Some(node_id) = current {
            current = self.statement(node_id, indent, visited);
        }
    }

    /// Emits one node and returns the node that continues the same path.
    fn statement(
        &mut self,
        node_id: &'a str,
        indent: usize,
        visited: &mut Visited<'a>,
    ) -> Option<&'a str> {
        if !visited.insert(node_id) {
            return None;
        }
        let node = self.index.node(node_id)?;

        match self.kind_of(node) {
            NodeKind::Start | NodeKind::FunctionEntry => self.next(node, "exec-out"),
            NodeKind::End => {
                self.enter(node, indent);
                None
            }
            NodeKind::Input => {
                self.enter(node, indent);
                let variable = self.variable_of(node, "_input");
                let message = match self.index.source(&node.id, "prompt") {
                    Some(_) => self.input(node, "prompt", "\"\""),
                    None => quote(node.data.prompt.as_deref().unwrap_or_default()),
                };
                let keyword = self.declare(&variable);
                self.emit(
                    format!("{keyword}{variable} = parseFloat(await prompt({message}));"),
                    indent,
                );
                self.var_update(&variable, indent);
                self.next(node, "exec-out")
            }
            NodeKind::Output => {
                self.enter(node, indent);
                let value = self.input(node, "value", "0");
                self.emit(format!("console.log({value});"), indent);
                self.next(node, "exec-out")
            }
            NodeKind::Set => {
                self.enter(node, indent);
                let variable = self.variable_of(node, "_var");
                let value = self.input(node, "value", "0");
                let keyword = self.declare(&variable);
                self.emit(format!("{keyword}{variable} = {value};"), indent);
                self.var_update(&variable, indent);
                self.next(node, "exec-out")
            }
            NodeKind::If => {
                self.enter(node, indent);
                let condition = self.input(node, "condition", "false");
                self.emit(format!("if ({condition}) {{"), indent);
                self.branch(node, "true", indent + 1, visited);
                self.emit("} else {", indent);
                self.branch(node, "false", indent + 1, visited);
                self.emit("}", indent);
                None
            }
            NodeKind::While => {
                self.enter(node, indent);
                let condition = self.input(node, "condition", "false");
                self.emit(format!("while ({condition}) {{"), indent);
                self.enter(node, indent + 1);
                self.branch(node, "body", indent + 1, visited);
                self.emit("}", indent);
                self.next(node, "done")
            }
            NodeKind::For => {
                self.enter(node, indent);
                let variable = self.variable_of(node, "i");
                let from = self.input(node, "from", "0");
                let to = self.input(node, "to", "10");
                let step = self.input(node, "step", "1");
                self.mark_declared(&variable);
                self.emit(
                    format!(
                        "for (let {variable} = {from}; {variable} < {to}; {variable} += {step}) {{"
                    ),
                    indent,
                );
                self.enter(node, indent + 1);
                self.var_update(&variable, indent + 1);
                self.branch(node, "body", indent + 1, visited);
                self.emit("}", indent);
                self.next(node, "done")
            }
            NodeKind::Break => {
                self.enter(node, indent);
                self.emit("break;", indent);
                None
            }
            NodeKind::Continue => {
                self.enter(node, indent);
                self.emit("continue;", indent);
                None
            }
            NodeKind::ArrayCreate => {
                self.enter(node, indent);
                let array = self.variable_of(node, "_arr");
                let keyword = self.declare(&array);
                self.emit(format!("{keyword}{array} = [];"), indent);
                self.var_update(&array, indent);
                self.next(node, "exec-out")
            }
            NodeKind::ArrayPush => {
                self.enter(node, indent);
                let array = self.variable_of(node, "_arr");
                let value = self.input(node, "value", "0");
                self.emit(format!("{array}.push({value});"), indent);
                self.var_update(&array, indent);
                self.next(node, "exec-out")
            }
            NodeKind::ArrayPop => {
                self.enter(node, indent);
                let array = self.variable_of(node, "_arr");
                let temporary = self.fresh_temporary("__pop");
                self.emit(format!("let {temporary} = {array}.pop();"), indent);
                self.bind_temporary(node_id, "value", temporary);
                self.var_update(&array, indent);
                self.next(node, "exec-out")
            }
            NodeKind::ArraySet => {
                self.enter(node, indent);
                let array = self.variable_of(node, "_arr");
                let index = self.input(node, "index", "0");
                let value = self.input(node, "value", "0");
                self.emit(format!("{array}[{index}] = {value};"), indent);
                self.var_update(&array, indent);
                self.next(node, "exec-out")
            }
            NodeKind::FunctionReturn => {
                self.emit_return(node, indent);
                None
            }
            NodeKind::CallFunction => {
                self.emit_call(node, indent);
                self.next(node, "exec-out")
            }
            // Pure data kinds, comments and unrecognized kinds pass control through.
            _ => self.next(node, "exec-out"),
        }
    }

    /// The node wired to control output `socket`, continuing the current path.
    fn next(&self, node: &Node, socket: &str) -> Option<&'a str> {
        self.index.next(&node.id, socket)
    }

    /// Walks a nested arm with its own copy of the visited set.
    fn branch(&mut self, node: &Node, socket: &str, indent: usize, visited: &Visited<'a>) {
        let Some(next) = self.next(node, socket) else {
            return;
        };
        if indent > MAX_NESTING_DEPTH {
            warn!(node = %node.id, socket, "control flow nested too deeply");
            self.diagnostics.push(CompileDiagnostic::NestingTooDeep {
                node_id: node.id.clone(),
            });
            self.emit("// Error: control flow nested too deeply", indent);
            return;
        }
        let mut arm = visited.clone();
        self.walk(next, indent, &mut arm);
    }

    fn emit_return(&mut self, node: &'a Node, indent: usize) {
        let Scope::Function(signature) = self.scope else {
            // A return outside a function body only ends the path.
            return;
        };
        self.enter(node, indent);

        let ports = &signature.def.returns;
        let values: Vec<String> = ports
            .iter()
            .map(|port| self.input(node, &port.id, port.data_type.fallback_literal()))
            .collect();

        let line = match values.as_slice() {
            [] => "return;".to_string(),
            [single] => format!("return {single};"),
            _ => {
                let fields = signature
                    .returns
                    .iter()
                    .zip(&values)
                    .map(|(field, value)| format!("{field}: {value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("return {{ {fields} }};")
            }
        };
        self.emit(line, indent);
    }

    fn emit_call(&mut self, node: &'a Node, indent: usize) {
        self.enter(node, indent);

        let function_id = node.data.function_id.as_deref().unwrap_or_default();
        let Some(signature) = self.functions.get(function_id) else {
            warn!(node = %node.id, function = function_id, "call to unknown function");
            self.diagnostics.push(CompileDiagnostic::UnknownFunction {
                node_id: node.id.clone(),
                function_id: function_id.to_string(),
            });
            self.emit(format!("// Error: function '{function_id}' not found"), indent);
            return;
        };

        let arguments = signature
            .def
            .params
            .iter()
            .map(|port| self.input(node, &port.id, port.data_type.fallback_literal()))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!("await {}({arguments});", signature.name);

        match signature.def.returns.as_slice() {
            [] => self.emit(call, indent),
            [single] => {
                let temporary = self.fresh_temporary("__ret");
                self.emit(format!("let {temporary} = {call}"), indent);
                self.bind_temporary(&node.id, &single.id, temporary);
            }
            ports => {
                let temporary = self.fresh_temporary("__ret");
                self.emit(format!("let {temporary} = {call}"), indent);
                for (port, field) in ports.iter().zip(&signature.returns) {
                    self.bind_temporary(&node.id, &port.id, format!("{temporary}.{field}"));
                }
            }
        }
    }
}
