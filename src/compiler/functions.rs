use crate::graph::{FunctionDef, Graph};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;

/// Words that cannot name a binding in generated code, plus the runtime library
/// names a user binding would shadow.
const RESERVED: &[&str] = &[
    "arguments", "async", "await", "break", "case", "catch", "class", "const", "continue",
    "debugger", "default", "delete", "do", "else", "enum", "eval", "export", "extends",
    "false", "finally", "for", "function", "if", "implements", "import", "in", "instanceof",
    "interface", "let", "new", "null", "of", "package", "private", "protected", "public",
    "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof",
    "undefined", "var", "void", "while", "with", "yield", "NaN", "Infinity",
    // Runtime library
    "console", "Math", "prompt", "parseFloat", "String", "Number",
];

/// Turns arbitrary display text into a valid identifier.
///
/// Characters other than ASCII letters, digits, `_` and `$` become `_`; a leading
/// digit or a reserved name gets a `_` prefix.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut name: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        return "_".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) || RESERVED.contains(&name.as_str()) {
        name.insert(0, '_');
    }
    name
}

/// Variables the emitter binds when a node names none.
const DEFAULT_BINDINGS: &[&str] = &["_var", "_arr", "_input", "i"];

/// Every identifier `graph` binds as a variable or a parameter, in any unit.
pub fn binding_names(graph: &Graph) -> AHashSet<String> {
    let nodes = graph
        .nodes
        .iter()
        .chain(graph.functions.values().flat_map(|def| &def.nodes));
    let variables = nodes.filter_map(|node| node.data.variable());
    let params = graph
        .functions
        .values()
        .flat_map(|def| def.params.iter().map(|port| port.name.as_str()));

    DEFAULT_BINDINGS
        .iter()
        .map(|name| name.to_string())
        .chain(variables.chain(params).map(sanitize_identifier))
        .collect()
}

/// Claims `base` in `taken`, appending `_2`, `_3`, ... until it is free.
fn claim_unique(base: String, taken: &mut AHashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Everything a call site needs to know about a compiled function.
#[derive(Debug, Clone)]
pub struct CallableSignature<'g> {
    pub def: &'g FunctionDef,
    /// The generated callable's identifier.
    pub name: String,
    /// Parameter identifiers, in declared order.
    pub params: Vec<String>,
    /// Field names of the returned record, in declared order.
    pub returns: Vec<String>,
}

impl CallableSignature<'_> {
    /// The identifier bound to the parameter with port id `port_id`.
    pub fn param_name(&self, port_id: &str) -> Option<&str> {
        self.def
            .params
            .iter()
            .position(|port| port.id == port_id)
            .map(|index| self.params[index].as_str())
    }
}

/// Naming table for every user function, ordered by function id.
///
/// Function names are claimed after every variable and parameter of the graph,
/// so a function never shadows a binding. The resulting set of taken names is
/// kept for allocating temporaries.
#[derive(Debug, Default)]
pub struct FunctionTable<'g> {
    signatures: Vec<CallableSignature<'g>>,
    by_id: AHashMap<&'g str, usize>,
    reserved: AHashSet<String>,
}

impl<'g> FunctionTable<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let functions = &graph.functions;
        let mut taken = binding_names(graph);
        let signatures: Vec<_> = functions
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .map(|(_, def)| {
                let name = claim_unique(sanitize_identifier(&def.name), &mut taken);

                let mut param_names = AHashSet::new();
                let params: Vec<String> = def
                    .params
                    .iter()
                    .map(|port| claim_unique(sanitize_identifier(&port.name), &mut param_names))
                    .collect();
                taken.extend(params.iter().cloned());

                let mut field_names = AHashSet::new();
                let returns = def
                    .returns
                    .iter()
                    .map(|port| claim_unique(sanitize_identifier(&port.name), &mut field_names))
                    .collect();

                CallableSignature {
                    def,
                    name,
                    params,
                    returns,
                }
            })
            .collect();

        let by_id = functions
            .iter()
            .sorted_by(|a, b| a.0.cmp(b.0))
            .enumerate()
            .map(|(index, (id, _))| (id.as_str(), index))
            .collect();

        Self {
            signatures,
            by_id,
            reserved: taken,
        }
    }

    /// Whether `name` is already a function, variable or parameter name.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn get(&self, function_id: &str) -> Option<&CallableSignature<'g>> {
        self.by_id.get(function_id).map(|&index| &self.signatures[index])
    }

    /// Signatures in function-id order.
    pub fn iter(&self) -> impl Iterator<Item = &CallableSignature<'g>> {
        self.signatures.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
