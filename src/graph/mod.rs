//! The canonical graph model consumed by the compiler.
//!
//! A [`Graph`] is a flat list of nodes and edges plus an optional table of user
//! functions, each of which carries its own private sub-graph. The compiler never
//! mutates a graph; everything here is plain data that can be loaded from JSON or
//! produced by an [`IntoGraph`] implementation.

use crate::error::GraphConversionError;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

mod conversion;
mod editor;
mod kind;

pub use conversion::IntoGraph;
pub use editor::{EditorEdge, EditorFlow, EditorFunction, EditorNode};
pub use kind::NodeKind;

/// The value type carried by a data socket or data edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Number,
    String,
    Boolean,
    Array,
    /// Wildcard type. Unknown type names deserialize to this.
    #[default]
    #[serde(other)]
    Any,
}

impl DataType {
    /// The expression used when a socket of this type has nothing connected.
    pub fn fallback_literal(self) -> &'static str {
        match self {
            DataType::Number | DataType::Any => "0",
            DataType::Boolean => "false",
            DataType::String => "\"\"",
            DataType::Array => "[]",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Number => "number",
            DataType::String => "string",
            DataType::Boolean => "boolean",
            DataType::Array => "array",
            DataType::Any => "any",
        };
        f.write_str(name)
    }
}

fn is_empty_map<K, V>(map: &AHashMap<K, V>) -> bool {
    map.is_empty()
}

/// Editor-side placement of a node. Carried through, never read by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-kind attributes of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Bound variable name (get, set, input, for, array kinds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Prompt text of an input node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Raw text typed into unconnected input sockets, keyed by socket id.
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub inline_values: AHashMap<String, String>,
    /// The function referenced by a function-related node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    /// Attributes the compiler does not interpret (labels, comment text, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
    /// The bound variable name, if one is set and non-empty.
    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref().filter(|name| !name.is_empty())
    }

    /// The inline literal for `socket_id`, if one is set and non-empty.
    pub fn inline_value(&self, socket_id: &str) -> Option<&str> {
        self.inline_values
            .get(socket_id)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// A single node of a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<NodeKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            position: None,
            data: NodeData::default(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.data.variable = Some(name.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.data.prompt = Some(prompt.into());
        self
    }

    pub fn with_inline(mut self, socket_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.inline_values.insert(socket_id.into(), value.into());
        self
    }

    pub fn with_function(mut self, function_id: impl Into<String>) -> Self {
        self.data.function_id = Some(function_id.into());
        self
    }
}

/// Whether an edge carries execution order or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Control,
    Data,
}

/// A directed connection from an output socket to an input socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub source_socket: String,
    pub target: String,
    pub target_socket: String,
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
}

impl Edge {
    /// A control edge with a derived id.
    pub fn control(
        source: impl Into<String>,
        source_socket: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(source, source_socket, target, "exec-in", EdgeKind::Control, None)
    }

    /// A data edge with a derived id and no declared type.
    pub fn data(
        source: impl Into<String>,
        source_socket: impl Into<String>,
        target: impl Into<String>,
        target_socket: impl Into<String>,
    ) -> Self {
        Self::new(source, source_socket, target, target_socket, EdgeKind::Data, None)
    }

    pub fn new(
        source: impl Into<String>,
        source_socket: impl Into<String>,
        target: impl Into<String>,
        target_socket: impl Into<String>,
        kind: EdgeKind,
        data_type: Option<DataType>,
    ) -> Self {
        let source = source.into();
        let source_socket = source_socket.into();
        let target = target.into();
        let target_socket = target_socket.into();
        Self {
            id: format!("e-{source}-{source_socket}-{target}-{target_socket}"),
            source,
            source_socket,
            target,
            target_socket,
            kind,
            data_type,
        }
    }
}

/// One declared parameter or return value of a user function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionPort {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "type")]
    pub data_type: DataType,
}

impl FunctionPort {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type,
        }
    }
}

/// A user-defined function with its own private sub-graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub params: Vec<FunctionPort>,
    #[serde(default)]
    pub returns: Vec<FunctionPort>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FunctionDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: None,
            params: Vec::new(),
            returns: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

/// The complete graph value handed to the compiler.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Function table keyed by function id.
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub functions: AHashMap<String, FunctionDef>,
}

impl Graph {
    /// Parses a graph from its canonical JSON form.
    pub fn from_json(json: &str) -> Result<Self, GraphConversionError> {
        serde_json::from_str(json).map_err(|e| GraphConversionError::JsonParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GraphConversionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| GraphConversionError::JsonParseError(e.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn function(&self, id: &str) -> Option<&FunctionDef> {
        self.functions.get(id)
    }
}
