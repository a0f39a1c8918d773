//! The editor's export format.
//!
//! The editor stores a node's kind under `type` and names sockets "handles". Its
//! edges carry no reliable kind, so conversion reclassifies every edge from the
//! declared shape of its source socket.

use super::{DataType, Edge, EdgeKind, FunctionDef, Graph, IntoGraph, Node, NodeData, Position};
use crate::error::GraphConversionError;
use crate::pins::{self, SocketKind};
use ahash::{AHashMap, AHashSet};
use serde::Deserialize;

/// Socket ids that always denote control flow, whatever the node.
const CONTROL_SOCKETS: [&str; 6] = ["exec-in", "exec-out", "true", "false", "body", "done"];

#[derive(Debug, Deserialize, Clone)]
pub struct EditorNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub data: NodeData,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditorEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    #[serde(alias = "sourceHandle")]
    pub source_handle: String,
    pub target: String,
    #[serde(alias = "targetHandle")]
    pub target_handle: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EditorFunction {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub params: Vec<super::FunctionPort>,
    #[serde(default)]
    pub returns: Vec<super::FunctionPort>,
    #[serde(default)]
    pub nodes: Vec<EditorNode>,
    #[serde(default)]
    pub edges: Vec<EditorEdge>,
}

/// A complete editor export: the main canvas plus the function table.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EditorFlow {
    #[serde(default)]
    pub nodes: Vec<EditorNode>,
    #[serde(default)]
    pub edges: Vec<EditorEdge>,
    #[serde(default)]
    pub functions: AHashMap<String, EditorFunction>,
}

impl EditorFlow {
    pub fn from_json(json: &str) -> Result<Self, GraphConversionError> {
        serde_json::from_str(json).map_err(|e| GraphConversionError::JsonParseError(e.to_string()))
    }
}

impl IntoGraph for EditorFlow {
    fn into_graph(self) -> Result<Graph, GraphConversionError> {
        // Port lists first: edge classification on call sites needs them.
        let signatures: AHashMap<String, FunctionDef> = self
            .functions
            .iter()
            .map(|(id, function)| {
                let mut def = FunctionDef::new(function.id.clone(), function.name.clone());
                def.params = function.params.clone();
                def.returns = function.returns.clone();
                (id.clone(), def)
            })
            .collect();

        let mut functions = AHashMap::new();
        for (id, function) in self.functions {
            let owner = signatures.get(&id);
            let (nodes, edges) =
                convert_scope(function.nodes, function.edges, &signatures, owner)?;
            functions.insert(
                id,
                FunctionDef {
                    id: function.id,
                    name: function.name,
                    color: function.color,
                    params: function.params,
                    returns: function.returns,
                    nodes,
                    edges,
                },
            );
        }

        let (nodes, edges) = convert_scope(self.nodes, self.edges, &signatures, None)?;
        Ok(Graph {
            nodes,
            edges,
            functions,
        })
    }
}

fn convert_scope(
    editor_nodes: Vec<EditorNode>,
    editor_edges: Vec<EditorEdge>,
    functions: &AHashMap<String, FunctionDef>,
    owner: Option<&FunctionDef>,
) -> Result<(Vec<Node>, Vec<Edge>), GraphConversionError> {
    let mut seen = AHashSet::new();
    let mut nodes = Vec::with_capacity(editor_nodes.len());
    for editor_node in editor_nodes {
        if !seen.insert(editor_node.id.clone()) {
            return Err(GraphConversionError::ValidationError(format!(
                "Duplicate node id '{}'",
                editor_node.id
            )));
        }
        nodes.push(Node {
            id: editor_node.id,
            kind: editor_node.node_type.into(),
            position: editor_node.position,
            data: editor_node.data,
        });
    }

    let by_id: AHashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let mut edges = Vec::with_capacity(editor_edges.len());
    for editor_edge in editor_edges {
        let source = by_id.get(editor_edge.source.as_str()).ok_or_else(|| {
            GraphConversionError::ValidationError(format!(
                "Edge references unknown source node '{}'",
                editor_edge.source
            ))
        })?;
        if !by_id.contains_key(editor_edge.target.as_str()) {
            return Err(GraphConversionError::ValidationError(format!(
                "Edge references unknown target node '{}'",
                editor_edge.target
            )));
        }

        let (kind, data_type) = classify(source, &editor_edge.source_handle, functions, owner);
        let id = editor_edge.id.unwrap_or_else(|| {
            format!(
                "e-{}-{}-{}-{}",
                editor_edge.source,
                editor_edge.source_handle,
                editor_edge.target,
                editor_edge.target_handle
            )
        });
        edges.push(Edge {
            id,
            source: editor_edge.source,
            source_socket: editor_edge.source_handle,
            target: editor_edge.target,
            target_socket: editor_edge.target_handle,
            kind,
            data_type,
        });
    }

    Ok((nodes, edges))
}

/// Decides the edge kind from the declared source socket, falling back to the
/// well-known control socket ids when the socket is not declared.
fn classify(
    source: &Node,
    socket_id: &str,
    functions: &AHashMap<String, FunctionDef>,
    owner: Option<&FunctionDef>,
) -> (EdgeKind, Option<DataType>) {
    let function = pins::function_for(source, functions, owner);
    let declared = pins::sockets_of(&source.kind, function)
        .right
        .into_iter()
        .find(|socket| socket.id == socket_id);

    match declared.map(|socket| socket.kind) {
        Some(SocketKind::Control) => (EdgeKind::Control, None),
        Some(SocketKind::Data(data_type)) => (EdgeKind::Data, Some(data_type)),
        None if CONTROL_SOCKETS.contains(&socket_id) => (EdgeKind::Control, None),
        None => (EdgeKind::Data, Some(DataType::Any)),
    }
}
