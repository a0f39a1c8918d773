use crate::error::CompileDiagnostic;
use crate::graph::{Edge, EdgeKind, Node};
use ahash::AHashMap;
use tracing::warn;

/// The producer feeding a data input: a node and one of its output sockets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataSource<'g> {
    pub node: &'g str,
    pub socket: &'g str,
}

/// O(1) lookup structures over one graph's nodes and edges.
///
/// Edges are classified by their declared kind; nothing is re-derived from sockets.
/// Rebuilt for every compiled unit and never shared between compiles.
#[derive(Debug, Default)]
pub struct GraphIndex<'g> {
    nodes: AHashMap<&'g str, &'g Node>,
    order: Vec<&'g Node>,
    control: AHashMap<&'g str, AHashMap<&'g str, &'g str>>,
    data: AHashMap<&'g str, AHashMap<&'g str, DataSource<'g>>>,
    duplicates: Vec<CompileDiagnostic>,
}

impl<'g> GraphIndex<'g> {
    pub fn build(nodes: &'g [Node], edges: &'g [Edge]) -> Self {
        let mut index = Self {
            nodes: nodes.iter().map(|node| (node.id.as_str(), node)).collect(),
            order: nodes.iter().collect(),
            ..Default::default()
        };

        for edge in edges {
            match edge.kind {
                // A second edge from the same control socket silently replaces the first.
                EdgeKind::Control => {
                    index
                        .control
                        .entry(edge.source.as_str())
                        .or_default()
                        .insert(edge.source_socket.as_str(), edge.target.as_str());
                }
                EdgeKind::Data => {
                    let source = DataSource {
                        node: edge.source.as_str(),
                        socket: edge.source_socket.as_str(),
                    };
                    let previous = index
                        .data
                        .entry(edge.target.as_str())
                        .or_default()
                        .insert(edge.target_socket.as_str(), source);
                    if previous.is_some() {
                        warn!(
                            node = %edge.target,
                            socket = %edge.target_socket,
                            "multiple data edges into one socket, keeping the last"
                        );
                        let diagnostic = CompileDiagnostic::DuplicateDataEdge {
                            node_id: edge.target.clone(),
                            socket_id: edge.target_socket.clone(),
                        };
                        if !index.duplicates.contains(&diagnostic) {
                            index.duplicates.push(diagnostic);
                        }
                    }
                }
            }
        }

        index
    }

    pub fn node(&self, id: &str) -> Option<&'g Node> {
        self.nodes.get(id).copied()
    }

    /// The node wired to control output `socket` of `node`.
    pub fn next(&self, node: &str, socket: &str) -> Option<&'g str> {
        self.control.get(node)?.get(socket).copied()
    }

    /// The producer wired to data input `socket` of `node`.
    pub fn source(&self, node: &str, socket: &str) -> Option<DataSource<'g>> {
        self.data.get(node)?.get(socket).copied()
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &'g Node> + '_ {
        self.order.iter().copied()
    }

    /// Sockets that received more than one data edge.
    pub fn duplicates(&self) -> &[CompileDiagnostic] {
        &self.duplicates
    }
}
