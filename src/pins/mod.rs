//! Pin compatibility model.
//!
//! Every node kind exposes an ordered list of input sockets (left) and output
//! sockets (right). Most kinds have a fixed shape held in a static table; the
//! function-related kinds derive their data sockets from a [`FunctionDef`] that is
//! always passed in explicitly.

use crate::error::PinError;
use crate::graph::{DataType, EdgeKind, FunctionDef, Node, NodeKind};
use ahash::AHashMap;
use itertools::Itertools;

mod registry;

pub use registry::StaticSockets;

/// Whether a socket carries execution order or a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketKind {
    Control,
    Data(DataType),
}

impl SocketKind {
    pub fn edge_kind(self) -> EdgeKind {
        match self {
            SocketKind::Control => EdgeKind::Control,
            SocketKind::Data(_) => EdgeKind::Data,
        }
    }

    pub fn data_type(self) -> Option<DataType> {
        match self {
            SocketKind::Control => None,
            SocketKind::Data(data_type) => Some(data_type),
        }
    }
}

/// Which end of a connection a dragged wire started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    /// An output socket; the new node must offer a matching input.
    Source,
    /// An input socket; the new node must offer a matching output.
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Socket {
    pub id: String,
    pub kind: SocketKind,
}

impl Socket {
    pub fn new(id: impl Into<String>, kind: SocketKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// The socket shape of a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSockets {
    pub left: Vec<Socket>,
    pub right: Vec<Socket>,
}

impl NodeSockets {
    pub fn input(&self, id: &str) -> Option<&Socket> {
        self.left.iter().find(|socket| socket.id == id)
    }

    pub fn output(&self, id: &str) -> Option<&Socket> {
        self.right.iter().find(|socket| socket.id == id)
    }
}

/// Defines the contract for answering "which sockets does this kind have?".
pub trait SocketProvider {
    fn sockets(&self, kind: &NodeKind) -> Option<NodeSockets>;
}

/// Derives the sockets of the function-related kinds from one function definition.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSockets<'a> {
    pub function: &'a FunctionDef,
}

impl SocketProvider for FunctionSockets<'_> {
    fn sockets(&self, kind: &NodeKind) -> Option<NodeSockets> {
        let params = || {
            self.function
                .params
                .iter()
                .map(|port| Socket::new(port.id.clone(), SocketKind::Data(port.data_type)))
        };
        let returns = || {
            self.function
                .returns
                .iter()
                .map(|port| Socket::new(port.id.clone(), SocketKind::Data(port.data_type)))
        };
        let control = |id: &str| Socket::new(id, SocketKind::Control);

        match kind {
            NodeKind::CallFunction => Some(NodeSockets {
                left: std::iter::once(control("exec-in")).chain(params()).collect(),
                right: std::iter::once(control("exec-out")).chain(returns()).collect(),
            }),
            NodeKind::FunctionEntry => Some(NodeSockets {
                left: Vec::new(),
                right: std::iter::once(control("exec-out")).chain(params()).collect(),
            }),
            NodeKind::FunctionReturn => Some(NodeSockets {
                left: std::iter::once(control("exec-in")).chain(returns()).collect(),
                right: Vec::new(),
            }),
            other => StaticSockets.sockets(other),
        }
    }
}

/// Returns the socket shape of `kind`, using `function` for the function-related kinds.
///
/// Unknown kinds have no sockets.
pub fn sockets_of(kind: &NodeKind, function: Option<&FunctionDef>) -> NodeSockets {
    let shape = match function {
        Some(function) if kind.is_function_kind() => FunctionSockets { function }.sockets(kind),
        _ => StaticSockets.sockets(kind),
    };
    shape.unwrap_or_default()
}

/// Finds the function definition that shapes `node`.
///
/// A node's explicit `functionId` wins; entry and return nodes without one belong
/// to `owner`, the function whose sub-graph contains them.
pub fn function_for<'a>(
    node: &Node,
    functions: &'a AHashMap<String, FunctionDef>,
    owner: Option<&'a FunctionDef>,
) -> Option<&'a FunctionDef> {
    if let Some(function) = node
        .data
        .function_id
        .as_deref()
        .and_then(|id| functions.get(id))
    {
        return Some(function);
    }
    match node.kind {
        NodeKind::FunctionEntry | NodeKind::FunctionReturn => owner,
        _ => None,
    }
}

/// Two data types can be connected when they are equal or either one is `any`.
pub fn types_compatible(a: DataType, b: DataType) -> bool {
    a == b || a == DataType::Any || b == DataType::Any
}

fn kinds_compatible(a: SocketKind, b: SocketKind) -> bool {
    match (a, b) {
        (SocketKind::Control, SocketKind::Control) => true,
        (SocketKind::Data(a), SocketKind::Data(b)) => types_compatible(a, b),
        _ => false,
    }
}

/// Returns the first socket on `target_kind` that can accept a wire dragged from
/// a socket of `origin_kind` playing `origin_role`.
///
/// Dragging from an output scans the target's inputs; dragging from an input scans
/// its outputs. The scan follows declared socket order, so the result is stable.
pub fn find_compatible_socket(
    target_kind: &NodeKind,
    origin_role: SocketRole,
    origin_kind: SocketKind,
    function: Option<&FunctionDef>,
) -> Option<String> {
    let sockets = sockets_of(target_kind, function);
    let candidates = match origin_role {
        SocketRole::Source => sockets.left,
        SocketRole::Target => sockets.right,
    };
    candidates
        .into_iter()
        .find(|socket| kinds_compatible(origin_kind, socket.kind))
        .map(|socket| socket.id)
}

pub fn has_compatible_socket(
    target_kind: &NodeKind,
    origin_role: SocketRole,
    origin_kind: SocketKind,
    function: Option<&FunctionDef>,
) -> bool {
    find_compatible_socket(target_kind, origin_role, origin_kind, function).is_some()
}

/// One entry of the filtered node-creation menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibleKind {
    pub kind: NodeKind,
    /// Set for `call-function` entries.
    pub function_id: Option<String>,
    /// The socket the new node would be wired through.
    pub socket_id: String,
}

/// Lists every kind that could be created at the end of a dangling wire: the static
/// kinds in menu order, then one `call-function` entry per function, by function id.
pub fn compatible_kinds(
    origin_role: SocketRole,
    origin_kind: SocketKind,
    functions: &AHashMap<String, FunctionDef>,
) -> Vec<CompatibleKind> {
    let static_kinds = NodeKind::STATIC.iter().filter_map(|kind| {
        find_compatible_socket(kind, origin_role, origin_kind, None).map(|socket_id| {
            CompatibleKind {
                kind: kind.clone(),
                function_id: None,
                socket_id,
            }
        })
    });

    let calls = functions
        .values()
        .sorted_by(|a, b| a.id.cmp(&b.id))
        .filter_map(|function| {
            find_compatible_socket(&NodeKind::CallFunction, origin_role, origin_kind, Some(function))
                .map(|socket_id| CompatibleKind {
                    kind: NodeKind::CallFunction,
                    function_id: Some(function.id.clone()),
                    socket_id,
                })
        });

    static_kinds.chain(calls).collect()
}

/// Validates a proposed edge between two concrete sockets and returns the edge
/// kind and data type it would carry.
pub fn check_connection(
    source: &NodeSockets,
    source_socket: &str,
    target: &NodeSockets,
    target_socket: &str,
) -> Result<(EdgeKind, Option<DataType>), PinError> {
    let from = source.output(source_socket).ok_or_else(|| PinError::UnknownSocket {
        socket_id: source_socket.to_string(),
        side: "output",
    })?;
    let to = target.input(target_socket).ok_or_else(|| PinError::UnknownSocket {
        socket_id: target_socket.to_string(),
        side: "input",
    })?;

    match (from.kind, to.kind) {
        (SocketKind::Control, SocketKind::Control) => Ok((EdgeKind::Control, None)),
        (SocketKind::Data(source_type), SocketKind::Data(target_type)) => {
            if types_compatible(source_type, target_type) {
                Ok((EdgeKind::Data, Some(source_type)))
            } else {
                Err(PinError::TypeMismatch {
                    source_type,
                    target_type,
                })
            }
        }
        _ => Err(PinError::KindMismatch),
    }
}
