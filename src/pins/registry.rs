use super::{NodeSockets, Socket, SocketKind, SocketProvider};
use crate::graph::{DataType, NodeKind};

const CONTROL: SocketKind = SocketKind::Control;
const NUMBER: SocketKind = SocketKind::Data(DataType::Number);
const STRING: SocketKind = SocketKind::Data(DataType::String);
const BOOLEAN: SocketKind = SocketKind::Data(DataType::Boolean);
const ANY: SocketKind = SocketKind::Data(DataType::Any);

/// Master macro for the static socket table: one entry per kind, with its left
/// (input) and right (output) sockets in declared order.
macro_rules! define_socket_table {
    ( $( $kind:path => [ $( ($l_id:expr, $l_kind:expr) ),* ] [ $( ($r_id:expr, $r_kind:expr) ),* ] ),* $(,)? ) => {
        /// Looks up the fixed socket shape of `kind`. Returns `None` for unknown kinds.
        pub(super) fn lookup(kind: &NodeKind) -> Option<NodeSockets> {
            match kind {
                $(
                    $kind => Some(NodeSockets {
                        left: vec![ $( Socket::new($l_id, $l_kind) ),* ],
                        right: vec![ $( Socket::new($r_id, $r_kind) ),* ],
                    }),
                )*
                NodeKind::Unknown(_) => None,
            }
        }
    };
}

define_socket_table! {
    NodeKind::Start => [] [("exec-out", CONTROL)],
    NodeKind::End => [("exec-in", CONTROL)] [],
    NodeKind::Input => [("exec-in", CONTROL), ("prompt", STRING)] [("exec-out", CONTROL), ("out-value", NUMBER)],
    NodeKind::Output => [("exec-in", CONTROL), ("value", ANY)] [("exec-out", CONTROL)],
    NodeKind::Set => [("exec-in", CONTROL), ("value", ANY)] [("exec-out", CONTROL), ("out-value", ANY)],
    NodeKind::Get => [] [("value", ANY)],
    NodeKind::If => [("exec-in", CONTROL), ("condition", BOOLEAN)] [("true", CONTROL), ("false", CONTROL)],
    NodeKind::While => [("exec-in", CONTROL), ("condition", BOOLEAN)] [("body", CONTROL), ("done", CONTROL)],
    NodeKind::For => [("exec-in", CONTROL), ("from", NUMBER), ("to", NUMBER), ("step", NUMBER)]
        [("body", CONTROL), ("done", CONTROL), ("i", NUMBER)],
    NodeKind::Break => [("exec-in", CONTROL)] [],
    NodeKind::Continue => [("exec-in", CONTROL)] [],

    NodeKind::Add => [("a", NUMBER), ("b", NUMBER)] [("result", NUMBER)],
    NodeKind::Subtract => [("a", NUMBER), ("b", NUMBER)] [("result", NUMBER)],
    NodeKind::Multiply => [("a", NUMBER), ("b", NUMBER)] [("result", NUMBER)],
    NodeKind::Divide => [("a", NUMBER), ("b", NUMBER)] [("result", NUMBER)],
    NodeKind::Modulo => [("a", NUMBER), ("b", NUMBER)] [("result", NUMBER)],

    NodeKind::Greater => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],
    NodeKind::Less => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],
    NodeKind::Equal => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],
    NodeKind::GreaterEq => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],
    NodeKind::LessEq => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],
    NodeKind::NotEqual => [("a", NUMBER), ("b", NUMBER)] [("result", BOOLEAN)],

    NodeKind::Concat => [("a", STRING), ("b", STRING)] [("result", STRING)],
    NodeKind::Random => [("min", NUMBER), ("max", NUMBER)] [("value", NUMBER)],
    NodeKind::Not => [("value", BOOLEAN)] [("result", BOOLEAN)],

    NodeKind::ArrayCreate => [("exec-in", CONTROL)] [("exec-out", CONTROL)],
    NodeKind::ArrayPush => [("exec-in", CONTROL), ("value", ANY)] [("exec-out", CONTROL)],
    NodeKind::ArrayPop => [("exec-in", CONTROL)] [("exec-out", CONTROL), ("value", ANY)],
    NodeKind::ArrayLength => [] [("value", NUMBER)],
    NodeKind::ArrayGet => [("index", NUMBER)] [("value", ANY)],
    NodeKind::ArraySet => [("exec-in", CONTROL), ("index", NUMBER), ("value", ANY)] [("exec-out", CONTROL)],

    // Control sockets only; the data sockets come from the function definition.
    NodeKind::FunctionEntry => [] [("exec-out", CONTROL)],
    NodeKind::FunctionReturn => [("exec-in", CONTROL)] [],
    NodeKind::CallFunction => [("exec-in", CONTROL)] [("exec-out", CONTROL)],

    NodeKind::Comment => [] [],
}

/// The fixed-shape provider backed by the socket table.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSockets;

impl SocketProvider for StaticSockets {
    fn sockets(&self, kind: &NodeKind) -> Option<NodeSockets> {
        lookup(kind)
    }
}
