use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of node kinds the compiler understands.
///
/// Tags outside the set survive as [`NodeKind::Unknown`] so that graphs written by
/// newer editors still load; the compiler treats them as inert pass-through nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    // Flow
    Start,
    End,
    Input,
    Output,
    Set,
    Get,
    If,
    While,
    For,
    Break,
    Continue,

    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Greater,
    Less,
    Equal,
    GreaterEq,
    LessEq,
    NotEqual,

    // Special data nodes
    Concat,
    Random,
    Not,

    // Arrays
    ArrayCreate,
    ArrayPush,
    ArrayPop,
    ArrayLength,
    ArrayGet,
    ArraySet,

    // User functions
    FunctionEntry,
    FunctionReturn,
    CallFunction,

    Comment,
    Unknown(String),
}

impl NodeKind {
    /// Every kind with a static socket shape, in menu order.
    pub const STATIC: &'static [NodeKind] = &[
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Input,
        NodeKind::Output,
        NodeKind::Set,
        NodeKind::Get,
        NodeKind::If,
        NodeKind::While,
        NodeKind::For,
        NodeKind::Break,
        NodeKind::Continue,
        NodeKind::Add,
        NodeKind::Subtract,
        NodeKind::Multiply,
        NodeKind::Divide,
        NodeKind::Modulo,
        NodeKind::Greater,
        NodeKind::Less,
        NodeKind::Equal,
        NodeKind::GreaterEq,
        NodeKind::LessEq,
        NodeKind::NotEqual,
        NodeKind::Concat,
        NodeKind::Random,
        NodeKind::Not,
        NodeKind::ArrayCreate,
        NodeKind::ArrayPush,
        NodeKind::ArrayPop,
        NodeKind::ArrayLength,
        NodeKind::ArrayGet,
        NodeKind::ArraySet,
        NodeKind::Comment,
    ];

    /// Parses a tag, accepting both the canonical kebab-case form and the
    /// camel-case form used by the editor.
    pub fn from_tag(tag: &str) -> NodeKind {
        match tag {
            "start" => NodeKind::Start,
            "end" => NodeKind::End,
            "input" => NodeKind::Input,
            "output" => NodeKind::Output,
            "set" => NodeKind::Set,
            "get" => NodeKind::Get,
            "if" => NodeKind::If,
            "while" => NodeKind::While,
            "for" => NodeKind::For,
            "break" => NodeKind::Break,
            "continue" => NodeKind::Continue,
            "add" => NodeKind::Add,
            "subtract" => NodeKind::Subtract,
            "multiply" => NodeKind::Multiply,
            "divide" => NodeKind::Divide,
            "modulo" => NodeKind::Modulo,
            "greater" => NodeKind::Greater,
            "less" => NodeKind::Less,
            "equal" => NodeKind::Equal,
            "greater-eq" | "greaterEq" => NodeKind::GreaterEq,
            "less-eq" | "lessEq" => NodeKind::LessEq,
            "not-equal" | "notEqual" => NodeKind::NotEqual,
            "concat" => NodeKind::Concat,
            "random" => NodeKind::Random,
            "not" => NodeKind::Not,
            "array-create" | "arrayCreate" => NodeKind::ArrayCreate,
            "array-push" | "arrayPush" => NodeKind::ArrayPush,
            "array-pop" | "arrayPop" => NodeKind::ArrayPop,
            "array-length" | "arrayLength" => NodeKind::ArrayLength,
            "array-get" | "arrayGet" => NodeKind::ArrayGet,
            "array-set" | "arraySet" => NodeKind::ArraySet,
            "function-entry" | "functionEntry" => NodeKind::FunctionEntry,
            "function-return" | "functionReturn" => NodeKind::FunctionReturn,
            "call-function" | "callFunction" => NodeKind::CallFunction,
            "comment" => NodeKind::Comment,
            other => NodeKind::Unknown(other.to_string()),
        }
    }

    /// The canonical tag of this kind.
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Input => "input",
            NodeKind::Output => "output",
            NodeKind::Set => "set",
            NodeKind::Get => "get",
            NodeKind::If => "if",
            NodeKind::While => "while",
            NodeKind::For => "for",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Add => "add",
            NodeKind::Subtract => "subtract",
            NodeKind::Multiply => "multiply",
            NodeKind::Divide => "divide",
            NodeKind::Modulo => "modulo",
            NodeKind::Greater => "greater",
            NodeKind::Less => "less",
            NodeKind::Equal => "equal",
            NodeKind::GreaterEq => "greater-eq",
            NodeKind::LessEq => "less-eq",
            NodeKind::NotEqual => "not-equal",
            NodeKind::Concat => "concat",
            NodeKind::Random => "random",
            NodeKind::Not => "not",
            NodeKind::ArrayCreate => "array-create",
            NodeKind::ArrayPush => "array-push",
            NodeKind::ArrayPop => "array-pop",
            NodeKind::ArrayLength => "array-length",
            NodeKind::ArrayGet => "array-get",
            NodeKind::ArraySet => "array-set",
            NodeKind::FunctionEntry => "function-entry",
            NodeKind::FunctionReturn => "function-return",
            NodeKind::CallFunction => "call-function",
            NodeKind::Comment => "comment",
            NodeKind::Unknown(tag) => tag,
        }
    }

    /// Operator symbol for the binary arithmetic and comparison kinds.
    pub fn binary_operator(&self) -> Option<&'static str> {
        match self {
            NodeKind::Add => Some("+"),
            NodeKind::Subtract => Some("-"),
            NodeKind::Multiply => Some("*"),
            NodeKind::Divide => Some("/"),
            NodeKind::Modulo => Some("%"),
            NodeKind::Greater => Some(">"),
            NodeKind::Less => Some("<"),
            NodeKind::Equal => Some("==="),
            NodeKind::GreaterEq => Some(">="),
            NodeKind::LessEq => Some("<="),
            NodeKind::NotEqual => Some("!=="),
            _ => None,
        }
    }

    /// Kinds whose socket shape depends on a [`super::FunctionDef`].
    pub fn is_function_kind(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionEntry | NodeKind::FunctionReturn | NodeKind::CallFunction
        )
    }
}

impl From<String> for NodeKind {
    fn from(tag: String) -> Self {
        NodeKind::from_tag(&tag)
    }
}

impl From<&str> for NodeKind {
    fn from(tag: &str) -> Self {
        NodeKind::from_tag(tag)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
