use super::Graph;
use crate::error::GraphConversionError;

/// A trait for foreign graph formats that can be converted into a flowscript [`Graph`].
///
/// This is the extension point that keeps the compiler format-agnostic. Implement it
/// on the structs your editor or storage layer produces and the compiler can consume
/// them directly. [`super::EditorFlow`] is the implementation for the editor's own
/// export format.
///
/// # Example
///
/// ```rust
/// use flowscript::prelude::*;
/// use flowscript::error::GraphConversionError;
///
/// struct Script {
///     lines: Vec<String>,
/// }
///
/// impl IntoGraph for Script {
///     fn into_graph(self) -> std::result::Result<Graph, GraphConversionError> {
///         let mut graph = Graph::default();
///         graph.nodes.push(Node::new("start", NodeKind::Start));
///         let mut previous = "start".to_string();
///         for (index, line) in self.lines.into_iter().enumerate() {
///             let id = format!("out-{index}");
///             let text = format!("\"{}\"", line.replace('"', "\\\""));
///             graph.nodes.push(Node::new(id.clone(), NodeKind::Output).with_inline("value", text));
///             graph.edges.push(Edge::control(previous, "exec-out", id.clone()));
///             previous = id;
///         }
///         Ok(graph)
///     }
/// }
///
/// let graph = Script { lines: vec!["hello".into()] }.into_graph().unwrap();
/// let result = Compiler::builder(&graph).build().compile();
/// assert_eq!(result.code, "console.log(\"hello\");");
/// ```
pub trait IntoGraph {
    /// Consumes the object and converts it into a compilable graph.
    fn into_graph(self) -> Result<Graph, GraphConversionError>;
}

impl IntoGraph for Graph {
    fn into_graph(self) -> Result<Graph, GraphConversionError> {
        Ok(self)
    }
}
