//! Common test utilities for building graphs and running programs.
use flowscript::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Fluent builder for test graphs.
#[allow(dead_code)]
#[derive(Default)]
pub struct GraphBuilder {
    graph: Graph,
}

#[allow(dead_code)]
impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: Node) -> Self {
        self.graph.nodes.push(node);
        self
    }

    /// Adds a control edge from `socket` of `from` to the `exec-in` of `to`.
    pub fn flow(mut self, from: &str, socket: &str, to: &str) -> Self {
        self.graph.edges.push(Edge::control(from, socket, to));
        self
    }

    /// Adds a data edge.
    pub fn wire(mut self, from: &str, from_socket: &str, to: &str, to_socket: &str) -> Self {
        self.graph
            .edges
            .push(Edge::data(from, from_socket, to, to_socket));
        self
    }

    pub fn function(mut self, def: FunctionDef) -> Self {
        self.graph.functions.insert(def.id.clone(), def);
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

/// A string literal as it is typed into an inline value field.
#[allow(dead_code)]
pub fn text(value: &str) -> String {
    format!("\"{}\"", value)
}

/// `start -> set(x=5) -> set(y=3) -> output(add(get(x), get(y)))`
#[allow(dead_code)]
pub fn scenario_a() -> Graph {
    GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(Node::new("set-x", NodeKind::Set).with_variable("x").with_inline("value", "5"))
        .node(Node::new("set-y", NodeKind::Set).with_variable("y").with_inline("value", "3"))
        .node(Node::new("get-x", NodeKind::Get).with_variable("x"))
        .node(Node::new("get-y", NodeKind::Get).with_variable("y"))
        .node(Node::new("add", NodeKind::Add))
        .node(Node::new("out", NodeKind::Output))
        .flow("start", "exec-out", "set-x")
        .flow("set-x", "exec-out", "set-y")
        .flow("set-y", "exec-out", "out")
        .wire("get-x", "value", "add", "a")
        .wire("get-y", "value", "add", "b")
        .wire("add", "result", "out", "value")
        .build()
}

/// `start -> set(a=10) -> if(greater(get(a), 5))`, printing "big" or "small".
#[allow(dead_code)]
pub fn scenario_b(a: &str) -> Graph {
    GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(Node::new("set-a", NodeKind::Set).with_variable("a").with_inline("value", a))
        .node(Node::new("get-a", NodeKind::Get).with_variable("a"))
        .node(Node::new("gt", NodeKind::Greater).with_inline("b", "5"))
        .node(Node::new("if", NodeKind::If))
        .node(Node::new("big", NodeKind::Output).with_inline("value", text("big")))
        .node(Node::new("small", NodeKind::Output).with_inline("value", text("small")))
        .flow("start", "exec-out", "set-a")
        .flow("set-a", "exec-out", "if")
        .flow("if", "true", "big")
        .flow("if", "false", "small")
        .wire("get-a", "value", "gt", "a")
        .wire("gt", "result", "if", "condition")
        .build()
}

/// `double(n)` returning `n * 2`, without any call site.
#[allow(dead_code)]
pub fn double_function() -> FunctionDef {
    let mut def = FunctionDef::new("fn-double", "double");
    def.params = vec![FunctionPort::new("p-n", "n", DataType::Number)];
    def.returns = vec![FunctionPort::new("r-result", "result", DataType::Number)];
    def.nodes = vec![
        Node::new("entry", NodeKind::FunctionEntry),
        Node::new("mul", NodeKind::Multiply).with_inline("b", "2"),
        Node::new("ret", NodeKind::FunctionReturn),
    ];
    def.edges = vec![
        Edge::control("entry", "exec-out", "ret"),
        Edge::data("entry", "p-n", "mul", "a"),
        Edge::data("mul", "result", "ret", "r-result"),
    ];
    def
}

/// `output(call(double, 21))`
#[allow(dead_code)]
pub fn scenario_c() -> Graph {
    GraphBuilder::new()
        .function(double_function())
        .node(Node::new("start", NodeKind::Start))
        .node(
            Node::new("call", NodeKind::CallFunction)
                .with_function("fn-double")
                .with_inline("p-n", "21"),
        )
        .node(Node::new("out", NodeKind::Output))
        .flow("start", "exec-out", "call")
        .flow("call", "exec-out", "out")
        .wire("call", "r-result", "out", "value")
        .build()
}

/// Creates `arr`, pushes 1, 2 and 3, then prints its length.
#[allow(dead_code)]
pub fn scenario_d() -> Graph {
    GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(Node::new("create", NodeKind::ArrayCreate).with_variable("arr"))
        .node(Node::new("push-1", NodeKind::ArrayPush).with_variable("arr").with_inline("value", "1"))
        .node(Node::new("push-2", NodeKind::ArrayPush).with_variable("arr").with_inline("value", "2"))
        .node(Node::new("push-3", NodeKind::ArrayPush).with_variable("arr").with_inline("value", "3"))
        .node(Node::new("len", NodeKind::ArrayLength).with_variable("arr"))
        .node(Node::new("out", NodeKind::Output))
        .flow("start", "exec-out", "create")
        .flow("create", "exec-out", "push-1")
        .flow("push-1", "exec-out", "push-2")
        .flow("push-2", "exec-out", "push-3")
        .flow("push-3", "exec-out", "out")
        .wire("len", "value", "out", "value")
        .build()
}

/// `for i in 0..5` printing `i`, then "done".
#[allow(dead_code)]
pub fn counting_loop() -> Graph {
    GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(
            Node::new("loop", NodeKind::For)
                .with_inline("from", "0")
                .with_inline("to", "5")
                .with_inline("step", "1"),
        )
        .node(Node::new("print-i", NodeKind::Output))
        .node(Node::new("finish", NodeKind::Output).with_inline("value", text("done")))
        .flow("start", "exec-out", "loop")
        .flow("loop", "body", "print-i")
        .flow("loop", "done", "finish")
        .wire("loop", "i", "print-i", "value")
        .build()
}

/// Counts `n` up to 10 in a while loop, skipping 3 with `continue` and
/// stopping at 6 with `break`, then prints "end".
#[allow(dead_code)]
pub fn break_continue_loop() -> Graph {
    GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(Node::new("init", NodeKind::Set).with_variable("n").with_inline("value", "0"))
        .node(Node::new("get-n", NodeKind::Get).with_variable("n"))
        .node(Node::new("below", NodeKind::Less).with_inline("b", "10"))
        .node(Node::new("loop", NodeKind::While))
        .node(Node::new("inc", NodeKind::Add).with_inline("b", "1"))
        .node(Node::new("bump", NodeKind::Set).with_variable("n"))
        .node(Node::new("is-3", NodeKind::Equal).with_inline("b", "3"))
        .node(Node::new("if-3", NodeKind::If))
        .node(Node::new("skip", NodeKind::Continue))
        .node(Node::new("is-6", NodeKind::Equal).with_inline("b", "6"))
        .node(Node::new("if-6", NodeKind::If))
        .node(Node::new("stop", NodeKind::Break))
        .node(Node::new("print", NodeKind::Output))
        .node(Node::new("end", NodeKind::Output).with_inline("value", text("end")))
        .flow("start", "exec-out", "init")
        .flow("init", "exec-out", "loop")
        .flow("loop", "body", "bump")
        .flow("loop", "done", "end")
        .flow("bump", "exec-out", "if-3")
        .flow("if-3", "true", "skip")
        .flow("if-3", "false", "if-6")
        .flow("if-6", "true", "stop")
        .flow("if-6", "false", "print")
        .wire("get-n", "value", "below", "a")
        .wire("below", "result", "loop", "condition")
        .wire("get-n", "value", "inc", "a")
        .wire("inc", "result", "bump", "value")
        .wire("get-n", "value", "is-3", "a")
        .wire("is-3", "result", "if-3", "condition")
        .wire("get-n", "value", "is-6", "a")
        .wire("is-6", "result", "if-6", "condition")
        .wire("get-n", "value", "print", "value")
        .build()
}

/// `start -> out-0 -> out-1 -> ...`, each printing `1`.
#[allow(dead_code)]
pub fn output_chain(length: usize) -> Graph {
    let mut builder = GraphBuilder::new().node(Node::new("start", NodeKind::Start));
    let mut previous = "start".to_string();
    for i in 0..length {
        let id = format!("out-{i}");
        builder = builder
            .node(Node::new(id.as_str(), NodeKind::Output).with_inline("value", "1"))
            .flow(&previous, "exec-out", &id);
        previous = id;
    }
    builder.build()
}

/// Prints `((0 + 1) + 1) + ...` folded from `depth` chained add nodes.
#[allow(dead_code)]
pub fn add_chain(depth: usize) -> Graph {
    let mut builder = GraphBuilder::new()
        .node(Node::new("start", NodeKind::Start))
        .node(Node::new("out", NodeKind::Output))
        .flow("start", "exec-out", "out");
    for i in 0..depth {
        let id = format!("add-{i}");
        let mut node = Node::new(id.as_str(), NodeKind::Add).with_inline("b", "1");
        if i == 0 {
            node = node.with_inline("a", "0");
        } else {
            builder = builder.wire(&format!("add-{}", i - 1), "result", &id, "a");
        }
        builder = builder.node(node);
    }
    if depth > 0 {
        builder = builder.wire(&format!("add-{}", depth - 1), "result", "out", "value");
    }
    builder.build()
}

#[allow(dead_code)]
pub fn compile(graph: &Graph) -> CompileResult {
    Compiler::builder(graph).build().compile()
}

#[allow(dead_code)]
pub fn compile_instrumented(graph: &Graph) -> CompileResult {
    Compiler::builder(graph)
        .with_instrumentation(true)
        .build()
        .compile()
}

/// Runs `code` to completion in instant mode and returns the recorded events.
#[allow(dead_code)]
pub async fn run_code(code: &str, answers: &[&str]) -> (RunOutcome, EventRecorder) {
    let recorder = Arc::new(EventRecorder::new().with_answers(answers.iter().copied()));
    let mut executor = Executor::new();
    let handle = executor
        .start(code, Arc::clone(&recorder), RunOptions::default().with_seed(7))
        .expect("Failed to start run");
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("Run did not finish in time");
    (outcome, (*recorder).clone())
}

/// Compiles `graph` and runs it, returning the printed lines.
#[allow(dead_code)]
pub async fn run_graph(graph: &Graph) -> Vec<String> {
    let result = compile(graph);
    assert!(
        result.errors.is_empty(),
        "Unexpected diagnostics: {:?}",
        result.errors
    );
    let (outcome, recorder) = run_code(&result.code, &[]).await;
    assert_eq!(
        outcome,
        RunOutcome::Completed,
        "Run failed: {:?}",
        recorder.errors()
    );
    recorder.logs()
}
