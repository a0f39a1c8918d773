//! Integration tests for flowscript
//!
//! End-to-end tests: load a graph, compile it and run the generated program.
//!
mod common;
use common::*;
use flowscript::compiler::{CIRCULAR_MARKER, MAX_EXPRESSION_DEPTH};
use flowscript::prelude::*;

const EDITOR_FLOW_JSON: &str = r#"{
  "nodes": [
    { "id": "s", "type": "start", "position": { "x": 0, "y": 0 }, "data": {} },
    { "id": "set", "type": "set", "data": { "variable": "total", "inlineValues": { "value": "2" } } },
    { "id": "call", "type": "callFunction", "data": { "functionId": "f1", "inlineValues": { "p-x": "20" } } },
    { "id": "o", "type": "output", "data": {} },
    { "id": "note", "type": "comment", "data": { "text": "adds the running total" } }
  ],
  "edges": [
    { "id": "e1", "source": "s", "sourceHandle": "exec-out", "target": "set", "targetHandle": "exec-in" },
    { "source": "set", "sourceHandle": "exec-out", "target": "call", "targetHandle": "exec-in" },
    { "source": "call", "sourceHandle": "exec-out", "target": "o", "targetHandle": "exec-in" },
    { "source": "call", "sourceHandle": "r-y", "target": "o", "targetHandle": "value" }
  ],
  "functions": {
    "f1": {
      "id": "f1",
      "name": "plusTotal",
      "params": [{ "id": "p-x", "name": "x", "type": "number" }],
      "returns": [{ "id": "r-y", "name": "y", "type": "number" }],
      "nodes": [
        { "id": "fe", "type": "functionEntry", "data": {} },
        { "id": "g", "type": "get", "data": { "variable": "total" } },
        { "id": "plus", "type": "add", "data": {} },
        { "id": "fr", "type": "functionReturn", "data": {} }
      ],
      "edges": [
        { "source": "fe", "sourceHandle": "exec-out", "target": "fr", "targetHandle": "exec-in" },
        { "source": "fe", "sourceHandle": "p-x", "target": "plus", "targetHandle": "a" },
        { "source": "g", "sourceHandle": "value", "target": "plus", "targetHandle": "b" },
        { "source": "plus", "sourceHandle": "result", "target": "fr", "targetHandle": "r-y" }
      ]
    }
  }
}"#;

const CANONICAL_GRAPH_JSON: &str = r#"{
  "nodes": [
    { "id": "start", "kind": "start" },
    { "id": "greet", "kind": "output", "data": { "inlineValues": { "value": "\"hello\"" } } },
    { "id": "done", "kind": "end" }
  ],
  "edges": [
    {
      "id": "e1",
      "source": "start",
      "sourceSocket": "exec-out",
      "target": "greet",
      "targetSocket": "exec-in",
      "kind": "control"
    },
    {
      "id": "e2",
      "source": "greet",
      "sourceSocket": "exec-out",
      "target": "done",
      "targetSocket": "exec-in",
      "kind": "control"
    }
  ]
}"#;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_sequential_sets_print_their_sum() {
        assert_eq!(run_graph(&scenario_a()).await, ["8"]);
    }

    #[tokio::test]
    async fn test_only_the_taken_branch_runs() {
        assert_eq!(run_graph(&scenario_b("10")).await, ["big"]);
        assert_eq!(run_graph(&scenario_b("1")).await, ["small"]);
    }

    #[tokio::test]
    async fn test_function_call_result_is_printed() {
        assert_eq!(run_graph(&scenario_c()).await, ["42"]);
    }

    #[tokio::test]
    async fn test_array_length_after_pushes() {
        assert_eq!(run_graph(&scenario_d()).await, ["3"]);
    }

    #[tokio::test]
    async fn test_loops_run_to_completion() {
        assert_eq!(
            run_graph(&counting_loop()).await,
            ["0", "1", "2", "3", "4", "done"]
        );
        assert_eq!(
            run_graph(&break_continue_loop()).await,
            ["1", "2", "4", "5", "end"]
        );
    }

    #[tokio::test]
    async fn test_reassigned_variable_runs_without_redeclaration() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("s1", NodeKind::Set).with_variable("x").with_inline("value", "1"))
            .node(Node::new("s2", NodeKind::Set).with_variable("x").with_inline("value", "2"))
            .node(Node::new("get", NodeKind::Get).with_variable("x"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "s1")
            .flow("s1", "exec-out", "s2")
            .flow("s2", "exec-out", "out")
            .wire("get", "value", "out", "value")
            .build();

        assert_eq!(run_graph(&graph).await, ["2"]);
    }

    #[tokio::test]
    async fn test_multiple_returns_are_read_by_name() {
        let mut def = FunctionDef::new("fn-sd", "sumDiff");
        def.params = vec![
            FunctionPort::new("p-a", "a", DataType::Number),
            FunctionPort::new("p-b", "b", DataType::Number),
        ];
        def.returns = vec![
            FunctionPort::new("r-sum", "sum", DataType::Number),
            FunctionPort::new("r-diff", "diff", DataType::Number),
        ];
        def.nodes = vec![
            Node::new("entry", NodeKind::FunctionEntry),
            Node::new("add", NodeKind::Add),
            Node::new("sub", NodeKind::Subtract),
            Node::new("ret", NodeKind::FunctionReturn),
        ];
        def.edges = vec![
            Edge::control("entry", "exec-out", "ret"),
            Edge::data("entry", "p-a", "add", "a"),
            Edge::data("entry", "p-b", "add", "b"),
            Edge::data("entry", "p-a", "sub", "a"),
            Edge::data("entry", "p-b", "sub", "b"),
            Edge::data("add", "result", "ret", "r-sum"),
            Edge::data("sub", "result", "ret", "r-diff"),
        ];

        let graph = GraphBuilder::new()
            .function(def)
            .node(Node::new("start", NodeKind::Start))
            .node(
                Node::new("call", NodeKind::CallFunction)
                    .with_function("fn-sd")
                    .with_inline("p-a", "7")
                    .with_inline("p-b", "3"),
            )
            .node(Node::new("out-sum", NodeKind::Output))
            .node(Node::new("out-diff", NodeKind::Output))
            .flow("start", "exec-out", "call")
            .flow("call", "exec-out", "out-sum")
            .flow("out-sum", "exec-out", "out-diff")
            .wire("call", "r-sum", "out-sum", "value")
            .wire("call", "r-diff", "out-diff", "value")
            .build();

        assert_eq!(run_graph(&graph).await, ["10", "4"]);
    }

    #[tokio::test]
    async fn test_array_nodes_run() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("create", NodeKind::ArrayCreate).with_variable("stack"))
            .node(Node::new("push", NodeKind::ArrayPush).with_variable("stack").with_inline("value", "4"))
            .node(Node::new("put", NodeKind::ArraySet).with_variable("stack").with_inline("index", "2").with_inline("value", "9"))
            .node(Node::new("read", NodeKind::ArrayGet).with_variable("stack").with_inline("index", "2"))
            .node(Node::new("show", NodeKind::Output))
            .node(Node::new("pop", NodeKind::ArrayPop).with_variable("stack"))
            .node(Node::new("popped", NodeKind::Output))
            .node(Node::new("len", NodeKind::ArrayLength).with_variable("stack"))
            .node(Node::new("size", NodeKind::Output))
            .flow("start", "exec-out", "create")
            .flow("create", "exec-out", "push")
            .flow("push", "exec-out", "put")
            .flow("put", "exec-out", "show")
            .flow("show", "exec-out", "pop")
            .flow("pop", "exec-out", "popped")
            .flow("popped", "exec-out", "size")
            .wire("read", "value", "show", "value")
            .wire("pop", "value", "popped", "value")
            .wire("len", "value", "size", "value")
            .build();

        assert_eq!(run_graph(&graph).await, ["9", "9", "2"]);
    }

    #[tokio::test]
    async fn test_input_node_reads_a_number() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("ask", NodeKind::Input).with_variable("age").with_prompt("Age?"))
            .node(Node::new("next", NodeKind::Add).with_inline("b", "1"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "ask")
            .flow("ask", "exec-out", "out")
            .wire("ask", "out-value", "next", "a")
            .wire("next", "result", "out", "value")
            .build();

        let (outcome, recorder) = run_code(&compile(&graph).code, &["41"]).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            recorder.events(),
            [
                RunEvent::Prompt {
                    message: "Age?".to_string()
                },
                RunEvent::Log {
                    text: "42".to_string()
                },
                RunEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_random_node_stays_within_bounds() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(
                Node::new("loop", NodeKind::For)
                    .with_inline("from", "0")
                    .with_inline("to", "20")
                    .with_inline("step", "1"),
            )
            .node(Node::new("dice", NodeKind::Random).with_inline("min", "1").with_inline("max", "6"))
            .node(Node::new("roll", NodeKind::Output))
            .flow("start", "exec-out", "loop")
            .flow("loop", "body", "roll")
            .wire("dice", "value", "roll", "value")
            .build();

        let rolls = run_graph(&graph).await;
        assert_eq!(rolls.len(), 20);
        for roll in rolls {
            let value: u32 = roll.parse().expect("roll is an integer");
            assert!((1..=6).contains(&value), "{value}");
        }
    }

    #[tokio::test]
    async fn test_circular_marker_still_runs() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("add-1", NodeKind::Add))
            .node(Node::new("add-2", NodeKind::Add))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "out")
            .wire("add-2", "result", "add-1", "a")
            .wire("add-1", "result", "add-2", "a")
            .wire("add-1", "result", "out", "value")
            .build();

        let result = compile(&graph);
        assert!(result.code.contains(CIRCULAR_MARKER));
        assert_eq!(result.errors.len(), 1);

        let (outcome, recorder) = run_code(&result.code, &[]).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(recorder.logs(), ["NaN"]);
    }

    #[tokio::test]
    async fn test_instrumented_loop_reports_every_iteration() {
        let code = compile_instrumented(&counting_loop()).code;
        let (outcome, recorder) = run_code(&code, &[]).await;
        assert_eq!(outcome, RunOutcome::Completed);

        let mut expected = vec!["loop"];
        for _ in 0..5 {
            expected.extend(["loop", "print-i"]);
        }
        expected.push("finish");
        assert_eq!(recorder.visited_nodes(), expected);

        let indices: Vec<_> = recorder
            .events()
            .into_iter()
            .filter_map(|event| match event {
                RunEvent::VarUpdate { name, value } if name == "i" => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(indices, (0..5).map(serde_json::Value::from).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_canonical_json_graph_runs() {
        let graph = Graph::from_json(CANONICAL_GRAPH_JSON).expect("Failed to load graph");
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.node("done").map(|n| &n.kind), Some(&NodeKind::End));

        let reloaded =
            Graph::from_json(&graph.to_json().expect("serialize")).expect("reload");
        assert_eq!(reloaded, graph);

        assert_eq!(run_graph(&graph).await, ["hello"]);
    }

    #[tokio::test]
    async fn test_editor_flow_converts_and_runs() {
        let graph = EditorFlow::from_json(EDITOR_FLOW_JSON)
            .and_then(|flow| flow.into_graph())
            .expect("Failed to convert editor flow");

        assert_eq!(
            graph.node("call").map(|n| &n.kind),
            Some(&NodeKind::CallFunction)
        );
        assert_eq!(
            graph.node("note").map(|n| &n.kind),
            Some(&NodeKind::Comment)
        );

        let first = &graph.edges[0];
        assert_eq!(first.id, "e1");
        assert_eq!(first.kind, EdgeKind::Control);

        let result_edge = graph
            .edges
            .iter()
            .find(|edge| edge.source_socket == "r-y")
            .expect("missing return edge");
        assert_eq!(result_edge.kind, EdgeKind::Data);
        assert_eq!(result_edge.data_type, Some(DataType::Number));
        assert_eq!(result_edge.id, "e-call-r-y-o-value");

        let function = graph.function("f1").expect("missing function");
        let param_edge = function
            .edges
            .iter()
            .find(|edge| edge.source_socket == "p-x")
            .expect("missing param edge");
        assert_eq!(param_edge.kind, EdgeKind::Data);
        assert_eq!(function.params[0].data_type, DataType::Number);

        assert_eq!(run_graph(&graph).await, ["22"]);
    }

    #[test]
    fn test_editor_flow_rejects_dangling_edges() {
        let json = r#"{
          "nodes": [{ "id": "s", "type": "start" }],
          "edges": [{ "source": "s", "sourceHandle": "exec-out", "target": "ghost", "targetHandle": "exec-in" }]
        }"#;
        let error = EditorFlow::from_json(json)
            .and_then(|flow| flow.into_graph())
            .expect_err("must fail");
        assert!(matches!(error, GraphConversionError::ValidationError(_)));
        assert!(error.to_string().contains("ghost"));

        let duplicate = r#"{
          "nodes": [{ "id": "s", "type": "start" }, { "id": "s", "type": "end" }]
        }"#;
        assert!(matches!(
            EditorFlow::from_json(duplicate).and_then(|flow| flow.into_graph()),
            Err(GraphConversionError::ValidationError(_))
        ));

        assert!(matches!(
            Graph::from_json("{ not json"),
            Err(GraphConversionError::JsonParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_start_stub_runs_silently() {
        let graph = GraphBuilder::new()
            .node(Node::new("out", NodeKind::Output).with_inline("value", "1"))
            .build();
        let result = compile(&graph);
        assert!(result.has_errors());

        let (outcome, recorder) = run_code(&result.code, &[]).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(recorder.events(), [RunEvent::Done]);
    }

    #[tokio::test]
    async fn test_data_chain_at_the_depth_limit_runs() {
        let logs = run_graph(&add_chain(MAX_EXPRESSION_DEPTH)).await;
        assert_eq!(logs, [MAX_EXPRESSION_DEPTH.to_string()]);
    }

    #[tokio::test]
    async fn test_truncated_data_chain_still_runs() {
        let result = compile(&add_chain(1_000));
        assert!(result.has_errors());

        let (outcome, recorder) = run_code(&result.code, &[]).await;
        assert_eq!(outcome, RunOutcome::Completed, "{:?}", recorder.errors());
        assert_eq!(recorder.logs(), ["NaN"]);
    }

    #[tokio::test]
    async fn test_long_statement_chain_runs() {
        let logs = run_graph(&output_chain(3_000)).await;
        assert_eq!(logs.len(), 3_000);
        assert!(logs.iter().all(|line| line == "1"));
    }

    #[tokio::test]
    async fn test_variable_named_like_a_function_runs() {
        let mut def = FunctionDef::new("fn-total", "total");
        def.returns = vec![FunctionPort::new("r-value", "value", DataType::Number)];
        def.nodes = vec![
            Node::new("entry", NodeKind::FunctionEntry),
            Node::new("ret", NodeKind::FunctionReturn).with_inline("r-value", "40"),
        ];
        def.edges = vec![Edge::control("entry", "exec-out", "ret")];

        let graph = GraphBuilder::new()
            .function(def)
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("set", NodeKind::Set).with_variable("total").with_inline("value", "2"))
            .node(Node::new("call", NodeKind::CallFunction).with_function("fn-total"))
            .node(Node::new("get", NodeKind::Get).with_variable("total"))
            .node(Node::new("sum", NodeKind::Add))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "set")
            .flow("set", "exec-out", "call")
            .flow("call", "exec-out", "out")
            .wire("call", "r-value", "sum", "a")
            .wire("get", "value", "sum", "b")
            .wire("sum", "result", "out", "value")
            .build();

        assert_eq!(run_graph(&graph).await, ["42"]);
    }
}
