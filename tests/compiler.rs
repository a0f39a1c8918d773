//! Compiler output tests: exact generated code and diagnostics.
mod common;
use common::*;
use flowscript::compiler::{
    CIRCULAR_MARKER, DEPTH_MARKER, MAX_EXPRESSION_DEPTH, MAX_NESTING_DEPTH, sanitize_identifier,
};
use flowscript::prelude::*;

#[cfg(test)]
mod compiler_tests {
    use super::*;

    #[test]
    fn test_scenario_a_compiles_to_sequential_sets() {
        let result = compile(&scenario_a());
        assert!(result.errors.is_empty());
        assert_eq!(
            result.code,
            "let x = 5;\nlet y = 3;\nconsole.log((x + y));"
        );
    }

    #[test]
    fn test_scenario_b_always_emits_both_arms() {
        let result = compile(&scenario_b("10"));
        assert_eq!(
            result.code,
            [
                "let a = 10;",
                "if ((a > 5)) {",
                "  console.log(\"big\");",
                "} else {",
                "  console.log(\"small\");",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_scenario_c_emits_function_before_main() {
        let result = compile(&scenario_c());
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(
            result.code,
            [
                "async function double(n) {",
                "  return (n * 2);",
                "}",
                "",
                "let __ret_0 = await double(21);",
                "console.log(__ret_0);",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_scenario_d_array_statements() {
        let result = compile(&scenario_d());
        assert_eq!(
            result.code,
            "let arr = [];\narr.push(1);\narr.push(2);\narr.push(3);\nconsole.log(arr.length);"
        );
    }

    #[test]
    fn test_counting_loop_declares_its_variable() {
        let result = compile(&counting_loop());
        assert_eq!(
            result.code,
            [
                "for (let i = 0; i < 5; i += 1) {",
                "  console.log(i);",
                "}",
                "console.log(\"done\");",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_loop_with_break_and_continue() {
        let result = compile(&break_continue_loop());
        assert_eq!(
            result.code,
            [
                "let n = 0;",
                "while ((n < 10)) {",
                "  n = (n + 1);",
                "  if ((n === 3)) {",
                "    continue;",
                "  } else {",
                "    if ((n === 6)) {",
                "      break;",
                "    } else {",
                "      console.log(n);",
                "    }",
                "  }",
                "}",
                "console.log(\"end\");",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_missing_start_returns_stub() {
        let graph = GraphBuilder::new()
            .node(Node::new("out", NodeKind::Output).with_inline("value", "1"))
            .build();
        let result = compile(&graph);

        assert_eq!(result.code, "// Error: No start node found");
        assert_eq!(result.errors, vec!["No start node found".to_string()]);
        assert_eq!(result.diagnostics, vec![CompileDiagnostic::MissingEntry]);
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let mut other = double_function();
        other.id = "fn-another".to_string();
        other.name = "another".to_string();
        let graph = GraphBuilder::new()
            .function(other)
            .function(double_function())
            .node(Node::new("start", NodeKind::Start))
            .build();

        let first = compile(&graph);
        let second = compile(&graph);
        assert_eq!(first.code, second.code);

        let another = first.code.find("async function another").expect("missing another");
        let double = first.code.find("async function double").expect("missing double");
        assert!(another < double, "functions must be ordered by id");
    }

    #[test]
    fn test_variable_is_declared_once() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("s1", NodeKind::Set).with_variable("x").with_inline("value", "1"))
            .node(Node::new("s2", NodeKind::Set).with_variable("x").with_inline("value", "2"))
            .flow("start", "exec-out", "s1")
            .flow("s1", "exec-out", "s2")
            .build();

        let result = compile(&graph);
        assert_eq!(result.code, "let x = 1;\nx = 2;");
        assert_eq!(result.code.matches("let x").count(), 1);
    }

    #[test]
    fn test_unconnected_inputs_use_fallbacks() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("out", NodeKind::Output))
            .node(Node::new("if", NodeKind::If))
            .node(Node::new("cat", NodeKind::Concat).with_inline("a", "hi"))
            .node(Node::new("print", NodeKind::Output))
            .flow("start", "exec-out", "out")
            .flow("out", "exec-out", "if")
            .flow("if", "true", "print")
            .wire("cat", "result", "print", "value")
            .build();

        let result = compile(&graph);
        assert_eq!(
            result.code,
            [
                "console.log(0);",
                "if (false) {",
                "  console.log((\"hi\" + \"\"));",
                "} else {",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_circular_dependency_degrades_to_marker() {
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
        assert_eq!(
            result.code,
            format!("console.log((({CIRCULAR_MARKER} + 0) + 0));")
        );
        assert_eq!(
            result.diagnostics,
            vec![CompileDiagnostic::CircularDependency {
                node_id: "add-1".to_string(),
                socket_id: "result".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_data_edge_keeps_last_and_reports() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("get-x", NodeKind::Get).with_variable("x"))
            .node(Node::new("get-y", NodeKind::Get).with_variable("y"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "out")
            .wire("get-x", "value", "out", "value")
            .wire("get-y", "value", "out", "value")
            .build();

        let result = compile(&graph);
        assert_eq!(result.code, "console.log(y);");
        assert_eq!(
            result.diagnostics,
            vec![CompileDiagnostic::DuplicateDataEdge {
                node_id: "out".to_string(),
                socket_id: "value".to_string(),
            }]
        );
    }

    #[test]
    fn test_call_to_deleted_function_leaves_placeholder() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("call", NodeKind::CallFunction).with_function("gone"))
            .node(Node::new("out", NodeKind::Output).with_inline("value", "1"))
            .flow("start", "exec-out", "call")
            .flow("call", "exec-out", "out")
            .build();

        let result = compile(&graph);
        assert_eq!(
            result.code,
            "// Error: function 'gone' not found\nconsole.log(1);"
        );
        assert!(matches!(
            result.diagnostics.as_slice(),
            [CompileDiagnostic::UnknownFunction { node_id, function_id }]
                if node_id == "call" && function_id == "gone"
        ));
    }

    #[test]
    fn test_instrumentation_notifies_nodes_and_variables() {
        let result = compile_instrumented(&scenario_a());
        assert_eq!(
            result.code,
            [
                "await __onNode(\"set-x\");",
                "let x = 5;",
                "__onVar(\"x\", x);",
                "await __onNode(\"set-y\");",
                "let y = 3;",
                "__onVar(\"y\", y);",
                "await __onNode(\"out\");",
                "console.log((x + y));",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_instrumented_loop_notifies_at_body_top() {
        let result = compile_instrumented(&counting_loop());
        assert_eq!(
            result.code,
            [
                "await __onNode(\"loop\");",
                "for (let i = 0; i < 5; i += 1) {",
                "  await __onNode(\"loop\");",
                "  __onVar(\"i\", i);",
                "  await __onNode(\"print-i\");",
                "  console.log(i);",
                "}",
                "await __onNode(\"finish\");",
                "console.log(\"done\");",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_identifiers_are_sanitized() {
        assert_eq!(sanitize_identifier("my var"), "my_var");
        assert_eq!(sanitize_identifier("1st"), "_1st");
        assert_eq!(sanitize_identifier("let"), "_let");
        assert_eq!(sanitize_identifier("console"), "_console");
        assert_eq!(sanitize_identifier("total$"), "total$");
        assert_eq!(sanitize_identifier(""), "_");

        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(
                Node::new("set", NodeKind::Set)
                    .with_variable("my var")
                    .with_inline("value", "1"),
            )
            .flow("start", "exec-out", "set")
            .build();
        assert_eq!(compile(&graph).code, "let my_var = 1;");
    }

    #[test]
    fn test_function_names_are_deduplicated() {
        let mut first = FunctionDef::new("fn-a", "calc");
        first.nodes.push(Node::new("entry", NodeKind::FunctionEntry));
        let mut second = FunctionDef::new("fn-b", "calc");
        second.nodes.push(Node::new("entry", NodeKind::FunctionEntry));

        let graph = GraphBuilder::new()
            .function(first)
            .function(second)
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("call", NodeKind::CallFunction).with_function("fn-b"))
            .flow("start", "exec-out", "call")
            .build();

        let result = compile(&graph);
        assert_eq!(
            result.code,
            "async function calc() {\n}\n\nasync function calc_2() {\n}\n\nawait calc_2();"
        );
    }

    #[test]
    fn test_multiple_returns_become_a_record() {
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

        let result = compile(&graph);
        assert_eq!(
            result.code,
            [
                "async function sumDiff(a, b) {",
                "  return { sum: (a + b), diff: (a - b) };",
                "}",
                "",
                "let __ret_0 = await sumDiff(7, 3);",
                "console.log(__ret_0.sum);",
                "console.log(__ret_0.diff);",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_unset_return_values_use_type_fallbacks() {
        let mut def = FunctionDef::new("fn-flags", "flags");
        def.returns = vec![
            FunctionPort::new("r-ok", "ok", DataType::Boolean),
            FunctionPort::new("r-name", "name", DataType::String),
            FunctionPort::new("r-items", "items", DataType::Array),
        ];
        def.nodes = vec![
            Node::new("entry", NodeKind::FunctionEntry),
            Node::new("ret", NodeKind::FunctionReturn),
        ];
        def.edges = vec![Edge::control("entry", "exec-out", "ret")];

        let graph = GraphBuilder::new()
            .function(def)
            .node(Node::new("start", NodeKind::Start))
            .build();

        let result = compile(&graph);
        assert_eq!(
            result.code,
            "async function flags() {\n  return { ok: false, name: \"\", items: [] };\n}"
        );
    }

    #[test]
    fn test_function_without_entry_is_reported() {
        let graph = GraphBuilder::new()
            .function(FunctionDef::new("fn-empty", "empty"))
            .node(Node::new("start", NodeKind::Start))
            .build();

        let result = compile(&graph);
        assert_eq!(result.code, "async function empty() {\n}");
        assert_eq!(
            result.errors,
            vec!["Function 'empty' has no entry node".to_string()]
        );
    }

    #[test]
    fn test_array_pop_binds_a_temporary() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("create", NodeKind::ArrayCreate).with_variable("stack"))
            .node(Node::new("push", NodeKind::ArrayPush).with_variable("stack").with_inline("value", "4"))
            .node(Node::new("pop", NodeKind::ArrayPop).with_variable("stack"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "create")
            .flow("create", "exec-out", "push")
            .flow("push", "exec-out", "pop")
            .flow("pop", "exec-out", "out")
            .wire("pop", "value", "out", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            "let stack = [];\nstack.push(4);\nlet __pop_0 = stack.pop();\nconsole.log(__pop_0);"
        );
    }

    #[test]
    fn test_array_get_and_set() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("create", NodeKind::ArrayCreate))
            .node(Node::new("put", NodeKind::ArraySet).with_inline("index", "2").with_inline("value", "9"))
            .node(Node::new("read", NodeKind::ArrayGet).with_inline("index", "2"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "create")
            .flow("create", "exec-out", "put")
            .flow("put", "exec-out", "out")
            .wire("read", "value", "out", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            "let _arr = [];\n_arr[2] = 9;\nconsole.log(_arr[2]);"
        );
    }

    #[test]
    fn test_input_uses_prompt_attribute() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("ask", NodeKind::Input).with_variable("age").with_prompt("Age?"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "ask")
            .flow("ask", "exec-out", "out")
            .wire("ask", "out-value", "out", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            "let age = parseFloat(await prompt(\"Age?\"));\nconsole.log(age);"
        );
    }

    #[test]
    fn test_random_and_not_expressions() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("dice", NodeKind::Random).with_inline("min", "1").with_inline("max", "6"))
            .node(Node::new("not", NodeKind::Not))
            .node(Node::new("roll", NodeKind::Output))
            .node(Node::new("flag", NodeKind::Output))
            .flow("start", "exec-out", "roll")
            .flow("roll", "exec-out", "flag")
            .wire("dice", "value", "roll", "value")
            .wire("not", "result", "flag", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            "console.log((Math.floor(Math.random() * (6 - 1 + 1)) + 1));\nconsole.log((!false));"
        );
    }

    #[test]
    fn test_end_stops_the_path() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("end", NodeKind::End))
            .node(Node::new("out", NodeKind::Output).with_inline("value", "1"))
            .flow("start", "exec-out", "end")
            .flow("end", "exec-out", "out")
            .build();

        assert_eq!(compile(&graph).code, "");
    }

    #[test]
    fn test_unknown_kinds_pass_control_through() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("note", NodeKind::Comment))
            .node(Node::new("mystery", "teleport"))
            .node(Node::new("out", NodeKind::Output).with_inline("value", "1"))
            .flow("start", "exec-out", "note")
            .flow("note", "exec-out", "mystery")
            .flow("mystery", "exec-out", "out")
            .build();

        let result = compile(&graph);
        assert_eq!(result.code, "console.log(1);");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_kind_alias_maps_foreign_tags() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("out", "print").with_inline("value", "7"))
            .flow("start", "exec-out", "out")
            .build();

        let result = Compiler::builder(&graph)
            .with_kind_alias("print", NodeKind::Output)
            .build()
            .compile();
        assert_eq!(result.code, "console.log(7);");
    }

    #[test]
    fn test_return_in_main_scope_ends_silently() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("ret", NodeKind::FunctionReturn))
            .flow("start", "exec-out", "ret")
            .build();

        let result = compile(&graph);
        assert_eq!(result.code, "");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_compile_result_serializes_code_and_errors() {
        let result = compile(&Graph::default());
        let json = serde_json::to_value(&result).expect("Failed to serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "code": "// Error: No start node found",
                "errors": ["No start node found"],
            })
        );
    }

    #[test]
    fn test_long_statement_chain_compiles() {
        const LENGTH: usize = 10_000;
        let result = compile(&output_chain(LENGTH));
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.code.lines().count(), LENGTH);
        assert!(result.code.lines().all(|line| line == "console.log(1);"));
    }

    #[test]
    fn test_data_chain_at_the_depth_limit_is_kept_whole() {
        let result = compile(&add_chain(MAX_EXPRESSION_DEPTH));
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(
            result.code,
            format!(
                "console.log({}0{});",
                "(".repeat(MAX_EXPRESSION_DEPTH),
                " + 1)".repeat(MAX_EXPRESSION_DEPTH)
            )
        );
    }

    #[test]
    fn test_deep_data_chain_degrades_to_marker() {
        const DEPTH: usize = 1_000;
        let result = compile(&add_chain(DEPTH));
        assert_eq!(
            result.code,
            format!(
                "console.log({}{DEPTH_MARKER}{});",
                "(".repeat(MAX_EXPRESSION_DEPTH),
                " + 1)".repeat(MAX_EXPRESSION_DEPTH)
            )
        );
        assert_eq!(
            result.diagnostics,
            vec![CompileDiagnostic::ExpressionTooDeep {
                node_id: format!("add-{}", DEPTH - 1 - MAX_EXPRESSION_DEPTH),
            }]
        );
    }

    #[test]
    fn test_deep_control_nesting_is_reported() {
        const DEPTH: usize = 200;
        let mut builder = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .flow("start", "exec-out", "if-0");
        for i in 0..DEPTH {
            let id = format!("if-{i}");
            builder = builder
                .node(Node::new(id.as_str(), NodeKind::If))
                .flow(&id, "true", &format!("if-{}", i + 1));
        }
        builder = builder.node(Node::new(format!("if-{DEPTH}"), NodeKind::Output));

        let result = compile(&builder.build());
        assert_eq!(
            result.diagnostics,
            vec![CompileDiagnostic::NestingTooDeep {
                node_id: format!("if-{MAX_NESTING_DEPTH}"),
            }]
        );
        assert!(
            result
                .code
                .contains("// Error: control flow nested too deeply")
        );
        assert!(!result.code.contains("console.log"));
    }

    #[test]
    fn test_diamond_emits_join_in_both_arms() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("if", NodeKind::If))
            .node(Node::new("left", NodeKind::Output).with_inline("value", text("left")))
            .node(Node::new("right", NodeKind::Output).with_inline("value", text("right")))
            .node(Node::new("join", NodeKind::Output).with_inline("value", text("join")))
            .flow("start", "exec-out", "if")
            .flow("if", "true", "left")
            .flow("if", "false", "right")
            .flow("left", "exec-out", "join")
            .flow("right", "exec-out", "join")
            .build();

        assert_eq!(
            compile(&graph).code,
            [
                "if (false) {",
                "  console.log(\"left\");",
                "  console.log(\"join\");",
                "} else {",
                "  console.log(\"right\");",
                "  console.log(\"join\");",
                "}",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_control_cycle_is_not_reemitted() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("loop", NodeKind::While))
            .node(Node::new("tick", NodeKind::Output).with_inline("value", text("tick")))
            .node(Node::new("end", NodeKind::Output).with_inline("value", text("end")))
            .node(Node::new("a", NodeKind::Output).with_inline("value", text("a")))
            .node(Node::new("b", NodeKind::Output).with_inline("value", text("b")))
            .flow("start", "exec-out", "loop")
            .flow("loop", "body", "tick")
            .flow("tick", "exec-out", "loop")
            .flow("loop", "done", "end")
            .flow("end", "exec-out", "a")
            .flow("a", "exec-out", "b")
            .flow("b", "exec-out", "a")
            .build();

        assert_eq!(
            compile(&graph).code,
            [
                "while (false) {",
                "  console.log(\"tick\");",
                "}",
                "console.log(\"end\");",
                "console.log(\"a\");",
                "console.log(\"b\");",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_function_never_shadows_a_variable() {
        let mut def = FunctionDef::new("fn-total", "total");
        def.nodes = vec![
            Node::new("entry", NodeKind::FunctionEntry),
            Node::new("ret", NodeKind::FunctionReturn),
        ];
        def.edges = vec![Edge::control("entry", "exec-out", "ret")];

        let graph = GraphBuilder::new()
            .function(def)
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("set", NodeKind::Set).with_variable("total").with_inline("value", "1"))
            .node(Node::new("call", NodeKind::CallFunction).with_function("fn-total"))
            .node(Node::new("get", NodeKind::Get).with_variable("total"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "set")
            .flow("set", "exec-out", "call")
            .flow("call", "exec-out", "out")
            .wire("get", "value", "out", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            [
                "async function total_2() {",
                "  return;",
                "}",
                "",
                "let total = 1;",
                "await total_2();",
                "console.log(total);",
            ]
            .join("\n")
        );
    }

    #[test]
    fn test_temporaries_skip_bound_names() {
        let graph = GraphBuilder::new()
            .node(Node::new("start", NodeKind::Start))
            .node(Node::new("create", NodeKind::ArrayCreate).with_variable("stack"))
            .node(Node::new("push", NodeKind::ArrayPush).with_variable("stack").with_inline("value", "4"))
            .node(Node::new("pop", NodeKind::ArrayPop).with_variable("stack"))
            .node(Node::new("keep", NodeKind::Set).with_variable("__pop_0"))
            .node(Node::new("get", NodeKind::Get).with_variable("__pop_0"))
            .node(Node::new("out", NodeKind::Output))
            .flow("start", "exec-out", "create")
            .flow("create", "exec-out", "push")
            .flow("push", "exec-out", "pop")
            .flow("pop", "exec-out", "keep")
            .flow("keep", "exec-out", "out")
            .wire("pop", "value", "keep", "value")
            .wire("get", "value", "out", "value")
            .build();

        assert_eq!(
            compile(&graph).code,
            [
                "let stack = [];",
                "stack.push(4);",
                "let __pop_1 = stack.pop();",
                "let __pop_0 = __pop_1;",
                "console.log(__pop_0);",
            ]
            .join("\n")
        );
    }
}
