use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use flowscript::prelude::*;
use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// The on-disk format of the graph file.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum GraphFormat {
    /// The canonical graph JSON (`kind`, `sourceSocket`, ...).
    #[default]
    Canonical,
    /// The editor's export (`type`, `sourceHandle`, ...).
    Editor,
}

/// Compile visual flow graphs and run the generated programs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the generated code and any diagnostics
    Compile {
        /// Path to the graph JSON file
        graph_path: String,

        #[arg(short, long, value_enum, default_value_t)]
        format: GraphFormat,

        /// Inject node and variable notifications
        #[arg(short, long)]
        instrument: bool,
    },
    /// Compile a graph and run it, reading prompts from stdin
    Run {
        /// Path to the graph JSON file
        graph_path: String,

        #[arg(short, long, value_enum, default_value_t)]
        format: GraphFormat,

        /// Inject node and variable notifications
        #[arg(short, long)]
        instrument: bool,

        /// Milliseconds per step; 0 runs freely, a negative value waits for Enter
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        step_delay: i64,

        /// Print the event stream as JSON lines instead of plain output
        #[arg(long)]
        events: bool,

        /// Seed for Math.random
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {
        Command::Compile {
            graph_path,
            format,
            instrument,
        } => {
            let graph = load_graph(&graph_path, format);
            let result = compile(&graph, instrument);
            println!("{}", result.code);
        }
        Command::Run {
            graph_path,
            format,
            instrument,
            step_delay,
            events,
            seed,
        } => {
            let graph = load_graph(&graph_path, format);
            let result = compile(&graph, instrument);

            let mut options =
                RunOptions::default().with_step_mode(StepMode::from_delay_ms(step_delay));
            options.seed = seed;

            let outcome = run(result.code, options, events).await;
            if outcome != RunOutcome::Completed {
                std::process::exit(1);
            }
        }
    }
}

fn load_graph(path: &str, format: GraphFormat) -> Graph {
    let json = fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read graph file '{}': {}", path, e))
    });

    let graph = match format {
        GraphFormat::Canonical => Graph::from_json(&json),
        GraphFormat::Editor => EditorFlow::from_json(&json).and_then(|flow| flow.into_graph()),
    };
    graph.unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e)))
}

fn compile(graph: &Graph, instrument: bool) -> CompileResult {
    let compile_start = Instant::now();
    let result = Compiler::builder(graph)
        .with_instrumentation(instrument)
        .build()
        .compile();
    eprintln!("Compiled in {:?}", compile_start.elapsed());

    for error in &result.errors {
        eprintln!("warning: {}", error);
    }
    if result
        .diagnostics
        .iter()
        .any(|d| matches!(d, CompileDiagnostic::MissingEntry))
    {
        exit_with_error("The graph has no start node");
    }
    result
}

async fn run(code: String, options: RunOptions, events: bool) -> RunOutcome {
    let manual = options.step_mode == StepMode::Manual;
    let mut executor = Executor::new();
    let mut states = executor.subscribe();

    let handle = executor
        .start(code, Arc::new(Console { events }), options)
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    let finished = handle.finished();
    tokio::pin!(finished);

    loop {
        tokio::select! {
            outcome = &mut finished => return outcome,
            changed = states.changed() => {
                if changed.is_err() {
                    return RunOutcome::Cancelled;
                }
                let state = *states.borrow_and_update();
                if manual && state == RunState::SuspendedOnStep {
                    eprint!("[step] press Enter to continue");
                    let _ = io::stderr().flush();
                    read_line().await;
                    executor.advance_one_step();
                }
            }
        }
    }
}

/// Prints a run to the terminal.
struct Console {
    events: bool,
}

impl Console {
    fn emit(&self, event: RunEvent) {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("Failed to encode event: {}", e),
        }
    }
}

#[async_trait]
impl ExecutionCallbacks for Console {
    fn on_log(&self, text: &str) {
        if self.events {
            self.emit(RunEvent::Log {
                text: text.to_string(),
            });
        } else {
            println!("{}", text);
        }
    }

    async fn on_prompt(&self, message: &str) -> Option<String> {
        if self.events {
            self.emit(RunEvent::Prompt {
                message: message.to_string(),
            });
        } else {
            print!("{} ", message);
            let _ = io::stdout().flush();
        }
        read_line().await
    }

    fn on_error(&self, text: &str) {
        if self.events {
            self.emit(RunEvent::Error {
                text: text.to_string(),
            });
        } else {
            eprintln!("{}", text);
        }
    }

    fn on_complete(&self) {
        if self.events {
            self.emit(RunEvent::Done);
        }
    }

    fn on_node_enter(&self, node_id: &str) {
        if self.events {
            self.emit(RunEvent::NodeEnter {
                node_id: node_id.to_string(),
            });
        }
    }

    fn on_var_update(&self, name: &str, value: &serde_json::Value) {
        if self.events {
            self.emit(RunEvent::VarUpdate {
                name: name.to_string(),
                value: value.clone(),
            });
        }
    }
}

/// Reads one line from stdin without blocking the runtime.
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    })
    .await
    .ok()
    .flatten()
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
