//! Run control for compiled programs.
//!
//! An [`Executor`] owns at most one run. A run is two tasks joined by channels:
//! the sandbox task interprets the program and can only post [`RunEvent`]s, and
//! the host task turns those events into [`ExecutionCallbacks`] calls and
//! answers prompts and step notifications. Starting a run cancels the previous
//! one; cancelling aborts both tasks and discards every pending suspension.
//!
//! Host tasks run on the caller's runtime. Sandbox tasks run on a dedicated
//! runtime whose threads have a large stack, so a deeply nested program fails
//! with an error instead of overflowing a worker.

use crate::error::ExecutionError;
use crate::interpreter::{DEFAULT_MAX_CALL_DEPTH, InterpreterOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

mod events;
mod sandbox;

pub use events::{EventRecorder, ExecutionCallbacks, RunEvent};

use sandbox::{Resume, SandboxBridge};

/// Stack size of sandbox worker threads. Parsing and interpreting recurse once
/// per nesting level of the program.
const SANDBOX_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Shared runtime that hosts every sandbox task, whichever runtime started it.
fn sandbox_runtime() -> Result<&'static Runtime, ExecutionError> {
    static RUNTIME: OnceLock<Result<Runtime, String>> = OnceLock::new();
    RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("flowscript-sandbox")
                .thread_stack_size(SANDBOX_STACK_SIZE)
                .enable_all()
                .build()
                .map_err(|error| error.to_string())
        })
        .as_ref()
        .map_err(|error| ExecutionError::SandboxRuntime(error.clone()))
}

/// How the host answers a `node-enter` notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum StepMode {
    /// Continue immediately.
    #[default]
    Instant,
    /// Continue after a host-side delay.
    Timed(Duration),
    /// Continue only on [`Executor::advance_one_step`].
    Manual,
}

impl StepMode {
    /// `0` is instant, a positive value is a delay in milliseconds and a
    /// negative value is manual stepping.
    pub fn from_delay_ms(delay: i64) -> Self {
        match delay {
            0 => StepMode::Instant,
            d if d > 0 => StepMode::Timed(Duration::from_millis(d.unsigned_abs())),
            _ => StepMode::Manual,
        }
    }

    pub fn delay_ms(&self) -> i64 {
        match self {
            StepMode::Instant => 0,
            StepMode::Timed(delay) => i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
            StepMode::Manual => -1,
        }
    }
}

impl From<i64> for StepMode {
    fn from(delay: i64) -> Self {
        StepMode::from_delay_ms(delay)
    }
}

impl From<StepMode> for i64 {
    fn from(mode: StepMode) -> Self {
        mode.delay_ms()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(rename = "stepDelay")]
    pub step_mode: StepMode,
    /// Makes `Math.random` reproducible.
    pub seed: Option<u64>,
    pub max_call_depth: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            step_mode: StepMode::Instant,
            seed: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl RunOptions {
    pub fn with_step_mode(mut self, step_mode: StepMode) -> Self {
        self.step_mode = step_mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    #[default]
    Idle,
    Loading,
    Running,
    SuspendedOnInput,
    SuspendedOnStep,
    Completed,
    Errored,
    Cancelled,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Errored | RunState::Cancelled
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Loading => "loading",
            RunState::Running => "running",
            RunState::SuspendedOnInput => "suspended-on-input",
            RunState::SuspendedOnStep => "suspended-on-step",
            RunState::Completed => "completed",
            RunState::Errored => "errored",
            RunState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Errored,
    Cancelled,
}

/// Completion handle of one run.
#[derive(Debug)]
pub struct RunHandle {
    outcome: oneshot::Receiver<RunOutcome>,
}

impl RunHandle {
    /// Resolves when the run completes, fails or is cancelled.
    pub async fn finished(self) -> RunOutcome {
        self.outcome.await.unwrap_or(RunOutcome::Cancelled)
    }
}

/// What the host task needs to drive one run.
struct HostLink {
    state: Arc<watch::Sender<RunState>>,
    cancelled: Arc<AtomicBool>,
    resume: mpsc::UnboundedSender<Resume>,
    input: mpsc::UnboundedSender<String>,
    step_mode: StepMode,
}

impl HostLink {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Publishes `next` unless the run has been cancelled in the meantime.
    fn set_state(&self, next: RunState) {
        self.state.send_if_modified(|current| {
            if self.is_cancelled() || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

struct ActiveRun {
    cancelled: Arc<AtomicBool>,
    resume: mpsc::UnboundedSender<Resume>,
    step_mode: StepMode,
    sandbox: JoinHandle<()>,
    host: JoinHandle<()>,
}

impl ActiveRun {
    fn is_finished(&self) -> bool {
        self.host.is_finished()
    }
}

/// Runs compiled programs one at a time.
pub struct Executor {
    state: Arc<watch::Sender<RunState>>,
    active: Option<ActiveRun>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            state: Arc::new(state),
            active: None,
        }
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Observes state transitions of every run started by this executor.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Starts running `code`, cancelling any run still in flight.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all, fields(step_mode = ?options.step_mode))]
    pub fn start<C: ExecutionCallbacks>(
        &mut self,
        code: impl Into<String>,
        callbacks: Arc<C>,
        options: RunOptions,
    ) -> Result<RunHandle, ExecutionError> {
        let runtime = Handle::try_current().map_err(|_| ExecutionError::NoRuntime)?;
        let sandboxes = sandbox_runtime()?;
        self.cancel();
        self.state.send_replace(RunState::Loading);

        let cancelled = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (resume_tx, resume_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let bridge = SandboxBridge::new(event_tx, resume_rx, input_rx, Arc::clone(&cancelled));
        let interpreter_options = InterpreterOptions {
            seed: options.seed,
            max_call_depth: options.max_call_depth,
        };
        let sandbox = sandboxes.spawn(sandbox::run(code.into(), bridge, interpreter_options));

        let link = HostLink {
            state: Arc::clone(&self.state),
            cancelled: Arc::clone(&cancelled),
            resume: resume_tx.clone(),
            input: input_tx,
            step_mode: options.step_mode,
        };
        let callbacks: Arc<dyn ExecutionCallbacks> = callbacks;
        let host = runtime.spawn(async move {
            let outcome = pump(event_rx, link, callbacks).await;
            let _ = outcome_tx.send(outcome);
        });

        info!("run started");
        self.active = Some(ActiveRun {
            cancelled,
            resume: resume_tx,
            step_mode: options.step_mode,
            sandbox,
            host,
        });
        Ok(RunHandle {
            outcome: outcome_rx,
        })
    }

    /// Stops the active run immediately. No further callbacks fire for it.
    pub fn cancel(&mut self) {
        let Some(run) = self.active.take() else {
            return;
        };
        let finished = run.is_finished();
        run.cancelled.store(true, Ordering::SeqCst);
        run.sandbox.abort();
        run.host.abort();
        if !finished {
            info!("run cancelled");
            self.state.send_replace(RunState::Cancelled);
        }
    }

    /// Authorizes one statement in manual step mode. Returns whether a
    /// suspended step was released; it is a no-op in any other situation.
    pub fn advance_one_step(&self) -> bool {
        let Some(run) = &self.active else {
            return false;
        };
        if run.step_mode != StepMode::Manual || self.state() != RunState::SuspendedOnStep {
            return false;
        }
        let released = self.state.send_if_modified(|current| {
            if *current != RunState::SuspendedOnStep {
                return false;
            }
            *current = RunState::Running;
            true
        });
        released && run.resume.send(Resume).is_ok()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// The host task: dispatches events to `callbacks` until the sandbox reports
/// `done` or goes away.
#[instrument(skip_all)]
async fn pump(
    mut events: mpsc::UnboundedReceiver<RunEvent>,
    link: HostLink,
    callbacks: Arc<dyn ExecutionCallbacks>,
) -> RunOutcome {
    link.set_state(RunState::Running);
    let mut errored = false;

    while let Some(event) = events.recv().await {
        if link.is_cancelled() {
            return RunOutcome::Cancelled;
        }
        match event {
            RunEvent::Log { text } => callbacks.on_log(&text),
            RunEvent::Error { text } => {
                errored = true;
                callbacks.on_error(&text);
            }
            RunEvent::Prompt { message } => {
                link.set_state(RunState::SuspendedOnInput);
                let answer = callbacks.on_prompt(&message).await.unwrap_or_default();
                if link.is_cancelled() {
                    return RunOutcome::Cancelled;
                }
                link.set_state(RunState::Running);
                if link.input.send(answer).is_err() {
                    debug!("sandbox dropped before the prompt was answered");
                }
            }
            RunEvent::NodeEnter { node_id } => {
                callbacks.on_node_enter(&node_id);
                match link.step_mode {
                    StepMode::Instant => {
                        let _ = link.resume.send(Resume);
                    }
                    StepMode::Timed(delay) => {
                        tokio::time::sleep(delay).await;
                        let _ = link.resume.send(Resume);
                    }
                    StepMode::Manual => link.set_state(RunState::SuspendedOnStep),
                }
            }
            RunEvent::VarUpdate { name, value } => callbacks.on_var_update(&name, &value),
            RunEvent::Done => return complete(&link, callbacks.as_ref(), errored),
        }
    }

    if link.is_cancelled() {
        return RunOutcome::Cancelled;
    }
    warn!("sandbox terminated without signalling completion");
    callbacks.on_error("Execution context terminated unexpectedly");
    complete(&link, callbacks.as_ref(), true)
}

fn complete(link: &HostLink, callbacks: &dyn ExecutionCallbacks, errored: bool) -> RunOutcome {
    let (state, outcome) = if errored {
        (RunState::Errored, RunOutcome::Errored)
    } else {
        (RunState::Completed, RunOutcome::Completed)
    };
    callbacks.on_complete();
    link.set_state(state);
    info!(%state, "run finished");
    outcome
}
