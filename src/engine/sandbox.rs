//! The sandbox side of a run: parses the source, runs it through an
//! [`Interpreter`] whose only view of the world is a [`SandboxBridge`], and
//! reports the outcome as events.

use super::events::RunEvent;
use crate::ast::Value;
use crate::error::RuntimeError;
use crate::interpreter::{Bridge, Interpreter, InterpreterOptions};
use crate::parser;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, instrument};

/// Host-to-sandbox signal that authorizes the next statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Resume;

/// The injected bridge: one outgoing event channel plus two distinct reply
/// channels, one for step authorizations and one for input values.
pub(super) struct SandboxBridge {
    events: mpsc::UnboundedSender<RunEvent>,
    resume: Mutex<mpsc::UnboundedReceiver<Resume>>,
    input: Mutex<mpsc::UnboundedReceiver<String>>,
    cancelled: Arc<AtomicBool>,
}

impl SandboxBridge {
    pub(super) fn new(
        events: mpsc::UnboundedSender<RunEvent>,
        resume: mpsc::UnboundedReceiver<Resume>,
        input: mpsc::UnboundedReceiver<String>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            events,
            resume: Mutex::new(resume),
            input: Mutex::new(input),
            cancelled,
        }
    }

    fn post(&self, event: RunEvent) -> Result<(), RuntimeError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(RuntimeError::Disconnected);
        }
        self.events
            .send(event)
            .map_err(|_| RuntimeError::Disconnected)
    }
}

#[async_trait]
impl Bridge for SandboxBridge {
    fn log(&self, text: String) -> Result<(), RuntimeError> {
        self.post(RunEvent::Log { text })
    }

    async fn prompt(&self, message: String) -> Result<String, RuntimeError> {
        self.post(RunEvent::Prompt { message })?;
        self.input
            .lock()
            .await
            .recv()
            .await
            .ok_or(RuntimeError::Disconnected)
    }

    async fn node_enter(&self, node_id: String) -> Result<(), RuntimeError> {
        self.post(RunEvent::NodeEnter { node_id })?;
        self.resume
            .lock()
            .await
            .recv()
            .await
            .map(|Resume| ())
            .ok_or(RuntimeError::Disconnected)
    }

    fn var_update(&self, name: String, value: Value) -> Result<(), RuntimeError> {
        self.post(RunEvent::VarUpdate {
            name,
            value: value.to_json(),
        })
    }
}

/// Runs `source` to completion. Any error is reported as an `error` event and
/// always followed by `done`; a disconnected host gets nothing.
#[instrument(skip_all, fields(bytes = source.len()))]
pub(super) async fn run(source: String, bridge: SandboxBridge, options: InterpreterOptions) {
    let events = bridge.events.clone();
    let cancelled = Arc::clone(&bridge.cancelled);

    let result = match parser::parse(&source) {
        Ok(program) => {
            debug!(statements = program.body.len(), "program loaded");
            let mut interpreter = Interpreter::new(bridge, options);
            interpreter.run(&program).await
        }
        Err(error) => Err(error.into()),
    };

    if cancelled.load(Ordering::SeqCst) {
        return;
    }
    match result {
        Ok(()) => debug!("program finished"),
        Err(RuntimeError::Disconnected) => return,
        Err(error) => {
            debug!(%error, "program failed");
            let _ = events.send(RunEvent::Error {
                text: error.to_string(),
            });
        }
    }
    let _ = events.send(RunEvent::Done);
}
