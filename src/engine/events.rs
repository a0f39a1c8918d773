use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One message of the sandbox-to-host event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RunEvent {
    Log {
        text: String,
    },
    Error {
        text: String,
    },
    /// Awaits a string reply from the host.
    Prompt {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    NodeEnter {
        node_id: String,
    },
    VarUpdate {
        name: String,
        value: serde_json::Value,
    },
    Done,
}

/// Host-side receiver of a run's events.
///
/// Callbacks are invoked in stream order from a single task. After
/// [`super::Executor::cancel`] no callback fires again for that run.
#[async_trait]
pub trait ExecutionCallbacks: Send + Sync + 'static {
    fn on_log(&self, text: &str);

    /// Answers a `prompt`. `None` answers with an empty string.
    async fn on_prompt(&self, message: &str) -> Option<String>;

    fn on_error(&self, text: &str);

    /// Fires exactly once per run that was not cancelled, after any error.
    fn on_complete(&self);

    fn on_node_enter(&self, _node_id: &str) {}

    fn on_var_update(&self, _name: &str, _value: &serde_json::Value) {}
}

#[derive(Debug, Default)]
struct Recording {
    events: Vec<RunEvent>,
    answers: VecDeque<String>,
}

/// [`ExecutionCallbacks`] that records the event stream, answers prompts
/// from a scripted queue and optionally forwards every event over a channel.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    recording: Arc<Mutex<Recording>>,
    forward: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues answers for upcoming prompts, consumed in order.
    pub fn with_answers<I, S>(self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Also sends every event to the returned receiver as it is recorded.
    pub fn with_forwarding(mut self) -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.forward = Some(tx);
        (self, rx)
    }

    pub fn push_answer(&self, answer: impl Into<String>) {
        self.lock().answers.push_back(answer.into());
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.lock().events.clone()
    }

    /// Text of every `log` event so far.
    pub fn logs(&self) -> Vec<String> {
        self.collect(|event| match event {
            RunEvent::Log { text } => Some(text.clone()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<String> {
        self.collect(|event| match event {
            RunEvent::Error { text } => Some(text.clone()),
            _ => None,
        })
    }

    pub fn visited_nodes(&self) -> Vec<String> {
        self.collect(|event| match event {
            RunEvent::NodeEnter { node_id } => Some(node_id.clone()),
            _ => None,
        })
    }

    pub fn is_done(&self) -> bool {
        self.lock().events.contains(&RunEvent::Done)
    }

    fn collect<T>(&self, pick: impl Fn(&RunEvent) -> Option<T>) -> Vec<T> {
        self.lock().events.iter().filter_map(pick).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock()
    }

    fn record(&self, event: RunEvent) {
        if let Some(forward) = &self.forward {
            // A dropped receiver only stops forwarding.
            let _ = forward.send(event.clone());
        }
        self.lock().events.push(event);
    }
}

#[async_trait]
impl ExecutionCallbacks for EventRecorder {
    fn on_log(&self, text: &str) {
        self.record(RunEvent::Log {
            text: text.to_string(),
        });
    }

    async fn on_prompt(&self, message: &str) -> Option<String> {
        self.record(RunEvent::Prompt {
            message: message.to_string(),
        });
        self.lock().answers.pop_front()
    }

    fn on_error(&self, text: &str) {
        self.record(RunEvent::Error {
            text: text.to_string(),
        });
    }

    fn on_complete(&self) {
        self.record(RunEvent::Done);
    }

    fn on_node_enter(&self, node_id: &str) {
        self.record(RunEvent::NodeEnter {
            node_id: node_id.to_string(),
        });
    }

    fn on_var_update(&self, name: &str, value: &serde_json::Value) {
        self.record(RunEvent::VarUpdate {
            name: name.to_string(),
            value: value.clone(),
        });
    }
}
