//! Confirmation channels
//!
//! The executor hands every gated call to a [`ConfirmationChannel`] and
//! waits for its decision. There is no timeout and no default answer; a
//! channel that cannot produce a decision returns an error, which aborts
//! the turn.

use super::PendingToolCall;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Operator answer to a pending call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Run the call
    Approve,
    /// Do not run the call
    Deny,
}

/// Request/response interface for human approval
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConfirmationChannel: Send + Sync {
    /// Show the pending call and wait for a decision
    async fn present(&self, call: &PendingToolCall) -> Result<Decision>;
}

/// Answers every request the same way (non-interactive runs)
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation(pub Decision);

#[async_trait::async_trait]
impl ConfirmationChannel for FixedConfirmation {
    async fn present(&self, _call: &PendingToolCall) -> Result<Decision> {
        Ok(self.0)
    }
}

/// Replays a fixed sequence of decisions and records what it was shown
///
/// Running out of decisions is an error, so a test never gets an implicit
/// answer.
#[derive(Debug, Default)]
pub struct ScriptedConfirmation {
    decisions: Mutex<VecDeque<Decision>>,
    presented: Mutex<Vec<PendingToolCall>>,
}

impl ScriptedConfirmation {
    /// Channel that answers with `decisions` in order
    #[must_use]
    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().collect()),
            presented: Mutex::new(Vec::new()),
        }
    }

    /// Calls presented so far
    #[must_use]
    pub fn presented(&self) -> Vec<PendingToolCall> {
        self.presented
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl ConfirmationChannel for ScriptedConfirmation {
    async fn present(&self, call: &PendingToolCall) -> Result<Decision> {
        self.presented
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call.clone());
        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| Error::Aborted("no scripted decision left".to_string()))
    }
}

/// Hands pending calls to another task and waits for it to resolve them
///
/// Requests are announced on the receiver returned by
/// [`ConfirmationBroker::new`]; the other side answers with
/// [`ConfirmationBroker::resolve`]. A request whose turn is cancelled is
/// withdrawn.
pub struct ConfirmationBroker {
    waiting: Mutex<HashMap<Uuid, Waiting>>,
    notify: mpsc::UnboundedSender<PendingToolCall>,
}

struct Waiting {
    call: PendingToolCall,
    resolver: oneshot::Sender<Decision>,
}

impl ConfirmationBroker {
    /// Broker plus the stream of calls awaiting a decision
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingToolCall>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let broker = Self {
            waiting: Mutex::new(HashMap::new()),
            notify,
        };
        (broker, rx)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Waiting>> {
        self.waiting.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Calls currently waiting
    pub async fn pending(&self) -> Vec<PendingToolCall> {
        self.lock().values().map(|w| w.call.clone()).collect()
    }

    /// Answer a waiting call; returns `false` if no such call is waiting
    pub async fn resolve(&self, id: Uuid, decision: Decision) -> bool {
        match self.lock().remove(&id) {
            Some(waiting) => waiting.resolver.send(decision).is_ok(),
            None => false,
        }
    }
}

/// Removes a request from the broker when its `present` call ends, however
/// it ends
struct Registration<'a> {
    broker: &'a ConfirmationBroker,
    id: Uuid,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.broker.lock().remove(&self.id);
    }
}

#[async_trait::async_trait]
impl ConfirmationChannel for ConfirmationBroker {
    async fn present(&self, call: &PendingToolCall) -> Result<Decision> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(
            call.id,
            Waiting {
                call: call.clone(),
                resolver: tx,
            },
        );
        let _registration = Registration {
            broker: self,
            id: call.id,
        };

        if self.notify.send(call.clone()).is_err() {
            return Err(Error::Aborted("confirmation channel closed".to_string()));
        }

        rx.await
            .map_err(|_| Error::Aborted("confirmation request dropped".to_string()))
    }
}
