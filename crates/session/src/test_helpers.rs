//! Shared test doubles for session tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use parley_core::error::TransportError;
use parley_core::payload::Conversation;
use parley_core::transport::Transport;
use tokio::sync::Notify;

/// A transport that returns a sequence of scripted results and records
/// every payload it receives.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedTransport {
    results: Mutex<VecDeque<Result<String, TransportError>>>,
    payloads: Mutex<Vec<Conversation>>,
}

impl ScriptedTransport {
    pub fn new(results: Vec<Result<String, TransportError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Create a transport that answers with each reply in turn.
    pub fn replies<const N: usize>(replies: [&str; N]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<Conversation> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, payload: &Conversation) -> Result<String, TransportError> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedTransport: no more results"))
    }
}

/// A transport that parks inside `invoke` until released.
pub struct GatedTransport {
    reply: String,
    calls: AtomicUsize,
    called: Notify,
    gate: Notify,
}

impl GatedTransport {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            called: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Resolves once a call has entered `invoke`.
    pub async fn wait_until_called(&self) {
        self.called.notified().await;
    }

    /// Let the parked call return.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait::async_trait]
impl Transport for GatedTransport {
    fn name(&self) -> &str {
        "gated"
    }

    async fn invoke(&self, _payload: &Conversation) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}
