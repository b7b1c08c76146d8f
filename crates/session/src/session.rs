//! The chat session: owns the message log and drives the send lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parley_config::AppConfig;
use parley_core::connectivity::Connectivity;
use parley_core::error::{Error, Result};
use parley_core::export::ExportDocument;
use parley_core::log::{MessageLog, RestoreReport};
use parley_core::message::{Message, Role};
use parley_core::notice::{NoticeSink, OFFLINE_NOTICE, SAVE_FAILED_NOTICE, SEND_FAILED_NOTICE};
use parley_core::payload::{DEFAULT_WINDOW, SystemPreamble, build_payload};
use parley_core::store::{HISTORY_KEY, Store};
use parley_core::transport::Transport;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why a send was dropped without touching the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty after trimming
    Empty,
    /// Another send is in flight
    Busy,
}

/// Result of one `send_message` call.
#[derive(Debug)]
pub enum SendOutcome {
    /// The exchange completed and both messages are in the log
    Replied { user: Message, reply: Message },
    /// Nothing happened
    Ignored(IgnoreReason),
    /// Connectivity was absent; a notice was shown
    Offline,
    /// The remote call failed; the user message was rolled back
    Failed(Error),
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            SendOutcome::Replied { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

/// Clears the sending flag on every exit path, unwinding included.
struct SendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A single logical conversation.
///
/// The session is either idle or sending. `send_message` is the only path
/// into the sending state and a second call made while one is in flight is
/// rejected, so at most one transport call is ever outstanding.
pub struct ChatSession {
    /// The conversation log
    log: Mutex<MessageLog>,

    /// Set while a send is in flight
    sending: AtomicBool,

    /// Remote completion API
    transport: Arc<dyn Transport>,

    /// Write-through persistence
    store: Arc<dyn Store>,

    /// Online check made before each send
    connectivity: Arc<dyn Connectivity>,

    /// Where user-facing notices go
    notices: Arc<dyn NoticeSink>,

    /// Instruction/acknowledgement opening every payload
    preamble: SystemPreamble,

    /// Log entries carried as context
    window: usize,

    /// Store key of the serialized log
    storage_key: String,
}

impl ChatSession {
    /// Create a session with an empty log and default settings.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store>,
        connectivity: Arc<dyn Connectivity>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            log: Mutex::new(MessageLog::default()),
            sending: AtomicBool::new(false),
            transport,
            store,
            connectivity,
            notices,
            preamble: SystemPreamble::default(),
            window: DEFAULT_WINDOW,
            storage_key: HISTORY_KEY.into(),
        }
    }

    /// Create a session configured from `config`.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store>,
        connectivity: Arc<dyn Connectivity>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self::new(transport, store, connectivity, notices)
            .with_capacity(config.history.capacity)
            .with_window(config.history.window)
            .with_storage_key(&config.history.storage_key)
            .with_preamble(SystemPreamble::new(
                &config.prompt.system_prompt,
                &config.prompt.acknowledgement,
            ))
    }

    /// Replace the log with an empty one of the given capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        *self.log.get_mut() = MessageLog::new(capacity);
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_preamble(mut self, preamble: SystemPreamble) -> Self {
        self.preamble = preamble;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Load the persisted log.
    ///
    /// An unreadable store or malformed data leaves the log empty or
    /// partial. When over-capacity data had to be trimmed, the trimmed log
    /// is written back. Refused with `Error::Busy` while a send is in flight.
    pub async fn restore(&self) -> Result<RestoreReport> {
        let raw = match self.store.load(&self.storage_key).await {
            Ok(Some(value)) => value,
            Ok(None) => serde_json::Value::Null,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Failed to load history, starting empty");
                serde_json::Value::Null
            }
        };

        let mut log = self.log.lock().await;
        if self.is_sending() {
            return Err(Error::Busy);
        }
        let report = log.restore(&raw);
        if report.trimmed > 0 {
            self.persist(&log).await;
        }
        info!(kept = report.kept, dropped = report.dropped, "History restored");
        Ok(report)
    }

    /// Send `raw_text` and record the exchange.
    ///
    /// Every failure ends here: the caller sees a `SendOutcome`, the user
    /// sees at most one notice, and the session stays usable.
    pub async fn send_message(&self, raw_text: &str) -> SendOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::Empty);
        }

        let Some(_sending) = SendingGuard::acquire(&self.sending) else {
            debug!("Send rejected, another request is in flight");
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };

        if !self.connectivity.is_online() {
            self.notices.notify(OFFLINE_NOTICE);
            return SendOutcome::Offline;
        }

        // Context is the log as it was before this message; the message
        // itself rides along as the final turn.
        let (payload, user) = {
            let mut log = self.log.lock().await;
            let payload = build_payload(&log, &self.preamble, self.window).with_prompt(text);
            let user = match log.append(text, Role::User) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Rejected user message");
                    return SendOutcome::Ignored(IgnoreReason::Empty);
                }
            };
            self.persist(&log).await;
            (payload, user)
        };

        debug!(
            transport = self.transport.name(),
            turns = payload.len(),
            est_tokens = payload.estimated_tokens(),
            "Sending message"
        );

        let result = self.transport.invoke(&payload).await;

        let mut log = self.log.lock().await;
        let outcome = result
            .map_err(Error::from)
            .and_then(|reply| log.append(reply, Role::Assistant).map_err(Error::from));

        match outcome {
            Ok(reply) => {
                self.persist(&log).await;
                SendOutcome::Replied { user, reply }
            }
            Err(e) => {
                let status = match &e {
                    Error::Transport(t) => t.status_code(),
                    _ => None,
                };
                warn!(error = %e, status = ?status, "Send failed, rolling back user message");
                if log.last().map(|m| m.id()) == Some(user.id()) {
                    log.remove_last();
                    self.persist(&log).await;
                }
                self.notices.notify(&format!("{SEND_FAILED_NOTICE} ({e})"));
                SendOutcome::Failed(e)
            }
        }
    }

    /// Write the log through to the store. A failure is reported as a
    /// notice; the in-memory log stays as it is.
    async fn persist(&self, log: &MessageLog) -> bool {
        let result = match log.serialize() {
            Ok(raw) => self.store.save(&self.storage_key, &raw).await.map_err(Error::from),
            Err(e) => Err(Error::from(e)),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Failed to save conversation");
                self.notices.notify(SAVE_FAILED_NOTICE);
                false
            }
        }
    }

    /// Drop every message and persist the empty log.
    ///
    /// Refused with `Error::Busy` while a send is in flight, so a reply can
    /// never land in the log without the message it answers.
    pub async fn clear(&self) -> Result<()> {
        let mut log = self.log.lock().await;
        // Checked under the lock: a send only touches the log while its flag is set.
        if self.is_sending() {
            return Err(Error::Busy);
        }
        log.clear();
        self.persist(&log).await;
        Ok(())
    }

    /// Snapshot of the log, oldest first.
    pub async fn messages(&self) -> Vec<Message> {
        self.log.lock().await.iter().cloned().collect()
    }

    /// `(entries, capacity)` of the log.
    pub async fn memory_usage(&self) -> (usize, usize) {
        let log = self.log.lock().await;
        (log.len(), log.capacity())
    }

    pub async fn export(&self) -> ExportDocument {
        ExportDocument::from_log(&*self.log.lock().await)
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }
}
