//! Conversation sessions for Parley.
//!
//! A [`ChatSession`] walks each user message through its lifecycle:
//!
//! 1. **Guard**: drop empty input, reject overlapping sends, check connectivity
//! 2. **Build** the payload from the log as it stands
//! 3. **Append** the user message optimistically and persist
//! 4. **Invoke** the transport
//! 5. **Commit** the reply, or **roll back** the user message and notify
//!
//! Whatever the transport does, the session ends idle with a consistent log.

pub mod monitor;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use monitor::{ConnectivityMonitor, Probe, TcpProbe};
pub use session::{ChatSession, IgnoreReason, SendOutcome};
