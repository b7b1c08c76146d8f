//! # Parley Core
//!
//! Domain types, traits, and error definitions for the Parley chat client.
//! This crate has **no I/O of its own**; it defines the conversation model
//! that the other crates implement against.
//!
//! ## Layout
//!
//! - [`log::MessageLog`]: the bounded, ordered message log
//! - [`payload`]: turns the log into the remote API's conversation shape
//! - [`transport::Transport`], [`store::Store`], [`connectivity::Connectivity`],
//!   [`notice::NoticeSink`]: the collaborators the session drives

pub mod connectivity;
pub mod error;
pub mod export;
pub mod log;
pub mod message;
pub mod notice;
pub mod payload;
pub mod store;
pub mod transport;

// Re-export key types at crate root for ergonomics
pub use connectivity::{Connectivity, StaticConnectivity};
pub use error::{Error, Result, StorageError, TransportError, ValidationError};
pub use export::ExportDocument;
pub use log::{MessageLog, RestoreReport};
pub use message::{Message, MessageId, Role};
pub use notice::{CollectingNotices, NoticeSink};
pub use payload::{Conversation, SystemPreamble, Turn, TurnRole, build_payload};
pub use store::Store;
pub use transport::Transport;
