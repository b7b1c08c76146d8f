//! Persistence backends for Parley chat history.

pub mod file;
pub mod in_memory;
pub mod noop;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use noop::NoopStore;
