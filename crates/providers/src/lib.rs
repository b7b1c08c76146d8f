//! Remote completion transports for Parley.
//!
//! All transports implement the `parley_core::Transport` trait.

pub mod gemini;

pub use gemini::{GeminiTransport, GenerationSettings, SafetySetting};
