//! Transport trait: the abstraction over the remote completion API.
//!
//! A Transport knows how to send a conversation payload to the hosted model
//! and get the reply text back. It reports failures in enough detail
//! (status code, server message) for a user-facing notice; callers treat
//! every failure as "send failed".
//!
//! Implementations: Gemini `generateContent`, scripted doubles in tests.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::payload::Conversation;

/// The core Transport trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// A human-readable name for this transport (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send the payload and return the model's reply text.
    async fn invoke(&self, payload: &Conversation) -> std::result::Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Turn;

    struct Echo;

    #[async_trait]
    impl Transport for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, payload: &Conversation) -> Result<String, TransportError> {
            payload
                .turns
                .last()
                .map(|t| t.text.clone())
                .ok_or_else(|| TransportError::MalformedResponse("empty payload".into()))
        }
    }

    #[tokio::test]
    async fn transport_is_object_safe() {
        let transport: Box<dyn Transport> = Box::new(Echo);
        let payload = Conversation { turns: vec![Turn::user("ping")] };
        assert_eq!(transport.invoke(&payload).await.unwrap(), "ping");
        assert!(transport.invoke(&Conversation::default()).await.is_err());
    }
}
