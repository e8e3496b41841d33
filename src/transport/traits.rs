use async_trait::async_trait;

use super::types::{SendResponse, TransportError};
use crate::models::{CanonicalId, ConversationSummary, ServerMessage};

/// Chat backend. Only canonical ids can be addressed: drafts have nothing to
/// fetch yet.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError>;

    async fn list_messages(
        &self,
        conversation: &CanonicalId,
    ) -> Result<Vec<ServerMessage>, TransportError>;

    async fn create_conversation(&self, title: &str)
        -> Result<ConversationSummary, TransportError>;

    async fn send_message(
        &self,
        conversation: Option<&CanonicalId>,
        content: &str,
    ) -> Result<SendResponse, TransportError>;
}

/// Session state as far as the engine cares about it.
pub trait AuthProvider: Send + Sync {
    fn is_signed_in(&self) -> bool;

    /// Attached to outgoing requests by the transport; the engine never reads it.
    fn bearer_token(&self) -> Option<String>;
}
