use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{CanonicalId, ConversationId, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Optimistic echo of a user message that has not been acknowledged.
    pub fn optimistic(conversation_id: ConversationId, content: &str) -> (Uuid, Self) {
        let temp = Uuid::new_v4();
        let message = Self {
            id: MessageId::Temporary(temp),
            conversation_id,
            role: Role::User,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        (temp, message)
    }
}

/// Message as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ServerMessage {
    pub fn into_message(self, conversation: &CanonicalId) -> Message {
        Message {
            id: MessageId::Canonical(self.id),
            conversation_id: ConversationId::Canonical(conversation.clone()),
            role: self.role,
            content: self.content,
            created_at: self.created_at,
        }
    }
}
