use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::{CanonicalId, ConversationId};
use crate::config::DEFAULT_TITLE;

/// A conversation as the engine displays it. `title` is already resolved
/// against local overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Placeholder shown for a freshly created draft.
    pub fn draft(id: ConversationId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Conversation as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: CanonicalId,
    #[serde(default)]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationSummary> for Conversation {
    fn from(summary: ConversationSummary) -> Self {
        let title = summary
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Self {
            id: ConversationId::Canonical(summary.id),
            title,
            created_at: summary.created_at,
        }
    }
}
