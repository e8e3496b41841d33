use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Locally generated handle for a conversation the server has not seen yet.
///
/// Backed by a UUIDv7 so tokens sort by creation time and are never reused,
/// including across restarts (overrides may be persisted under them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DraftToken(Uuid);

impl DraftToken {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DraftToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft-{}", self.0)
    }
}

/// Server-assigned conversation identifier. Stable forever.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a conversation: provisional until the server acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationId {
    Draft(DraftToken),
    Canonical(CanonicalId),
}

impl ConversationId {
    pub fn new_draft() -> Self {
        Self::Draft(DraftToken::new())
    }

    pub fn canonical(id: impl Into<String>) -> Self {
        Self::Canonical(CanonicalId::new(id))
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }

    pub fn as_canonical(&self) -> Option<&CanonicalId> {
        match self {
            Self::Canonical(id) => Some(id),
            Self::Draft(_) => None,
        }
    }
}

impl From<CanonicalId> for ConversationId {
    fn from(id: CanonicalId) -> Self {
        Self::Canonical(id)
    }
}

/// The `Display` form doubles as the persisted title-override key.
impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft(token) => token.fmt(f),
            Self::Canonical(id) => id.fmt(f),
        }
    }
}

/// Identity of a message: temporary while an optimistic echo, canonical once
/// the server has stored it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Temporary(Uuid),
    Canonical(String),
}

impl MessageId {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_tokens_are_unique() {
        let first = DraftToken::new();
        let second = DraftToken::new();
        assert_ne!(first, second);
    }

    #[test]
    fn test_override_keys() {
        let canonical = ConversationId::canonical("c-42");
        assert_eq!(canonical.to_string(), "c-42");

        let draft = ConversationId::new_draft();
        assert!(draft.to_string().starts_with("draft-"));
        assert!(draft.as_canonical().is_none());
    }
}
