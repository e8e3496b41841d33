use std::collections::HashMap;

use anyhow::Result;

use super::database::Database;
use crate::config::TITLE_OVERRIDES_KEY;
use crate::error::SyncError;
use crate::models::{Conversation, ConversationId};

/// Durable slot holding the serialized override map.
pub trait OverrideStorage: Send {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, json: &str) -> Result<()>;
}

impl OverrideStorage for Database {
    fn load(&self) -> Result<Option<String>> {
        self.get_setting(TITLE_OVERRIDES_KEY)
    }

    fn save(&self, json: &str) -> Result<()> {
        self.set_setting(TITLE_OVERRIDES_KEY, json)
    }
}

/// User-chosen conversation titles, independent of server data.
///
/// Keys are the `Display` form of whichever identity was active at rename
/// time. Entries are never evicted.
pub struct TitleOverrideStore {
    storage: Box<dyn OverrideStorage>,
    overrides: HashMap<String, String>,
}

impl TitleOverrideStore {
    /// Unreadable or corrupt storage is treated as an empty map.
    pub fn open(storage: Box<dyn OverrideStorage>) -> Self {
        let overrides = match storage.load() {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable title overrides: {}", e);
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!("Title override storage unavailable: {}", e);
                HashMap::new()
            }
        };

        Self { storage, overrides }
    }

    pub fn get(&self, id: &ConversationId) -> Option<&str> {
        self.overrides.get(&id.to_string()).map(String::as_str)
    }

    /// Persists before returning. Last writer wins per identity.
    pub fn set(&mut self, id: &ConversationId, title: &str) -> Result<(), SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::validation("Title cannot be empty"));
        }

        self.write(id.to_string(), title.to_string())
    }

    /// Carries an override from a draft over to its canonical identity.
    pub fn copy(&mut self, from: &ConversationId, to: &ConversationId) -> Result<(), SyncError> {
        match self.get(from) {
            Some(title) => {
                let title = title.to_string();
                self.write(to.to_string(), title)
            }
            None => Ok(()),
        }
    }

    pub fn decorate(&self, conversations: Vec<Conversation>) -> Vec<Conversation> {
        conversations
            .into_iter()
            .map(|mut conversation| {
                if let Some(title) = self.get(&conversation.id) {
                    conversation.title = title.to_string();
                }
                conversation
            })
            .collect()
    }

    fn write(&mut self, key: String, title: String) -> Result<(), SyncError> {
        let mut next = self.overrides.clone();
        next.insert(key, title);

        let json = serde_json::to_string(&next).map_err(|e| SyncError::Storage(e.to_string()))?;
        self.storage
            .save(&json)
            .map_err(|e| SyncError::Storage(e.to_string()))?;

        self.overrides = next;
        Ok(())
    }
}
