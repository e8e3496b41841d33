use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::error::SyncError;
use crate::models::{ConversationId, Message, MessageId, ServerMessage};
use crate::transport::Transport;

/// Fetch the server log of a conversation. Drafts have no server log and
/// never reach the transport.
pub async fn load(
    transport: &dyn Transport,
    conversation: &ConversationId,
) -> Result<Vec<Message>, SyncError> {
    let Some(canonical) = conversation.as_canonical() else {
        return Ok(Vec::new());
    };

    let messages = transport.list_messages(canonical).await?;
    Ok(messages
        .into_iter()
        .map(|m: ServerMessage| m.into_message(canonical))
        .collect())
}

/// Per-conversation ordered message logs, including optimistic entries.
#[derive(Debug, Default)]
pub struct MessageCache {
    logs: HashMap<ConversationId, Vec<Message>>,
    loaded: HashSet<ConversationId>,
    /// Optimistic entries whose send has not resolved yet.
    pending: HashSet<Uuid>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self, conversation: &ConversationId) -> &[Message] {
        self.logs
            .get(conversation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_loaded(&self, conversation: &ConversationId) -> bool {
        self.loaded.contains(conversation)
    }

    pub fn clear(&mut self, conversation: &ConversationId) {
        if let Some(log) = self.logs.remove(conversation) {
            for message in log {
                if let MessageId::Temporary(temp) = message.id {
                    self.pending.remove(&temp);
                }
            }
        }
        self.loaded.remove(conversation);
    }

    /// Overwrite a log with a fresh fetch. Optimistic entries still in
    /// flight stay at the tail.
    pub fn replace_all(&mut self, conversation: &ConversationId, sequence: Vec<Message>) {
        let in_flight: Vec<Message> = self
            .logs
            .remove(conversation)
            .unwrap_or_default()
            .into_iter()
            .filter(|m| matches!(m.id, MessageId::Temporary(temp) if self.pending.contains(&temp)))
            .collect();

        let mut log = sequence;
        log.extend(in_flight);

        tracing::debug!("Replaced {} message log ({} entries)", conversation, log.len());
        self.logs.insert(conversation.clone(), log);
        self.loaded.insert(conversation.clone());
    }

    pub fn append_optimistic(&mut self, conversation: &ConversationId, content: &str) -> Uuid {
        let (temp, message) = Message::optimistic(conversation.clone(), content);
        self.logs
            .entry(conversation.clone())
            .or_default()
            .push(message);
        self.pending.insert(temp);
        temp
    }

    /// Swap the optimistic entry for its canonical copy in place, then put
    /// the assistant reply (if any) directly after it.
    pub fn promote(&mut self, temp: Uuid, user: Message, assistant: Option<Message>) {
        self.pending.remove(&temp);

        let conversation = user.conversation_id.clone();
        let log = self.logs.entry(conversation).or_default();
        let temp_id = MessageId::Temporary(temp);
        let temp_pos = log.iter().position(|m| m.id == temp_id);
        let already_known = log.iter().position(|m| m.id == user.id);

        let user_pos = match (temp_pos, already_known) {
            (Some(pos), None) => {
                log[pos] = user;
                pos
            }
            (Some(pos), Some(known)) => {
                log.remove(pos);
                if known > pos {
                    known - 1
                } else {
                    known
                }
            }
            (None, Some(known)) => known,
            (None, None) => {
                log.push(user);
                log.len() - 1
            }
        };

        if let Some(assistant) = assistant {
            if !log.iter().any(|m| m.id == assistant.id) {
                log.insert(user_pos + 1, assistant);
            }
        }
    }

    /// The send was accepted but returned no message payload; the next
    /// `replace_all` for its conversation supersedes the optimistic entry.
    pub fn acknowledge(&mut self, temp: Uuid) {
        self.pending.remove(&temp);
    }

    /// Remove an optimistic entry, returning its content for the input field.
    pub fn rollback(&mut self, temp: Uuid) -> Option<String> {
        self.pending.remove(&temp);
        let temp_id = MessageId::Temporary(temp);
        for log in self.logs.values_mut() {
            if let Some(pos) = log.iter().position(|m| m.id == temp_id) {
                return Some(log.remove(pos).content);
            }
        }
        None
    }

    /// Move a draft's log under its canonical identity.
    pub fn rekey(&mut self, from: &ConversationId, to: &ConversationId) {
        let Some(moved) = self.logs.remove(from) else {
            return;
        };
        self.loaded.remove(from);

        let log = self.logs.entry(to.clone()).or_default();
        for mut message in moved {
            if log.iter().any(|m| m.id == message.id) {
                continue;
            }
            message.conversation_id = to.clone();
            log.push(message);
        }
        self.loaded.insert(to.clone());
    }
}
