use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::conversation_store::ConversationStore;
use super::message_cache::MessageCache;
use crate::error::SyncError;
use crate::models::{Conversation, ConversationId, Message};

/// Everything the engine mutates. Each component owns its own slice.
pub struct SyncState {
    pub conversations: ConversationStore,
    pub messages: MessageCache,
    pub sends_in_flight: usize,
    pub last_error: Option<SyncError>,
}

impl SyncState {
    pub fn new(conversations: ConversationStore) -> Self {
        Self {
            conversations,
            messages: MessageCache::new(),
            sends_in_flight: 0,
            last_error: None,
        }
    }

    pub fn view(&self) -> SyncView {
        let active = self.conversations.active().cloned();
        let messages = active
            .as_ref()
            .map(|id| self.messages.messages(id).to_vec())
            .unwrap_or_default();

        SyncView {
            conversations: self.conversations.conversations().to_vec(),
            active,
            messages,
            send_in_flight: self.sends_in_flight > 0,
            last_error: self.last_error.clone(),
        }
    }
}

/// Shared handle to the engine state.
///
/// The lock is only taken for synchronous sections and never held across an
/// `.await`, so tasks interleave at network boundaries only.
#[derive(Clone)]
pub struct SharedState(Arc<Mutex<SyncState>>);

impl SharedState {
    pub fn new(state: SyncState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SyncState) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut *guard)
    }
}

/// Read-only snapshot for the presentation layer.
#[derive(Debug, Clone)]
pub struct SyncView {
    pub conversations: Vec<Conversation>,
    pub active: Option<ConversationId>,
    /// Messages of the active conversation, in display order.
    pub messages: Vec<Message>,
    pub send_in_flight: bool,
    pub last_error: Option<SyncError>,
}

/// Notifications for the presentation layer. The engine never schedules
/// their dismissal.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    ConversationsChanged,
    MessagesChanged(ConversationId),
    /// A send was rolled back; `content` should go back into the input.
    SendFailed { content: String, error: SyncError },
    Error(SyncError),
}

#[derive(Clone)]
pub struct EventSink(mpsc::UnboundedSender<SyncEvent>);

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    /// A dropped receiver just means nobody is listening.
    pub fn emit(&self, event: SyncEvent) {
        let _ = self.0.send(event);
    }
}
