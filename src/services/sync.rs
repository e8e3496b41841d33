use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::conversation_store::ConversationStore;
use super::message_cache;
use super::send_pipeline::{SendOutcome, SendPipeline};
use super::state::{EventSink, SharedState, SyncEvent, SyncState, SyncView};
use super::titles::TitleOverrideStore;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::models::{Conversation, ConversationId};
use crate::transport::{AuthProvider, Transport};

/// Single entry point for the presentation layer.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SyncController {
    state: SharedState,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    events: EventSink,
    pipeline: SendPipeline,
}

impl SyncController {
    pub fn new(
        config: &SyncConfig,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        titles: TitleOverrideStore,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = EventSink::channel();
        let state = SharedState::new(SyncState::new(ConversationStore::new(titles)));
        let pipeline = SendPipeline::new(
            state.clone(),
            transport.clone(),
            auth.clone(),
            events.clone(),
            config.send_timeout,
        );

        let controller = Self {
            state,
            transport,
            auth,
            events,
            pipeline,
        };
        (controller, rx)
    }

    pub fn view(&self) -> SyncView {
        self.state.with(|state| state.view())
    }

    pub async fn on_mount(&self) {
        if !self.auth.is_signed_in() {
            return;
        }
        if let Err(e) = self.refresh().await {
            tracing::error!("Failed to load conversations: {}", e);
        }
    }

    /// Fetch and reconcile the conversation list. Signed-out is a no-op.
    /// On failure local state is left untouched.
    pub async fn refresh(&self) -> Result<(), SyncError> {
        if !self.auth.is_signed_in() {
            tracing::debug!("Skipping refresh: not signed in");
            return Ok(());
        }

        match self.transport.list_conversations().await {
            Ok(server) => {
                self.state
                    .with(|state| state.conversations.apply_refresh(server));
                self.events.emit(SyncEvent::ConversationsChanged);
                Ok(())
            }
            Err(e) => {
                let error = SyncError::from(e);
                self.report(error.clone());
                Err(error)
            }
        }
    }

    /// Select a conversation, loading its messages the first time.
    pub async fn on_conversation_selected(&self, id: ConversationId) -> Result<(), SyncError> {
        let to_load = self.state.with(|state| {
            if !state.conversations.set_active(&id) {
                return None;
            }
            let id = state.conversations.resolve(&id);
            (!id.is_draft() && !state.messages.is_loaded(&id)).then_some(id)
        });
        self.events.emit(SyncEvent::ConversationsChanged);

        match to_load {
            Some(id) if self.auth.is_signed_in() => self.load_messages(&id).await,
            _ => Ok(()),
        }
    }

    pub fn on_new_conversation(&self) -> ConversationId {
        let id = self.state.with(|state| {
            let id = state.conversations.create_draft();
            state.messages.clear(&id);
            id
        });
        self.events.emit(SyncEvent::ConversationsChanged);
        id
    }

    pub fn on_rename(&self, id: &ConversationId, title: &str) -> Result<(), SyncError> {
        self.state
            .with(|state| state.conversations.rename(id, title))?;
        self.events.emit(SyncEvent::ConversationsChanged);
        Ok(())
    }

    /// Send to the active conversation (or a new one). Returns once the
    /// optimistic echo is visible; the handle resolves with the outcome.
    pub fn on_send(&self, content: &str) -> Result<JoinHandle<SendOutcome>, SyncError> {
        let target = self
            .state
            .with(|state| state.conversations.active().cloned());
        self.pipeline.send(target, content)
    }

    /// Create an empty conversation on the server and select it.
    pub async fn create_conversation(&self, title: &str) -> Result<ConversationId, SyncError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SyncError::validation("Title cannot be empty"));
        }
        if !self.auth.is_signed_in() {
            return Err(SyncError::AuthRequired);
        }

        let summary = match self.transport.create_conversation(title).await {
            Ok(summary) => summary,
            Err(e) => {
                let error = SyncError::from(e);
                self.report(error.clone());
                return Err(error);
            }
        };

        let id = ConversationId::Canonical(summary.id.clone());
        self.state.with(|state| {
            state
                .conversations
                .insert_canonical(Conversation::from(summary));
            state.messages.replace_all(&id, Vec::new());
        });
        self.events.emit(SyncEvent::ConversationsChanged);
        Ok(id)
    }

    pub fn dismiss_error(&self) {
        self.state.with(|state| state.last_error = None);
    }

    async fn load_messages(&self, id: &ConversationId) -> Result<(), SyncError> {
        match message_cache::load(self.transport.as_ref(), id).await {
            Ok(sequence) => {
                self.state
                    .with(|state| state.messages.replace_all(id, sequence));
                self.events.emit(SyncEvent::MessagesChanged(id.clone()));
                Ok(())
            }
            Err(error) => {
                tracing::error!("Failed to load messages for {}: {}", id, error);
                self.report(error.clone());
                Err(error)
            }
        }
    }

    fn report(&self, error: SyncError) {
        self.state
            .with(|state| state.last_error = Some(error.clone()));
        self.events.emit(SyncEvent::Error(error));
    }
}
