//! Send-message protocol: optimistic echo, network exchange, promotion of
//! identities, and rollback.
//!
//! Each send moves `Submitting -> Reconciling | RolledBack`. Composing is
//! the caller's business. The engine does not serialize sends to the same
//! conversation; callers keep one in flight per conversation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::message_cache;
use super::state::{EventSink, SharedState, SyncEvent, SyncState};
use crate::error::SyncError;
use crate::models::{CanonicalId, ConversationId, ConversationSummary, ServerMessage};
use crate::services::conversation_store::Promotion;
use crate::transport::{AuthProvider, SendResponse, Transport, TransportError};

/// Which conversation the server attached the message to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationRef {
    /// The request named no conversation; the server made one.
    Created(CanonicalId),
    Reused(CanonicalId),
}

impl ConversationRef {
    pub fn id(&self) -> &CanonicalId {
        match self {
            Self::Created(id) | Self::Reused(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyMessages {
    WithReply {
        user: ServerMessage,
        assistant: ServerMessage,
    },
    /// The assistant reply is generated asynchronously.
    UserOnly { user: ServerMessage },
    /// No message payload at all; only a refetch can tell.
    Deferred,
}

/// Validated shape of a successful send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReply {
    pub conversation: ConversationRef,
    pub messages: ReplyMessages,
}

impl SendReply {
    pub fn from_response(
        response: SendResponse,
        requested: Option<&CanonicalId>,
    ) -> Result<Self, SyncError> {
        let Some(id) = response.conversation_id else {
            return Err(SyncError::InvalidResponse(
                "missing conversation id".to_string(),
            ));
        };

        let conversation = match requested {
            None => ConversationRef::Created(id),
            Some(requested) if *requested == id => ConversationRef::Reused(id),
            Some(requested) => {
                return Err(SyncError::InvalidResponse(format!(
                    "reply for conversation {} does not match request {}",
                    id, requested
                )))
            }
        };

        let messages = match (response.user_message, response.assistant_message) {
            (Some(user), Some(assistant)) => ReplyMessages::WithReply { user, assistant },
            (Some(user), None) => ReplyMessages::UserOnly { user },
            (None, _) => ReplyMessages::Deferred,
        };

        Ok(Self {
            conversation,
            messages,
        })
    }
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Delivered { conversation: CanonicalId },
    RolledBack { content: String, error: SyncError },
}

/// A send between its optimistic echo and its resolution.
#[derive(Debug, Clone)]
struct PendingSend {
    /// Where the optimistic entry lives.
    conversation: ConversationId,
    /// The draft was created by this send and goes away if it fails.
    created_draft: bool,
    request: Option<CanonicalId>,
    temp: Uuid,
    content: String,
}

#[derive(Clone)]
pub struct SendPipeline {
    state: SharedState,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn AuthProvider>,
    events: EventSink,
    timeout: Duration,
}

impl SendPipeline {
    pub fn new(
        state: SharedState,
        transport: Arc<dyn Transport>,
        auth: Arc<dyn AuthProvider>,
        events: EventSink,
        timeout: Duration,
    ) -> Self {
        Self {
            state,
            transport,
            auth,
            events,
            timeout,
        }
    }

    /// Echo the message immediately and run the exchange in the background.
    ///
    /// Validation and auth failures return before anything is mutated.
    pub fn send(
        &self,
        target: Option<ConversationId>,
        content: &str,
    ) -> Result<JoinHandle<SendOutcome>, SyncError> {
        let pending = self.begin(target, content)?;
        let pipeline = self.clone();
        Ok(tokio::spawn(async move { pipeline.run(pending).await }))
    }

    fn begin(&self, target: Option<ConversationId>, content: &str) -> Result<PendingSend, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::validation("Message cannot be empty"));
        }
        if !self.auth.is_signed_in() {
            return Err(SyncError::AuthRequired);
        }

        let pending = self.state.with(|state| {
            let (conversation, created_draft) = match target {
                Some(id) => (state.conversations.resolve(&id), false),
                None => (state.conversations.create_draft(), true),
            };
            if created_draft {
                state.messages.clear(&conversation);
            }

            let temp = state.messages.append_optimistic(&conversation, content);
            state.sends_in_flight += 1;

            PendingSend {
                request: conversation.as_canonical().cloned(),
                conversation,
                created_draft,
                temp,
                content: content.to_string(),
            }
        });

        tracing::debug!("Submitting message to {}", pending.conversation);
        if pending.created_draft {
            self.events.emit(SyncEvent::ConversationsChanged);
        }
        self.events
            .emit(SyncEvent::MessagesChanged(pending.conversation.clone()));
        Ok(pending)
    }

    async fn run(self, pending: PendingSend) -> SendOutcome {
        let result = self.submit(&pending).await;

        let outcome = self.state.with(|state| match result {
            Ok(reply) => reconcile(state, &pending, reply),
            Err(error) => roll_back(state, &pending, error),
        });

        match &outcome {
            Resolution::Delivered { conversation, refetch } => {
                let id = ConversationId::Canonical(conversation.clone());
                self.events.emit(SyncEvent::ConversationsChanged);
                self.events.emit(SyncEvent::MessagesChanged(id.clone()));
                if *refetch {
                    self.refetch(&id).await;
                }
            }
            Resolution::RolledBack { content, error } => {
                tracing::error!("Failed to send message: {}", error);
                self.events.emit(SyncEvent::ConversationsChanged);
                self.events
                    .emit(SyncEvent::MessagesChanged(pending.conversation.clone()));
                self.events.emit(SyncEvent::SendFailed {
                    content: content.clone(),
                    error: error.clone(),
                });
            }
        }

        outcome.into()
    }

    async fn submit(&self, pending: &PendingSend) -> Result<SendReply, SyncError> {
        let exchange = self
            .transport
            .send_message(pending.request.as_ref(), &pending.content);

        let response = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(TransportError::network(format!(
                    "no response after {}s",
                    self.timeout.as_secs_f32()
                ))
                .into())
            }
        };

        SendReply::from_response(response, pending.request.as_ref())
    }

    async fn refetch(&self, id: &ConversationId) {
        match message_cache::load(self.transport.as_ref(), id).await {
            Ok(sequence) => {
                self.state
                    .with(|state| state.messages.replace_all(id, sequence));
                self.events.emit(SyncEvent::MessagesChanged(id.clone()));
            }
            Err(e) => tracing::warn!("Failed to refetch messages for {}: {}", id, e),
        }
    }
}

enum Resolution {
    Delivered {
        conversation: CanonicalId,
        refetch: bool,
    },
    RolledBack {
        content: String,
        error: SyncError,
    },
}

impl From<Resolution> for SendOutcome {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Delivered { conversation, .. } => SendOutcome::Delivered { conversation },
            Resolution::RolledBack { content, error } => SendOutcome::RolledBack { content, error },
        }
    }
}

fn reconcile(state: &mut SyncState, pending: &PendingSend, reply: SendReply) -> Resolution {
    let canonical = reply.conversation.id().clone();
    let target = ConversationId::Canonical(canonical.clone());

    if let (ConversationRef::Created(id), ConversationId::Draft(token)) =
        (&reply.conversation, &pending.conversation)
    {
        let summary = ConversationSummary {
            id: id.clone(),
            title: None,
            created_at: Utc::now(),
        };
        if let Promotion::AlreadyPromoted(existing) =
            state.conversations.promote_draft(*token, summary)
        {
            if existing != *id {
                tracing::warn!(
                    "Draft {} already became {}; server created {} as well",
                    pending.conversation,
                    existing,
                    id
                );
            }
        }
        state.messages.rekey(&pending.conversation, &target);
        state.conversations.set_active(&target);
    }

    let refetch = match reply.messages {
        ReplyMessages::WithReply { user, assistant } => {
            state.messages.promote(
                pending.temp,
                user.into_message(&canonical),
                Some(assistant.into_message(&canonical)),
            );
            false
        }
        ReplyMessages::UserOnly { user } => {
            state
                .messages
                .promote(pending.temp, user.into_message(&canonical), None);
            true
        }
        ReplyMessages::Deferred => {
            state.messages.acknowledge(pending.temp);
            true
        }
    };

    state.sends_in_flight = state.sends_in_flight.saturating_sub(1);
    tracing::debug!("Message delivered to {}", canonical);

    Resolution::Delivered {
        conversation: canonical,
        refetch,
    }
}

fn roll_back(state: &mut SyncState, pending: &PendingSend, error: SyncError) -> Resolution {
    let content = state
        .messages
        .rollback(pending.temp)
        .unwrap_or_else(|| pending.content.clone());

    if let (true, ConversationId::Draft(token)) = (pending.created_draft, &pending.conversation) {
        if state.messages.messages(&pending.conversation).is_empty() {
            state.conversations.discard_draft(*token);
            state.messages.clear(&pending.conversation);
        }
    }

    state.sends_in_flight = state.sends_in_flight.saturating_sub(1);
    state.last_error = Some(error.clone());

    Resolution::RolledBack { content, error }
}
