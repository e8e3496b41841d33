//! Scripted in-memory transport for engine tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use super::traits::Transport;
use super::types::{SendResponse, TransportError};
use crate::models::{CanonicalId, ConversationSummary, Role, ServerMessage};

#[derive(Default)]
pub struct FakeTransport {
    pub conversations: Mutex<Vec<ConversationSummary>>,
    pub messages: Mutex<HashMap<CanonicalId, Vec<ServerMessage>>>,
    pub send_results: Mutex<VecDeque<Result<SendResponse, TransportError>>>,
    pub list_error: Mutex<Option<TransportError>>,
    pub sent: Mutex<Vec<(Option<CanonicalId>, String)>>,
    pub message_fetches: Mutex<Vec<CanonicalId>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    messages_gate: Mutex<Option<Arc<Notify>>>,
    send_gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_conversations(&self, list: Vec<ConversationSummary>) {
        *self.conversations.lock().unwrap() = list;
    }

    pub fn set_messages(&self, id: &str, list: Vec<ServerMessage>) {
        self.messages
            .lock()
            .unwrap()
            .insert(CanonicalId::new(id), list);
    }

    pub fn push_send(&self, result: Result<SendResponse, TransportError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    pub fn fail_listing(&self, error: TransportError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    /// Holds `list_conversations` until the returned handle is notified.
    pub fn gate_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Holds `list_messages` until the returned handle is notified.
    pub fn gate_messages(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.messages_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Holds `send_message` until the returned handle is notified.
    pub fn gate_sending(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.send_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn pass(gate: &Mutex<Option<Arc<Notify>>>) {
        let gate = gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

pub fn summary(id: &str, title: Option<&str>) -> ConversationSummary {
    ConversationSummary {
        id: CanonicalId::new(id),
        title: title.map(str::to_string),
        created_at: Utc::now(),
    }
}

pub fn server_message(id: &str, role: Role, content: &str) -> ServerMessage {
    ServerMessage {
        id: id.to_string(),
        role,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

pub fn reply(conversation: &str, user: &str, assistant: Option<&str>) -> SendResponse {
    SendResponse {
        conversation_id: Some(CanonicalId::new(conversation)),
        user_message: Some(server_message(&format!("{}-u", conversation), Role::User, user)),
        assistant_message: assistant
            .map(|text| server_message(&format!("{}-a", conversation), Role::Assistant, text)),
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        let snapshot = self.conversations.lock().unwrap().clone();
        Self::pass(&self.list_gate).await;
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(snapshot)
    }

    async fn list_messages(
        &self,
        conversation: &CanonicalId,
    ) -> Result<Vec<ServerMessage>, TransportError> {
        self.message_fetches.lock().unwrap().push(conversation.clone());
        Self::pass(&self.messages_gate).await;
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_conversation(
        &self,
        title: &str,
    ) -> Result<ConversationSummary, TransportError> {
        let mut list = self.conversations.lock().unwrap();
        let created = summary(&format!("created-{}", list.len() + 1), Some(title));
        list.insert(0, created.clone());
        Ok(created)
    }

    async fn send_message(
        &self,
        conversation: Option<&CanonicalId>,
        content: &str,
    ) -> Result<SendResponse, TransportError> {
        self.sent
            .lock()
            .unwrap()
            .push((conversation.cloned(), content.to_string()));
        Self::pass(&self.send_gate).await;
        self.send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::network("no scripted response")))
    }
}
