use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::traits::{AuthProvider, Transport};
use super::types::{CreateConversationRequest, ErrorBody, SendRequest, SendResponse, TransportError};
use crate::models::{CanonicalId, ConversationSummary, ServerMessage};

/// JSON-over-HTTP chat backend.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    auth: Arc<dyn AuthProvider>,
}

impl HttpTransport {
    pub fn new(base_url: Url, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            auth,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(path)
            .map_err(|e| TransportError::network(format!("Invalid endpoint {}: {}", path, e)))
    }

    /// `conversations/{id}/messages`, with the id percent-encoded as one segment.
    fn messages_endpoint(&self, conversation: &CanonicalId) -> Result<Url, TransportError> {
        let mut url = self.endpoint("conversations")?;
        url.path_segments_mut()
            .map_err(|_| TransportError::network(format!("Base URL cannot hold a path: {}", self.base_url)))?
            .push(conversation.as_str())
            .push("messages");
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, TransportError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;

        let response = Self::check_status(response).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("Failed to read response: {}", e)))?;

        Self::decode(status, &body)
    }

    fn decode<T: DeserializeOwned>(
        status: reqwest::StatusCode,
        body: &str,
    ) -> Result<T, TransportError> {
        serde_json::from_str(body).map_err(|e| TransportError::decode(status.as_u16(), e.to_string()))
    }

    async fn check_status(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::parse_error(status, &body))
    }

    fn parse_error(status: reqwest::StatusCode, body: &str) -> TransportError {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => TransportError::http(
                status.as_u16(),
                parsed
                    .error
                    .unwrap_or_else(|| "Request failed".to_string()),
                parsed.detail,
            ),
            Err(_) => TransportError::http(status.as_u16(), "Request failed", None),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, TransportError> {
        let url = self.endpoint("conversations")?;
        self.execute(self.client.get(url)).await
    }

    async fn list_messages(
        &self,
        conversation: &CanonicalId,
    ) -> Result<Vec<ServerMessage>, TransportError> {
        let url = self.messages_endpoint(conversation)?;
        self.execute(self.client.get(url)).await
    }

    async fn create_conversation(
        &self,
        title: &str,
    ) -> Result<ConversationSummary, TransportError> {
        let url = self.endpoint("conversations")?;
        let body = CreateConversationRequest { title };
        self.execute(self.client.post(url).json(&body)).await
    }

    async fn send_message(
        &self,
        conversation: Option<&CanonicalId>,
        content: &str,
    ) -> Result<SendResponse, TransportError> {
        let url = self.endpoint("chat")?;
        let body = SendRequest {
            conversation_id: conversation.cloned(),
            message: content.to_string(),
        };
        tracing::debug!(
            "POST chat (conversation: {})",
            conversation.map(|c| c.as_str()).unwrap_or("new")
        );
        self.execute(self.client.post(url).json(&body)).await
    }
}
