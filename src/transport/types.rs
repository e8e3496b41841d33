use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CanonicalId, ServerMessage};

/// How a transport call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No usable answer from the server.
    Network,
    /// The server answered with a non-success status.
    Http,
    /// The server answered successfully but the body could not be decoded.
    Decode,
}

/// Network, HTTP or decoding failure, with the status code when the server
/// answered.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", describe(.kind, .status, .message))]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    pub message: String,
    pub detail: Option<serde_json::Value>,
}

fn describe(kind: &TransportErrorKind, status: &Option<u16>, message: &str) -> String {
    match (kind, status) {
        (TransportErrorKind::Decode, _) => format!("Malformed response: {}", message),
        (_, Some(code)) => format!("HTTP {}: {}", code, message),
        (_, None) => format!("Network error: {}", message),
    }
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            status: None,
            message: message.into(),
            detail: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>, detail: Option<serde_json::Value>) -> Self {
        Self {
            kind: TransportErrorKind::Http,
            status: Some(status),
            message: message.into(),
            detail,
        }
    }

    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Decode,
            status: Some(status),
            message: message.into(),
            detail: None,
        }
    }
}

/// Body of `POST chat`. The conversation id is omitted when the server
/// should create the conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<CanonicalId>,
    pub message: String,
}

/// Raw send response. Every field may be missing on the wire; the send
/// pipeline turns this into a tagged reply before acting on it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    #[serde(default)]
    pub conversation_id: Option<CanonicalId>,
    #[serde(default)]
    pub user_message: Option<ServerMessage>,
    #[serde(default)]
    pub assistant_message: Option<ServerMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateConversationRequest<'a> {
    pub title: &'a str,
}

/// Error body shape shared by the chat API endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
