use thiserror::Error;

use crate::transport::{TransportError, TransportErrorKind};

/// Every failure the engine can surface to the presentation layer.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Empty content or title. Never reaches the network.
    #[error("{0}")]
    Validation(String),

    /// The signed-in precondition was not met. Never reaches the network.
    #[error("Sign in to use chat")]
    AuthRequired,

    #[error(transparent)]
    Transport(TransportError),

    /// The server answered successfully but the payload is unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Title overrides could not be persisted.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A success status with an undecodable body is the server's fault, not the
/// network's.
impl From<TransportError> for SyncError {
    fn from(error: TransportError) -> Self {
        match error.kind {
            TransportErrorKind::Decode => Self::InvalidResponse(error.message),
            TransportErrorKind::Network | TransportErrorKind::Http => Self::Transport(error),
        }
    }
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure_is_invalid_response() {
        let error = SyncError::from(TransportError::decode(200, "expected value at line 1"));
        assert!(matches!(error, SyncError::InvalidResponse(ref m) if m == "expected value at line 1"));

        let error = SyncError::from(TransportError::http(503, "unavailable", None));
        assert!(matches!(error, SyncError::Transport(ref e) if e.status == Some(503)));

        let error = SyncError::from(TransportError::network("offline"));
        assert!(matches!(error, SyncError::Transport(_)));
    }
}
