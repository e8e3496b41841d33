use std::sync::RwLock;

use super::traits::AuthProvider;

/// Bearer-token session that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct TokenAuth {
    token: RwLock<Option<String>>,
}

impl TokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(token.into());
    }

    pub fn sign_out(&self) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}

impl AuthProvider for TokenAuth {
    fn is_signed_in(&self) -> bool {
        self.token
            .read()
            .map(|t| t.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }

    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .map(|t| t.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let auth = TokenAuth::new(None);
        assert!(!auth.is_signed_in());

        auth.sign_in("secret");
        assert!(auth.is_signed_in());
        assert_eq!(auth.bearer_token().as_deref(), Some("secret"));

        auth.sign_out();
        assert!(!auth.is_signed_in());
        assert!(auth.bearer_token().is_none());
    }
}
