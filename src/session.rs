//! Operator session holding the backend bearer token
//!
//! The token lives in exactly one place and is injected into the gateway at
//! construction; setting and invalidating it go through this type rather
//! than ad-hoc reads of ambient storage.

use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(initial_token: Option<String>) -> Self {
        Self {
            token: RwLock::new(initial_token.filter(|t| !t.trim().is_empty())),
        }
    }

    /// Replace the current token (the single refresh path).
    pub async fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let mut guard = self.token.write().await;
        *guard = if token.trim().is_empty() {
            None
        } else {
            Some(token.trim().to_string())
        };
    }

    /// Drop the current token, e.g. after the backend rejected it.
    pub async fn invalidate(&self) {
        let mut guard = self.token.write().await;
        *guard = None;
    }

    pub async fn is_active(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Produce the `Authorization` header value, or fail before any network
    /// call when no token is present.
    pub async fn bearer(&self) -> AppResult<String> {
        let guard = self.token.read().await;
        match guard.as_ref() {
            Some(token) => Ok(format!("Bearer {}", token)),
            None => Err(AppError::Authentication(
                "no active session token".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bearer_requires_token() {
        let session = Session::new(None);
        assert!(matches!(
            session.bearer().await,
            Err(AppError::Authentication(_))
        ));

        session.set_token("tok-123").await;
        assert_eq!(session.bearer().await.unwrap(), "Bearer tok-123");
    }

    #[tokio::test]
    async fn invalidate_clears_token() {
        let session = Session::new(Some("tok".to_string()));
        assert!(session.is_active().await);

        session.invalidate().await;
        assert!(!session.is_active().await);
        assert!(session.bearer().await.is_err());
    }

    #[tokio::test]
    async fn blank_tokens_are_ignored() {
        let session = Session::new(Some("   ".to_string()));
        assert!(!session.is_active().await);

        session.set_token("  padded  ").await;
        assert_eq!(session.bearer().await.unwrap(), "Bearer padded");
    }
}
