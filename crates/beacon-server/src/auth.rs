use crate::state::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Issued operator session tokens. Single-operator deployment: tokens are
/// opaque, held in memory, and live for the process lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    tokens: Arc<RwLock<HashSet<String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone());
        token
    }

    pub async fn verify(&self, token: &str) -> bool {
        self.tokens.read().await.contains(token)
    }
}

/// Extractor guarding operator endpoints: requires `Authorization: Bearer`
/// with a token issued by the login endpoint.
pub struct AuthSession;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthSession {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| unauthorized("Missing session token"))?;

        if !state.sessions.verify(token).await {
            return Err(unauthorized("Invalid session token"));
        }

        Ok(AuthSession)
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_tokens_verify_and_unknown_ones_do_not() {
        let sessions = SessionStore::new();
        let token = sessions.issue().await;

        assert!(sessions.verify(&token).await);
        assert!(!sessions.verify("not-a-token").await);
    }
}
