use crate::config::ConfigError;
use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use lectern_core::PeerId;
use std::collections::HashMap;
use thiserror::Error;

/// Who a verified credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub peer_id: PeerId,
    pub role: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Auth backend unavailable: {0}")]
    Unavailable(String),
}

/// External identity check, consulted once per connection before the
/// WebSocket upgrade.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Fixed token table, for development and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, peer_id: &str, role: &str) -> Self {
        self.tokens.insert(
            token.to_string(),
            Identity {
                peer_id: PeerId::from(peer_id),
                role: role.to_string(),
            },
        );
        self
    }

    /// Parses `token=peer:role,token2=peer2:role2`. Blank input yields an empty table.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let mut auth = Self::new();

        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || ConfigError::InvalidToken(entry.to_string());

            let (token, identity) = entry.split_once('=').ok_or_else(invalid)?;
            let (peer_id, role) = identity.split_once(':').ok_or_else(invalid)?;
            if token.is_empty() || peer_id.is_empty() {
                return Err(invalid());
            }

            auth = auth.with_token(token, peer_id, role);
        }

        Ok(auth)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(credential)
            .cloned()
            .ok_or(AuthError::InvalidCredential)
    }
}

/// Bearer credential from the `token` query parameter, falling back to an
/// `Authorization: Bearer` header.
pub fn bearer_credential(query_token: Option<String>, headers: &HeaderMap) -> Option<String> {
    if let Some(token) = query_token.filter(|t| !t.is_empty()) {
        return Some(token);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
