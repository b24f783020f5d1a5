use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::errors::StoreError;
use super::models::Credential;
use super::UserStore;

/// User store held entirely in memory, keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    credentials: Arc<RwLock<HashMap<String, Credential>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a credential
    pub async fn insert(&self, credential: Credential) {
        tracing::debug!(
            user_id = %credential.user_id,
            identity = %credential.identity,
            "Credential stored"
        );

        self.credentials
            .write()
            .await
            .insert(credential.identity.clone(), credential);
    }

    /// Remove a credential, returning it if present
    pub async fn remove(&self, identity: &str) -> Option<Credential> {
        self.credentials.write().await.remove(identity)
    }

    pub async fn len(&self) -> usize {
        self.credentials.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn lookup(&self, identity: &str) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.read().await.get(identity).cloned())
    }
}
