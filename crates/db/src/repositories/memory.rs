//! In-memory repository implementations for tests and offline development.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use ledgerlink_core::domain::connection::{Connection, Provider};

use super::{
    ConnectionRepository, OAuthStateRecord, OAuthStateRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryConnectionRepository {
    rows: Mutex<HashMap<(String, Provider), Connection>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(connection: Connection) -> Self {
        let repository = Self::default();
        repository
            .rows
            .lock()
            .expect("repository lock poisoned")
            .insert((connection.user_id.clone(), connection.provider), connection);
        repository
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn find(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<Connection>, RepositoryError> {
        let rows = self.rows.lock().expect("repository lock poisoned");
        Ok(rows.get(&(user_id.to_string(), provider)).cloned())
    }

    async fn upsert(&self, connection: &Connection) -> Result<Connection, RepositoryError> {
        let mut rows = self.rows.lock().expect("repository lock poisoned");
        let key = (connection.user_id.clone(), connection.provider);
        let mut merged = connection.clone();

        // Same retention rules the SQL upsert applies on conflict.
        if let Some(existing) = rows.get(&key) {
            if merged.refresh_token.is_none() {
                merged.refresh_token = existing.refresh_token.clone();
            }
            if merged.external_account_id.is_none() {
                merged.external_account_id = existing.external_account_id.clone();
            }
            if merged.scope.is_none() {
                merged.scope = existing.scope.clone();
            }
        }

        rows.insert(key, merged.clone());
        Ok(merged)
    }
}

#[derive(Default)]
pub struct InMemoryOAuthStateRepository {
    rows: Mutex<HashMap<String, (OAuthStateRecord, bool)>>,
}

impl InMemoryOAuthStateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl OAuthStateRepository for InMemoryOAuthStateRepository {
    async fn insert(&self, record: &OAuthStateRecord) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().expect("repository lock poisoned");
        rows.insert(record.state_token.clone(), (record.clone(), false));
        Ok(())
    }

    async fn reserve(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthStateRecord>, RepositoryError> {
        let mut rows = self.rows.lock().expect("repository lock poisoned");
        match rows.get_mut(state_token) {
            Some((record, used)) if !*used && record.expires_at > now => {
                *used = true;
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }
}
