use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ledgerlink_core::domain::connection::{Connection, Provider};

pub mod connection;
pub mod memory;
pub mod oauth_state;

pub use connection::SqlConnectionRepository;
pub use memory::{InMemoryConnectionRepository, InMemoryOAuthStateRepository};
pub use oauth_state::SqlOAuthStateRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Store for persisted OAuth connections, keyed by `(user_id, provider)`.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn find(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<Connection>, RepositoryError>;

    /// Atomic upsert. The stored `refresh_token` is retained when the new
    /// record carries none, so a provider that omits it on refresh cannot
    /// null the prior value. Returns the record as stored.
    async fn upsert(&self, connection: &Connection) -> Result<Connection, RepositoryError>;
}

/// Pending CSRF state token issued when an authorization flow starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OAuthStateRecord {
    pub state_token: String,
    pub provider: Provider,
    pub user_id: String,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait OAuthStateRepository: Send + Sync {
    async fn insert(&self, record: &OAuthStateRecord) -> Result<(), RepositoryError>;

    /// Consume an unexpired, unused state token. Returns `None` when the
    /// token is unknown, expired, or already used; a token can be reserved
    /// at most once.
    async fn reserve(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthStateRecord>, RepositoryError>;
}
