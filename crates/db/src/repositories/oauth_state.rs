use chrono::{DateTime, Utc};
use sqlx::Row;

use ledgerlink_core::domain::connection::Provider;

use super::{OAuthStateRecord, OAuthStateRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOAuthStateRepository {
    pool: DbPool,
}

impl SqlOAuthStateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OAuthStateRepository for SqlOAuthStateRepository {
    async fn insert(&self, record: &OAuthStateRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO oauth_state (state_token, provider, user_id, requested_at, expires_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.state_token)
        .bind(record.provider.as_str())
        .bind(&record.user_id)
        .bind(record.requested_at.to_rfc3339())
        .bind(record.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reserve(
        &self,
        state_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OAuthStateRecord>, RepositoryError> {
        // Single UPDATE ... RETURNING so two concurrent callbacks cannot
        // both consume the same token.
        let row = sqlx::query(
            "UPDATE oauth_state SET used = 1 \
             WHERE state_token = ? AND used = 0 AND expires_at > ? \
             RETURNING state_token, provider, user_id, requested_at, expires_at",
        )
        .bind(state_token)
        .bind(now.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let provider_raw: String = row.get("provider");
            let provider = Provider::parse(&provider_raw).ok_or_else(|| {
                RepositoryError::Decode(format!(
                    "unknown provider in oauth_state row: `{provider_raw}`"
                ))
            })?;

            Ok(OAuthStateRecord {
                state_token: row.get("state_token"),
                provider,
                user_id: row.get("user_id"),
                requested_at: decode_timestamp(row.get("requested_at"))?,
                expires_at: decode_timestamp(row.get("expires_at"))?,
            })
        })
        .transpose()
    }
}

fn decode_timestamp(raw: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}
