use chrono::{DateTime, Utc};
use sqlx::Row;

use ledgerlink_core::domain::connection::{Connection, Provider};

use super::{ConnectionRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConnectionRepository {
    pool: DbPool,
}

impl SqlConnectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConnectionRepository for SqlConnectionRepository {
    async fn find(
        &self,
        user_id: &str,
        provider: Provider,
    ) -> Result<Option<Connection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, provider, access_token, refresh_token, external_account_id, scope, \
             obtained_at, expires_at \
             FROM connection WHERE user_id = ? AND provider = ?",
        )
        .bind(user_id)
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_connection).transpose()
    }

    async fn upsert(&self, connection: &Connection) -> Result<Connection, RepositoryError> {
        sqlx::query(
            "INSERT INTO connection (\
                user_id, provider, access_token, refresh_token, external_account_id, scope, \
                obtained_at, expires_at, updated_at\
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(user_id, provider) DO UPDATE SET \
                access_token = excluded.access_token, \
                refresh_token = COALESCE(excluded.refresh_token, connection.refresh_token), \
                external_account_id = \
                    COALESCE(excluded.external_account_id, connection.external_account_id), \
                scope = COALESCE(excluded.scope, connection.scope), \
                obtained_at = excluded.obtained_at, \
                expires_at = excluded.expires_at, \
                updated_at = excluded.updated_at",
        )
        .bind(&connection.user_id)
        .bind(connection.provider.as_str())
        .bind(&connection.access_token)
        .bind(connection.refresh_token.as_deref())
        .bind(connection.external_account_id.as_deref())
        .bind(connection.scope.as_deref())
        .bind(connection.obtained_at.to_rfc3339())
        .bind(connection.expires_at.map(|value| value.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.find(&connection.user_id, connection.provider).await?.ok_or_else(|| {
            RepositoryError::Decode("connection row missing immediately after upsert".to_string())
        })
    }
}

fn decode_connection(row: sqlx::sqlite::SqliteRow) -> Result<Connection, RepositoryError> {
    let provider_raw: String = row.get("provider");
    let provider = Provider::parse(&provider_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown provider in connection row: `{provider_raw}`"))
    })?;

    Ok(Connection {
        user_id: row.get("user_id"),
        provider,
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        external_account_id: row.get("external_account_id"),
        scope: row.get("scope"),
        obtained_at: decode_timestamp(row.get("obtained_at"))?,
        expires_at: row
            .get::<Option<String>, _>("expires_at")
            .map(decode_timestamp)
            .transpose()?,
    })
}

fn decode_timestamp(raw: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {error}")))
}
